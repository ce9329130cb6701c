//! Behavior-driven tests for payload validation and transformation.

use pricesync_core::{to_daily_records, PayloadSchema};
use pricesync_tests::alphavantage_payload;
use serde_json::json;

#[test]
fn when_provider_payload_is_well_formed_it_is_accepted_and_transformed() {
    // Given: A realistic daily payload
    let payload = alphavantage_payload(
        "ibm",
        &[
            ("2024-03-01", 185.49, 185.03, 3_487_466),
            ("2024-02-29", 185.25, 185.00, 4_198_111),
        ],
    );

    // When: It is validated and transformed
    let accepted = PayloadSchema::alphavantage_daily()
        .accept(payload)
        .expect("payload should be accepted");
    let records = to_daily_records(&accepted, 14).expect("transform");

    // Then: Records come out newest first with typed fields
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].symbol.as_str(), "IBM");
    assert_eq!(records[0].date.to_string(), "2024-03-01");
    assert_eq!(records[0].open_price, 185.49);
    assert_eq!(records[0].volume, 3_487_466);
}

#[test]
fn when_payload_has_several_defects_every_one_is_reported() {
    // Given: A bad date key and an entry missing its close
    let payload = json!({
        "Meta Data": {"2. Symbol": "IBM"},
        "Time Series (Daily)": {
            "03/01/2024": {"1. open": "1.0", "4. close": "1.0", "6. volume": "10"},
            "2024-02-29": {"1. open": "1.0", "6. volume": "10"},
        },
    });

    // When: It is validated
    let report = PayloadSchema::alphavantage_daily().check(&payload);

    // Then: Both defects are listed, each at its own path
    let messages = report.messages();
    assert_eq!(report.len(), 2, "{messages:?}");
    assert!(messages
        .iter()
        .any(|m| m.starts_with("$/Time Series (Daily)/03/01/2024") && m.contains("YYYY-MM-DD")));
    assert!(messages
        .iter()
        .any(|m| m.starts_with("$/Time Series (Daily)/2024-02-29") && m.contains("4. close")));
}

#[test]
fn when_top_level_keys_are_missing_the_report_names_them() {
    // Given: An error body without the expected sections
    let payload = json!({"Error Message": "Invalid API call."});

    // When: It is validated
    let report = PayloadSchema::alphavantage_daily().check(&payload);

    // Then: Both the symbol and the series are reported missing
    let messages = report.messages();
    assert_eq!(
        messages,
        [
            "$/Meta Data/2. Symbol: key missing",
            "$/Time Series (Daily): key missing",
        ]
    );
}

#[test]
fn when_validation_runs_twice_reports_do_not_accumulate() {
    // Given: One schema and one bad payload
    let schema = PayloadSchema::alphavantage_daily();
    let payload = json!({});

    // When: It is checked twice
    let first = schema.check(&payload);
    let second = schema.check(&payload);

    // Then: Each report stands alone
    assert_eq!(first.len(), second.len());
    assert_eq!(first.messages(), second.messages());
}

#[test]
fn when_the_payload_symbol_is_not_a_ticker_validation_rejects_it() {
    // Given: An index symbol the store cannot key on
    let payload = alphavantage_payload("^GSPC", &[("2024-03-01", 5_100.0, 5_137.0, 1)]);

    // When: It is validated
    let report = PayloadSchema::alphavantage_daily()
        .accept(payload)
        .expect_err("payload should be rejected");

    // Then: The violation points at the symbol, before any transformation
    assert_eq!(report.len(), 1);
    assert_eq!(
        report.messages(),
        ["$/Meta Data/2. Symbol: invalid symbol: symbol must start with an ASCII letter: '^'"]
    );
}
