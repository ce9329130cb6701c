//! Read services behind the HTTP endpoints: paginated rows and statistics.
//!
//! Parameters arrive as optional strings. Absent values take their defaults;
//! present values, including empty ones, are validated as given.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use pricesync_warehouse::{DailyFilter, DailyPriceRow, Warehouse};

use crate::constraints::{Constraint, ConstraintSet, FieldErrors};
use crate::domain::{DateFormat, TradingDate, SYMBOL_MAX_LENGTH};
use crate::CoreError;

pub const DEFAULT_START_DATE: &str = "1900-01-01";
pub const DEFAULT_END_DATE: &str = "2999-12-31";
pub const DEFAULT_LIMIT: &str = "5";
pub const DEFAULT_PAGE: &str = "1";
pub const NO_DATA_NOTE: &str = "No data found under the conditions given";

/// Query string of the raw rows endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawDataParams {
    pub symbol: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<String>,
    pub page: Option<String>,
}

/// Query string of the statistics endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatisticsParams {
    pub symbol: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDataQuery {
    /// `None` matches every symbol.
    pub symbol: Option<String>,
    pub start_date: TradingDate,
    pub end_date: TradingDate,
    pub limit: u64,
    pub page: u64,
}

impl RawDataQuery {
    pub fn offset(&self) -> u64 {
        self.limit.saturating_mul(self.page.saturating_sub(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticsQuery {
    pub symbol: String,
    pub start_date: TradingDate,
    pub end_date: TradingDate,
}

fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

fn parse_count(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|value| *value > 0)
}

impl RawDataParams {
    pub fn validate(&self) -> Result<RawDataQuery, FieldErrors> {
        let symbol = self.symbol.as_deref().unwrap_or("");
        let start_date = self.start_date.as_deref().unwrap_or(DEFAULT_START_DATE);
        let end_date = self.end_date.as_deref().unwrap_or(DEFAULT_END_DATE);
        let limit = self.limit.as_deref().unwrap_or(DEFAULT_LIMIT);
        let page = self.page.as_deref().unwrap_or(DEFAULT_PAGE);

        let date = Constraint::DateString(DateFormat::ISO);
        let errors = ConstraintSet::new()
            .field("symbol", symbol, &[Constraint::MaxLength(SYMBOL_MAX_LENGTH)])
            .field("start_date", start_date, &[date])
            .field("end_date", end_date, &[date])
            .field("limit", limit, &[Constraint::PositiveInteger])
            .field("page", page, &[Constraint::PositiveInteger])
            .validate();

        match (
            TradingDate::parse(start_date),
            TradingDate::parse(end_date),
            parse_count(limit),
            parse_count(page),
        ) {
            (Ok(start_date), Ok(end_date), Some(limit), Some(page)) if errors.is_empty() => {
                let symbol = normalize_symbol(symbol);
                Ok(RawDataQuery {
                    symbol: (!symbol.is_empty()).then_some(symbol),
                    start_date,
                    end_date,
                    limit,
                    page,
                })
            }
            _ => Err(errors),
        }
    }
}

impl StatisticsParams {
    pub fn validate(&self) -> Result<StatisticsQuery, FieldErrors> {
        let symbol = self.symbol.as_deref().unwrap_or("");
        let start_date = self.start_date.as_deref().unwrap_or("");
        let end_date = self.end_date.as_deref().unwrap_or("");

        let date = [Constraint::Required, Constraint::DateString(DateFormat::ISO)];
        let errors = ConstraintSet::new()
            .field(
                "symbol",
                symbol,
                &[Constraint::Required, Constraint::MaxLength(SYMBOL_MAX_LENGTH)],
            )
            .field("start_date", start_date, &date)
            .field("end_date", end_date, &date)
            .validate();

        match (TradingDate::parse(start_date), TradingDate::parse(end_date)) {
            (Ok(start_date), Ok(end_date)) if errors.is_empty() => Ok(StatisticsQuery {
                symbol: normalize_symbol(symbol),
                start_date,
                end_date,
            }),
            _ => Err(errors),
        }
    }
}

/// `ceil(count / limit)`; zero when `limit` is zero.
pub fn page_count(count: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 0;
    }
    count / limit + u64::from(count % limit != 0)
}

/// Either an empty string or the per-field violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum InfoError {
    Message(String),
    Fields(FieldErrors),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseInfo {
    pub error: InfoError,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ResponseInfo {
    pub fn ok() -> Self {
        Self {
            error: InfoError::Message(String::new()),
            note: None,
        }
    }

    pub fn rejected(errors: FieldErrors) -> Self {
        Self {
            error: InfoError::Fields(errors),
            note: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: InfoError::Message(message.into()),
            note: None,
        }
    }

    pub fn no_data() -> Self {
        Self {
            error: InfoError::Message(String::new()),
            note: Some(String::from(NO_DATA_NOTE)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub count: u64,
    pub page: u64,
    pub limit: u64,
    pub pages: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawDataResponse {
    pub data: Vec<DailyPriceRow>,
    #[serde(serialize_with = "some_or_empty_object")]
    pub pagination: Option<Pagination>,
    pub info: ResponseInfo,
}

impl RawDataResponse {
    pub fn rejected(errors: FieldErrors) -> Self {
        Self {
            data: Vec::new(),
            pagination: None,
            info: ResponseInfo::rejected(errors),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            data: Vec::new(),
            pagination: None,
            info: ResponseInfo::failed(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStatistics {
    pub start_date: String,
    pub end_date: String,
    pub symbol: String,
    pub average_daily_open_price: f64,
    pub average_daily_close_price: f64,
    pub average_daily_volume: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsResponse {
    #[serde(serialize_with = "some_or_empty_object")]
    pub data: Option<DailyStatistics>,
    pub info: ResponseInfo,
}

impl StatisticsResponse {
    pub fn rejected(errors: FieldErrors) -> Self {
        Self {
            data: None,
            info: ResponseInfo::rejected(errors),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            data: None,
            info: ResponseInfo::failed(message),
        }
    }

    pub fn no_data() -> Self {
        Self {
            data: None,
            info: ResponseInfo::no_data(),
        }
    }
}

fn some_or_empty_object<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    match value {
        Some(value) => value.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round_volume(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        // Saturating float-to-int cast.
        value.round() as u64
    } else {
        0
    }
}

/// Rows matching the parameters, or the parameter violations.
pub fn raw_data_response(
    warehouse: &Warehouse,
    params: &RawDataParams,
) -> Result<RawDataResponse, CoreError> {
    let query = match params.validate() {
        Ok(query) => query,
        Err(errors) => {
            tracing::debug!(fields = errors.len(), "rejected raw data parameters");
            return Ok(RawDataResponse::rejected(errors));
        }
    };

    let filter = DailyFilter {
        symbol: query.symbol.clone(),
        start_date: query.start_date.to_string(),
        end_date: query.end_date.to_string(),
    };
    let page = warehouse.query_daily(&filter, query.limit, query.offset())?;

    Ok(RawDataResponse {
        data: page.rows,
        pagination: Some(Pagination {
            count: page.total,
            page: query.page,
            limit: query.limit,
            pages: page_count(page.total, query.limit),
        }),
        info: ResponseInfo::ok(),
    })
}

/// Averages over one symbol and date range, an explicit "no data" answer for
/// an empty range, or the parameter violations.
pub fn statistics_response(
    warehouse: &Warehouse,
    params: &StatisticsParams,
) -> Result<StatisticsResponse, CoreError> {
    let query = match params.validate() {
        Ok(query) => query,
        Err(errors) => {
            tracing::debug!(fields = errors.len(), "rejected statistics parameters");
            return Ok(StatisticsResponse::rejected(errors));
        }
    };

    let aggregate = warehouse.daily_statistics(
        &query.symbol,
        &query.start_date.to_string(),
        &query.end_date.to_string(),
    )?;
    let Some(aggregate) = aggregate else {
        return Ok(StatisticsResponse::no_data());
    };

    Ok(StatisticsResponse {
        data: Some(DailyStatistics {
            start_date: aggregate.first_date,
            end_date: aggregate.last_date,
            symbol: query.symbol,
            average_daily_open_price: round_cents(aggregate.mean_open_price),
            average_daily_close_price: round_cents(aggregate.mean_close_price),
            average_daily_volume: round_volume(aggregate.mean_volume),
        }),
        info: ResponseInfo::ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DailyRecord, Symbol};
    use crate::reconcile::reconcile;
    use pricesync_warehouse::WarehouseConfig;
    use serde_json::json;

    fn seeded(rows: &[(&str, &str, f64, f64, u64)]) -> Warehouse {
        let warehouse = Warehouse::open(WarehouseConfig::in_memory()).expect("warehouse");
        let records: Vec<_> = rows
            .iter()
            .map(|(symbol, date, open_price, close_price, volume)| {
                DailyRecord::new(
                    Symbol::parse(symbol).expect("symbol"),
                    TradingDate::parse(date).expect("date"),
                    *open_price,
                    *close_price,
                    *volume,
                )
                .expect("record")
            })
            .collect();
        reconcile(&warehouse, &records).expect("seed");
        warehouse
    }

    fn raw(pairs: &[(&str, &str)]) -> RawDataParams {
        let mut params = RawDataParams::default();
        for (key, value) in pairs {
            let value = Some((*value).to_string());
            match *key {
                "symbol" => params.symbol = value,
                "start_date" => params.start_date = value,
                "end_date" => params.end_date = value,
                "limit" => params.limit = value,
                "page" => params.page = value,
                other => panic!("unknown parameter {other}"),
            }
        }
        params
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(23, 5), 5);
        assert_eq!(page_count(20, 5), 4);
        assert_eq!(page_count(0, 5), 0);
        assert_eq!(page_count(3, 0), 0);
    }

    #[test]
    fn absent_parameters_take_defaults() {
        let query = RawDataParams::default().validate().expect("defaults are valid");

        assert_eq!(query.symbol, None);
        assert_eq!(query.start_date.to_string(), DEFAULT_START_DATE);
        assert_eq!(query.end_date.to_string(), DEFAULT_END_DATE);
        assert_eq!((query.limit, query.page, query.offset()), (5, 1, 0));
    }

    #[test]
    fn present_but_empty_parameters_are_validated() {
        let errors = raw(&[("limit", ""), ("start_date", "")])
            .validate()
            .expect_err("must reject");

        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            ["start_date", "limit"]
        );
    }

    #[test]
    fn query_symbol_is_trimmed_and_uppercased() {
        let query = raw(&[("symbol", " ibm "), ("page", "3"), ("limit", "4")])
            .validate()
            .expect("valid");

        assert_eq!(query.symbol.as_deref(), Some("IBM"));
        assert_eq!(query.offset(), 8);
    }

    #[test]
    fn raw_rows_are_paged_by_symbol_then_date() {
        let warehouse = seeded(&[
            ("IBM", "2024-03-01", 1.0, 1.5, 10),
            ("AAPL", "2024-03-02", 2.0, 2.5, 20),
            ("AAPL", "2024-03-01", 3.0, 3.5, 30),
        ]);

        let response =
            raw_data_response(&warehouse, &raw(&[("limit", "2"), ("page", "1")])).expect("read");

        let body = serde_json::to_value(&response).expect("json");
        assert_eq!(
            body["pagination"],
            json!({"count": 3, "page": 1, "limit": 2, "pages": 2})
        );
        assert_eq!(body["info"], json!({"error": ""}));
        assert_eq!(body["data"][0]["symbol"], "AAPL");
        assert_eq!(body["data"][0]["date"], "2024-03-01");
        assert_eq!(body["data"][1]["date"], "2024-03-02");
    }

    #[test]
    fn rejected_raw_parameters_render_empty_shapes() {
        let warehouse = seeded(&[]);

        let response = raw_data_response(
            &warehouse,
            &raw(&[("symbol", "ABCDEFGHIJKLMNOPQRSTU"), ("page", "0")]),
        )
        .expect("read");

        assert_eq!(
            serde_json::to_value(&response).expect("json"),
            json!({
                "data": [],
                "pagination": {},
                "info": {"error": {
                    "page": ["not a positive integer"],
                    "symbol": ["cannot exceed 20 characters"],
                }},
            })
        );
    }

    #[test]
    fn statistics_average_over_present_dates() {
        let warehouse = seeded(&[
            ("IBM", "2024-03-01", 100.0, 101.0, 1_000),
            ("IBM", "2024-03-04", 102.5, 103.0, 1_001),
            ("AAPL", "2024-03-02", 9.0, 9.0, 9),
        ]);
        let params = StatisticsParams {
            symbol: Some(String::from("IBM")),
            start_date: Some(String::from("2024-02-01")),
            end_date: Some(String::from("2024-03-31")),
        };

        let response = statistics_response(&warehouse, &params).expect("read");

        assert_eq!(
            serde_json::to_value(&response).expect("json"),
            json!({
                "data": {
                    "start_date": "2024-03-01",
                    "end_date": "2024-03-04",
                    "symbol": "IBM",
                    "average_daily_open_price": 101.25,
                    "average_daily_close_price": 102.0,
                    "average_daily_volume": 1001,
                },
                "info": {"error": ""},
            })
        );
    }

    #[test]
    fn statistics_over_an_empty_range_say_no_data() {
        let warehouse = seeded(&[("IBM", "2024-03-01", 1.0, 1.0, 1)]);
        let params = StatisticsParams {
            symbol: Some(String::from("IBM")),
            start_date: Some(String::from("2023-01-01")),
            end_date: Some(String::from("2023-12-31")),
        };

        let response = statistics_response(&warehouse, &params).expect("read");

        assert_eq!(
            serde_json::to_value(&response).expect("json"),
            json!({"data": {}, "info": {"error": "", "note": NO_DATA_NOTE}})
        );
    }

    #[test]
    fn statistics_require_every_parameter() {
        let errors = StatisticsParams::default()
            .validate()
            .expect_err("must reject");

        assert_eq!(errors.get("symbol"), Some(&[String::from("missing parameter")][..]));
        assert_eq!(
            errors.get("end_date"),
            Some(
                &[
                    String::from("missing parameter"),
                    String::from("not a valid date string (YYYY-MM-DD)"),
                ][..]
            )
        );
    }
}
