//! Turns an accepted provider payload into typed daily records.

use serde_json::Value;
use thiserror::Error;

use crate::adapters::alphavantage::layout;
use crate::domain::{DailyRecord, Symbol, TradingDate};
use crate::schema::{read_decimal, read_integer, ValidatedPayload};
use crate::ValidationError;

/// Raised when a payload that passed validation still cannot be mapped, which
/// means the schema and the transformer disagree about the layout.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    #[error("payload has no '{0}' text")]
    MissingSymbol(&'static str),
    #[error("payload has no '{0}' mapping")]
    MissingSeries(&'static str),
    #[error("entry {date}: field '{field}' is missing or malformed")]
    BadField { date: String, field: &'static str },
    #[error("entry {date}: value is not a mapping")]
    BadEntry { date: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Build the `latest_n_days` most recent records, newest first.
///
/// A bound of zero yields nothing; a bound larger than the series keeps every
/// entry.
pub fn to_daily_records(
    payload: &ValidatedPayload,
    latest_n_days: usize,
) -> Result<Vec<DailyRecord>, TransformError> {
    let root = payload.as_value();
    let symbol = root
        .get(layout::META_DATA)
        .and_then(|meta| meta.get(layout::SYMBOL))
        .and_then(Value::as_str)
        .ok_or(TransformError::MissingSymbol(layout::SYMBOL))?;
    let symbol = Symbol::parse(symbol)?;

    let series = root
        .get(layout::TIME_SERIES)
        .and_then(Value::as_object)
        .ok_or(TransformError::MissingSeries(layout::TIME_SERIES))?;

    let mut dated = series
        .iter()
        .map(|(key, entry)| Ok((TradingDate::parse(key)?, key, entry)))
        .collect::<Result<Vec<_>, TransformError>>()?;
    dated.sort_by(|left, right| right.0.cmp(&left.0));
    dated.truncate(latest_n_days);

    dated
        .into_iter()
        .map(|(date, key, entry)| {
            let fields = entry
                .as_object()
                .ok_or_else(|| TransformError::BadEntry { date: key.clone() })?;
            let bad_field = |field: &'static str| TransformError::BadField {
                date: key.clone(),
                field,
            };

            let open_price = fields
                .get(layout::OPEN)
                .and_then(|raw| read_decimal(raw).ok())
                .ok_or_else(|| bad_field(layout::OPEN))?;
            let close_price = fields
                .get(layout::CLOSE)
                .and_then(|raw| read_decimal(raw).ok())
                .ok_or_else(|| bad_field(layout::CLOSE))?;
            let volume = fields
                .get(layout::VOLUME)
                .and_then(|raw| read_integer(raw).ok())
                .ok_or_else(|| bad_field(layout::VOLUME))?;

            Ok(DailyRecord::new(
                symbol.clone(),
                date,
                open_price,
                close_price,
                volume,
            )?)
        })
        .collect()
}
