use serde::Serialize;

use pricesync_warehouse::DailyPriceRow;

use crate::domain::{Symbol, TradingDate};
use crate::ValidationError;

/// Largest volume the BIGINT column can hold.
pub const MAX_VOLUME: u64 = i64::MAX as u64;

/// One day of price and volume for one symbol. `(symbol, date)` is the
/// natural key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRecord {
    pub symbol: Symbol,
    pub date: TradingDate,
    pub open_price: f64,
    pub close_price: f64,
    pub volume: u64,
}

impl DailyRecord {
    pub fn new(
        symbol: Symbol,
        date: TradingDate,
        open_price: f64,
        close_price: f64,
        volume: u64,
    ) -> Result<Self, ValidationError> {
        validate_price("open_price", open_price)?;
        validate_price("close_price", close_price)?;
        volume_to_sql(volume)?;

        Ok(Self {
            symbol,
            date,
            open_price,
            close_price,
            volume,
        })
    }

    pub fn to_row(&self) -> Result<DailyPriceRow, ValidationError> {
        Ok(DailyPriceRow {
            symbol: self.symbol.to_string(),
            date: self.date.to_string(),
            open_price: self.open_price,
            close_price: self.close_price,
            volume: volume_to_sql(self.volume)?,
        })
    }
}

impl TryFrom<DailyPriceRow> for DailyRecord {
    type Error = ValidationError;

    fn try_from(row: DailyPriceRow) -> Result<Self, Self::Error> {
        let volume = u64::try_from(row.volume)
            .map_err(|_| ValidationError::NegativeValue { field: "volume" })?;
        Self::new(
            Symbol::parse(&row.symbol)?,
            TradingDate::parse(&row.date)?,
            row.open_price,
            row.close_price,
            volume,
        )
    }
}

pub(crate) fn volume_to_sql(volume: u64) -> Result<i64, ValidationError> {
    i64::try_from(volume).map_err(|_| ValidationError::VolumeOutOfRange {
        volume,
        max: MAX_VOLUME,
    })
}

fn validate_price(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
