//! Write-side unit of work over `daily_prices`.

use ::duckdb::params;

use crate::duckdb::PooledConnection;
use crate::{read_daily_row, DailyPriceRow, WarehouseError};

/// An open write transaction.
///
/// Nothing becomes visible to other connections until [`DailyBatch::commit`]
/// succeeds. Dropping an uncommitted batch rolls it back.
pub struct DailyBatch {
    connection: PooledConnection,
    finished: bool,
}

impl DailyBatch {
    pub(crate) fn begin(connection: PooledConnection) -> Result<Self, WarehouseError> {
        connection.execute_batch("BEGIN TRANSACTION")?;
        Ok(Self {
            connection,
            finished: false,
        })
    }

    /// Look up the row stored under `(symbol, date)`, including rows written
    /// earlier in this batch.
    pub fn find(&self, symbol: &str, date: &str) -> Result<Option<DailyPriceRow>, WarehouseError> {
        let mut statement = self.connection.prepare(
            "SELECT symbol, CAST(date AS VARCHAR), open_price, close_price, volume \
             FROM daily_prices WHERE symbol = ? AND date = CAST(? AS DATE)",
        )?;
        let mut rows = statement.query_map(params![symbol, date], read_daily_row)?;
        Ok(rows.next().transpose()?)
    }

    pub fn insert(&self, row: &DailyPriceRow) -> Result<(), WarehouseError> {
        self.connection.execute(
            "INSERT INTO daily_prices \
             (symbol, date, open_price, close_price, volume, updated_at) \
             VALUES (?, CAST(? AS DATE), ?, ?, ?, CURRENT_TIMESTAMP)",
            params![
                row.symbol,
                row.date,
                row.open_price,
                row.close_price,
                row.volume
            ],
        )?;
        Ok(())
    }

    /// Overwrite price and volume of an existing row. The key columns are
    /// never touched.
    pub fn update_prices(
        &self,
        symbol: &str,
        date: &str,
        open_price: f64,
        close_price: f64,
        volume: i64,
    ) -> Result<(), WarehouseError> {
        let changed = self.connection.execute(
            "UPDATE daily_prices \
             SET open_price = ?, close_price = ?, volume = ?, updated_at = CURRENT_TIMESTAMP \
             WHERE symbol = ? AND date = CAST(? AS DATE)",
            params![open_price, close_price, volume, symbol, date],
        )?;
        if changed == 0 {
            return Err(WarehouseError::MissingRow {
                symbol: symbol.to_owned(),
                date: date.to_owned(),
            });
        }
        Ok(())
    }

    pub fn commit(mut self) -> Result<(), WarehouseError> {
        self.connection.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for DailyBatch {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(error) = self.connection.execute_batch("ROLLBACK") {
            tracing::warn!(%error, "rollback of daily batch failed");
        } else {
            tracing::debug!("daily batch rolled back");
        }
    }
}
