//! # pricesync Warehouse
//!
//! DuckDB-backed storage for reconciled daily price observations.
//!
//! ## Overview
//!
//! The warehouse owns one table, `daily_prices`, keyed by `(symbol, date)`.
//! Writes happen through a [`DailyBatch`], a unit of work that is committed
//! as a whole or not at all. Reads run on pooled connections and never see
//! the uncommitted state of a batch.
//!
//! DuckDB locks the database file for the process that opened it. Readers
//! and writers therefore share one [`Warehouse`] inside one process; a
//! second process cannot open the same file while the first holds it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pricesync_warehouse::{DailyFilter, DailyPriceRow, Warehouse, WarehouseConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open(WarehouseConfig::default())?;
//!
//!     let batch = warehouse.begin_daily_batch()?;
//!     batch.insert(&DailyPriceRow {
//!         symbol: "IBM".to_string(),
//!         date: "2024-03-01".to_string(),
//!         open_price: 185.49,
//!         close_price: 185.03,
//!         volume: 3_487_466,
//!     })?;
//!     batch.commit()?;
//!
//!     let page = warehouse.query_daily(&DailyFilter::default(), 5, 0)?;
//!     println!("{} rows stored", page.total);
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `daily_prices` | One row per symbol and trading date |
//! | `schema_migrations` | Applied bootstrap steps |

mod batch;
pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{params, ToSql};
use serde::Serialize;
use thiserror::Error;

pub use batch::DailyBatch;
pub use duckdb::{AccessMode, DuckDbConnectionManager, PooledConnection};

/// Location of an in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Query was rejected before reaching the database.
    #[error("query rejected: {0}")]
    QueryRejected(String),

    /// An update targeted a key that has no stored row.
    #[error("no stored row for {symbol} on {date}")]
    MissingRow { symbol: String, date: String },
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Path to the `DuckDB` database file, or [`IN_MEMORY`].
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept per access mode.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            db_path: resolve_pricesync_home().join("warehouse.duckdb"),
            max_pool_size: 4,
        }
    }
}

impl WarehouseConfig {
    /// Configuration for a database file at `db_path`.
    pub fn at(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    /// Configuration for a private in-memory database.
    pub fn in_memory() -> Self {
        Self::at(IN_MEMORY)
    }

    fn is_in_memory(&self) -> bool {
        self.db_path.as_os_str() == IN_MEMORY
    }
}

/// A stored daily observation as the database sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPriceRow {
    pub symbol: String,
    /// Calendar date formatted `YYYY-MM-DD`.
    pub date: String,
    pub open_price: f64,
    pub close_price: f64,
    pub volume: i64,
}

/// Row filter for [`Warehouse::query_daily`]. Date bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyFilter {
    pub symbol: Option<String>,
    pub start_date: String,
    pub end_date: String,
}

impl Default for DailyFilter {
    fn default() -> Self {
        Self {
            symbol: None,
            start_date: String::from("1900-01-01"),
            end_date: String::from("2999-12-31"),
        }
    }
}

/// One page of rows plus the number of rows matching the filter.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyPage {
    pub total: u64,
    pub rows: Vec<DailyPriceRow>,
}

/// Raw aggregates over the rows of one symbol inside a date range.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAggregate {
    pub row_count: u64,
    pub first_date: String,
    pub last_date: String,
    pub mean_open_price: f64,
    pub mean_close_price: f64,
    pub mean_volume: f64,
}

/// The main warehouse interface for daily price storage.
#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open a warehouse with the specified configuration.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if !config.is_in_memory() {
            if let Some(parent) = config.db_path.parent() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = DuckDbConnectionManager::open(config.db_path.clone(), config.max_pool_size)?;
        let warehouse = Self { config, manager };
        warehouse.initialize()?;
        tracing::debug!(db_path = %warehouse.db_path().display(), "warehouse opened");
        Ok(warehouse)
    }

    /// Initialize the database schema.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Start a unit of work on a dedicated read-write connection.
    pub fn begin_daily_batch(&self) -> Result<DailyBatch, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        DailyBatch::begin(connection)
    }

    /// Page through rows ordered by symbol then date.
    ///
    /// # Security
    /// Filter values are bound as parameters. Only `limit` and `offset`, which
    /// are integers, are formatted into the statement.
    pub fn query_daily(
        &self,
        filter: &DailyFilter,
        limit: u64,
        offset: u64,
    ) -> Result<DailyPage, WarehouseError> {
        if limit == 0 {
            return Err(WarehouseError::QueryRejected(String::from(
                "limit must be greater than zero",
            )));
        }

        let mut clause = String::from("date >= CAST(? AS DATE) AND date <= CAST(? AS DATE)");
        let mut bound: Vec<&dyn ToSql> = vec![&filter.start_date, &filter.end_date];
        if let Some(symbol) = &filter.symbol {
            clause.push_str(" AND symbol = ?");
            bound.push(symbol);
        }

        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let total: i64 = connection.query_row(
            format!("SELECT COUNT(*) FROM daily_prices WHERE {clause}").as_str(),
            bound.as_slice(),
            |row| row.get(0),
        )?;

        let select = format!(
            "SELECT symbol, CAST(date AS VARCHAR), open_price, close_price, volume \
             FROM daily_prices WHERE {clause} \
             ORDER BY symbol, date \
             LIMIT {limit} OFFSET {offset}",
            limit = clamp_to_sql_int(limit),
            offset = clamp_to_sql_int(offset),
        );
        let mut statement = connection.prepare(select.as_str())?;
        let rows = statement
            .query_map(bound.as_slice(), read_daily_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DailyPage {
            total: u64::try_from(total).unwrap_or_default(),
            rows,
        })
    }

    /// Aggregate one symbol between two inclusive dates.
    ///
    /// Returns `None` when no row matches.
    pub fn daily_statistics(
        &self,
        symbol: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Option<DailyAggregate>, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let (row_count, first_date, last_date, mean_open, mean_close, mean_volume) = connection
            .query_row(
                "SELECT COUNT(*), CAST(MIN(date) AS VARCHAR), CAST(MAX(date) AS VARCHAR), \
                 AVG(open_price), AVG(close_price), AVG(volume) \
                 FROM daily_prices \
                 WHERE symbol = ? AND date >= CAST(? AS DATE) AND date <= CAST(? AS DATE)",
                params![symbol, start_date, end_date],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<f64>>(3)?,
                        row.get::<_, Option<f64>>(4)?,
                        row.get::<_, Option<f64>>(5)?,
                    ))
                },
            )?;

        if row_count <= 0 {
            return Ok(None);
        }

        match (first_date, last_date, mean_open, mean_close, mean_volume) {
            (
                Some(first_date),
                Some(last_date),
                Some(mean_open_price),
                Some(mean_close_price),
                Some(mean_volume),
            ) => Ok(Some(DailyAggregate {
                row_count: row_count.unsigned_abs(),
                first_date,
                last_date,
                mean_open_price,
                mean_close_price,
                mean_volume,
            })),
            _ => Err(WarehouseError::QueryRejected(String::from(
                "aggregate returned NULL for a non-empty range",
            ))),
        }
    }
}

pub(crate) fn read_daily_row(row: &::duckdb::Row<'_>) -> Result<DailyPriceRow, ::duckdb::Error> {
    Ok(DailyPriceRow {
        symbol: row.get(0)?,
        date: row.get(1)?,
        open_price: row.get(2)?,
        close_price: row.get(3)?,
        volume: row.get(4)?,
    })
}

fn clamp_to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Resolve the pricesync home directory from environment or default.
fn resolve_pricesync_home() -> PathBuf {
    if let Some(path) = env::var_os("PRICESYNC_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".pricesync");
    }

    PathBuf::from(".pricesync")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn row(symbol: &str, date: &str, open_price: f64, close_price: f64, volume: i64) -> DailyPriceRow {
        DailyPriceRow {
            symbol: symbol.to_string(),
            date: date.to_string(),
            open_price,
            close_price,
            volume,
        }
    }

    fn seeded(rows: &[DailyPriceRow]) -> Warehouse {
        let warehouse = Warehouse::open(WarehouseConfig::in_memory()).expect("warehouse open");
        let batch = warehouse.begin_daily_batch().expect("begin");
        for row in rows {
            batch.insert(row).expect("insert");
        }
        batch.commit().expect("commit");
        warehouse
    }

    #[test]
    fn initializes_daily_prices_table() {
        let temp = tempdir().expect("tempdir");
        let db_path = temp.path().join("pricesync-home").join("warehouse.duckdb");

        let warehouse = Warehouse::open(WarehouseConfig {
            db_path: db_path.clone(),
            max_pool_size: 2,
        })
        .expect("warehouse open");

        assert!(db_path.exists());
        let page = warehouse
            .query_daily(&DailyFilter::default(), 5, 0)
            .expect("query");
        assert_eq!(page.total, 0);
        assert!(page.rows.is_empty());
    }

    #[test]
    fn committed_batch_is_visible_and_dropped_batch_is_not() {
        let warehouse = seeded(&[row("IBM", "2024-03-01", 185.49, 185.03, 3_487_466)]);

        {
            let batch = warehouse.begin_daily_batch().expect("begin");
            batch
                .insert(&row("IBM", "2024-03-04", 185.5, 187.0, 4_000_000))
                .expect("insert");
            assert!(batch.find("IBM", "2024-03-04").expect("find").is_some());
        }

        let page = warehouse
            .query_daily(&DailyFilter::default(), 10, 0)
            .expect("query");
        assert_eq!(page.total, 1);
        assert_eq!(page.rows[0].date, "2024-03-01");
    }

    #[test]
    fn update_prices_keeps_key_and_overwrites_values() {
        let warehouse = seeded(&[row("IBM", "2024-03-01", 185.49, 185.03, 3_487_466)]);

        let batch = warehouse.begin_daily_batch().expect("begin");
        batch
            .update_prices("IBM", "2024-03-01", 190.0, 191.0, 10)
            .expect("update");
        batch.commit().expect("commit");

        let page = warehouse
            .query_daily(&DailyFilter::default(), 10, 0)
            .expect("query");
        assert_eq!(page.rows, vec![row("IBM", "2024-03-01", 190.0, 191.0, 10)]);
    }

    #[test]
    fn update_of_unknown_key_is_rejected() {
        let warehouse = seeded(&[]);
        let batch = warehouse.begin_daily_batch().expect("begin");

        let error = batch
            .update_prices("IBM", "2024-03-01", 1.0, 1.0, 1)
            .expect_err("must fail");

        assert!(matches!(error, WarehouseError::MissingRow { .. }));
    }

    #[test]
    fn query_daily_filters_orders_and_pages() {
        let warehouse = seeded(&[
            row("IBM", "2024-03-02", 2.0, 2.0, 2),
            row("AAPL", "2024-03-01", 1.0, 1.0, 1),
            row("IBM", "2024-03-01", 1.0, 1.0, 1),
            row("IBM", "2024-03-05", 5.0, 5.0, 5),
        ]);

        let filter = DailyFilter {
            symbol: Some(String::from("IBM")),
            start_date: String::from("2024-03-01"),
            end_date: String::from("2024-03-04"),
        };
        let page = warehouse.query_daily(&filter, 1, 1).expect("query");

        assert_eq!(page.total, 2);
        assert_eq!(page.rows, vec![row("IBM", "2024-03-02", 2.0, 2.0, 2)]);

        let everything = warehouse
            .query_daily(&DailyFilter::default(), 10, 0)
            .expect("query");
        let order: Vec<_> = everything
            .rows
            .iter()
            .map(|row| format!("{}@{}", row.symbol, row.date))
            .collect();
        assert_eq!(
            order,
            ["AAPL@2024-03-01", "IBM@2024-03-01", "IBM@2024-03-02", "IBM@2024-03-05"]
        );
    }

    #[test]
    fn query_daily_rejects_zero_limit() {
        let warehouse = seeded(&[]);
        let error = warehouse
            .query_daily(&DailyFilter::default(), 0, 0)
            .expect_err("must fail");
        assert!(matches!(error, WarehouseError::QueryRejected(_)));
    }

    #[test]
    fn daily_statistics_reports_bounds_and_means() {
        let warehouse = seeded(&[
            row("IBM", "2024-03-01", 10.0, 20.0, 100),
            row("IBM", "2024-03-04", 12.0, 22.0, 301),
            row("AAPL", "2024-03-02", 99.0, 99.0, 9),
        ]);

        let aggregate = warehouse
            .daily_statistics("IBM", "2024-01-01", "2024-12-31")
            .expect("stats")
            .expect("rows present");

        assert_eq!(aggregate.row_count, 2);
        assert_eq!(aggregate.first_date, "2024-03-01");
        assert_eq!(aggregate.last_date, "2024-03-04");
        assert!((aggregate.mean_open_price - 11.0).abs() < 1e-9);
        assert!((aggregate.mean_close_price - 21.0).abs() < 1e-9);
        assert!((aggregate.mean_volume - 200.5).abs() < 1e-9);
    }

    #[test]
    fn daily_statistics_is_none_for_empty_range() {
        let warehouse = seeded(&[row("IBM", "2024-03-01", 10.0, 20.0, 100)]);

        let aggregate = warehouse
            .daily_statistics("IBM", "2025-01-01", "2025-12-31")
            .expect("stats");

        assert!(aggregate.is_none());
    }

    #[test]
    fn symbol_filter_is_bound_not_interpolated() {
        let warehouse = seeded(&[row("IBM", "2024-03-01", 1.0, 1.0, 1)]);

        let filter = DailyFilter {
            symbol: Some(String::from("IBM' OR '1'='1")),
            ..DailyFilter::default()
        };
        let page = warehouse.query_daily(&filter, 5, 0).expect("query");

        assert_eq!(page.total, 0);
    }
}
