//! CLI argument definitions for pricesync.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ingest` | Fetch, validate and reconcile daily prices |
//! | `serve` | Run the HTTP read API |
//! | `daily` | Page through stored daily rows |
//! | `stats` | Averages for one symbol and date range |
//!
//! # Examples
//!
//! ```bash
//! pricesync ingest --symbols IBM,AAPL --latest-n-days 14
//! pricesync serve --port 8000
//! pricesync serve --port 8000 --ingest-every-secs 86400 --symbols IBM,AAPL
//! pricesync daily --symbol IBM --limit 10 --pretty
//! pricesync stats --symbol IBM --start-date 2024-01-01 --end-date 2024-03-31
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use pricesync_core::config::{DEFAULT_LATEST_N_DAYS, DEFAULT_SYMBOLS};

/// Daily stock price ingestion and reconciliation.
#[derive(Debug, Parser)]
#[command(name = "pricesync", version, about)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Warehouse file. Defaults to `$PRICESYNC_HOME/warehouse.duckdb`.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Attempts to open storage before giving up.
    #[arg(long, global = true, default_value_t = 10)]
    pub startup_attempts: u32,

    /// Seconds to wait between storage attempts.
    #[arg(long, global = true, default_value_t = 15)]
    pub startup_wait_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch daily series and reconcile them into the warehouse.
    ///
    /// The API key and endpoint come from `PRICESYNC_ALPHAVANTAGE_API_KEY`
    /// and `PRICESYNC_ALPHAVANTAGE_ENDPOINT`.
    Ingest(IngestArgs),

    /// Serve the read API until Ctrl-C.
    ///
    /// DuckDB admits one process per warehouse file, so a running server
    /// cannot be ingested into from another `pricesync` process. Pass
    /// `--ingest-every-secs` to ingest from inside the server instead.
    Serve(ServeArgs),

    /// Page through stored daily rows.
    Daily(DailyArgs),

    /// Average prices and volume for one symbol.
    Stats(StatsArgs),
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Comma-separated symbols.
    #[arg(long, default_value = DEFAULT_SYMBOLS)]
    pub symbols: String,

    /// Keep only this many of the most recent trading days per symbol.
    #[arg(long, default_value_t = DEFAULT_LATEST_N_DAYS)]
    pub latest_n_days: usize,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Ingest on start and then every this many seconds while serving.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub ingest_every_secs: Option<u64>,

    #[command(flatten)]
    pub ingest: IngestArgs,
}

/// Same parameters as `GET /api/financial_data/`.
#[derive(Debug, Args)]
pub struct DailyArgs {
    #[arg(long)]
    pub symbol: Option<String>,
    #[arg(long)]
    pub start_date: Option<String>,
    #[arg(long)]
    pub end_date: Option<String>,
    #[arg(long)]
    pub limit: Option<String>,
    #[arg(long)]
    pub page: Option<String>,
}

/// Same parameters as `GET /api/statistics/`.
#[derive(Debug, Args)]
pub struct StatsArgs {
    #[arg(long)]
    pub symbol: Option<String>,
    #[arg(long)]
    pub start_date: Option<String>,
    #[arg(long)]
    pub end_date: Option<String>,
}
