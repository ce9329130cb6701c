mod daily;
mod ingest;
mod serve;
mod stats;

use std::time::{Duration, Instant};

use pricesync_core::{
    open_warehouse_with_retry, Envelope, EnvelopeError, EnvelopeMeta, StartupPolicy, Warehouse,
    WarehouseConfig,
};
use serde_json::Value;
use uuid::Uuid;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let started = Instant::now();
    let warehouse = open_warehouse(cli).await?;

    let command_result = match &cli.command {
        Command::Ingest(args) => ingest::run(args, warehouse).await?,
        Command::Serve(args) => serve::run(args, warehouse).await?,
        Command::Daily(args) => daily::run(args, &warehouse)?,
        Command::Stats(args) => stats::run(args, &warehouse)?,
    };

    let CommandResult {
        data,
        warnings,
        errors,
    } = command_result;

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let mut meta = EnvelopeMeta::new(Uuid::new_v4().to_string(), latency_ms)?;
    for warning in warnings {
        meta.push_warning(warning);
    }

    Envelope::with_errors(meta, data, errors).map_err(CliError::from)
}

async fn open_warehouse(cli: &Cli) -> Result<Warehouse, CliError> {
    let config = match &cli.db_path {
        Some(path) => WarehouseConfig::at(path.clone()),
        None => WarehouseConfig::default(),
    };
    let policy = StartupPolicy {
        attempts: cli.startup_attempts,
        wait: Duration::from_secs(cli.startup_wait_secs),
    };

    tracing::debug!(db_path = %config.db_path.display(), "opening warehouse");
    Ok(open_warehouse_with_retry(config, &policy).await?)
}
