use std::time::Duration;

use pricesync_core::Warehouse;
use serde_json::json;

use crate::cli::ServeArgs;
use crate::error::CliError;

use super::{ingest, CommandResult};

/// Serve until Ctrl-C, optionally ingesting on a schedule in the same
/// process so both share one warehouse handle.
pub async fn run(args: &ServeArgs, warehouse: Warehouse) -> Result<CommandResult, CliError> {
    let Some(every_secs) = args.ingest_every_secs else {
        pricesync_web::serve(warehouse, args.port).await?;
        return Ok(stopped(args));
    };

    let (symbols, pipeline) = ingest::prepare(&args.ingest, warehouse.clone())?;
    tracing::info!(every_secs, symbols = symbols.len(), "scheduled ingest enabled");
    let schedule = pipeline.run_every(
        &symbols,
        args.ingest.latest_n_days,
        Duration::from_secs(every_secs),
    );

    tokio::select! {
        served = pricesync_web::serve(warehouse, args.port) => served?,
        _ = schedule => {}
    }
    Ok(stopped(args))
}

fn stopped(args: &ServeArgs) -> CommandResult {
    CommandResult::ok(json!({
        "port": args.port,
        "ingest_every_secs": args.ingest_every_secs,
        "status": "stopped",
    }))
}
