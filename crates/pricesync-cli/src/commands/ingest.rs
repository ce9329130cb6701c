use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pricesync_core::{
    AlphaVantageSource, EnvelopeError, IngestConfig, IngestPipeline, IngestReport,
    ReqwestHttpClient, Symbol, SymbolOutcome, Warehouse,
};

use crate::cli::IngestArgs;
use crate::error::CliError;

use super::CommandResult;

/// Parsed symbols and a pipeline from Alpha Vantage into `warehouse`.
pub(super) fn prepare(
    args: &IngestArgs,
    warehouse: Warehouse,
) -> Result<(Vec<Symbol>, IngestPipeline<Warehouse>), CliError> {
    let symbols = Symbol::parse_list(&args.symbols)?;
    if symbols.is_empty() {
        return Err(CliError::Command(String::from(
            "at least one symbol is required",
        )));
    }

    let config = IngestConfig::from_env()?;
    let source = AlphaVantageSource::new(Arc::new(ReqwestHttpClient::new()), config.api_key)
        .with_endpoint(config.endpoint);
    Ok((symbols, IngestPipeline::new(Arc::new(source), warehouse)))
}

pub async fn run(args: &IngestArgs, warehouse: Warehouse) -> Result<CommandResult, CliError> {
    let (symbols, pipeline) = prepare(args, warehouse)?;

    let stop = Arc::new(AtomicBool::new(false));
    let watcher = {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("stop requested; finishing the current symbol");
                stop.store(true, Ordering::SeqCst);
            }
        })
    };

    let pipeline = pipeline.with_stop_flag(stop);
    let report = pipeline.run(&symbols, args.latest_n_days).await;
    watcher.abort();

    let errors = envelope_errors(&report)?;
    let mut result = CommandResult::ok(serde_json::to_value(&report)?).with_errors(errors);
    if report.cancelled > 0 {
        result = result.with_warning(format!(
            "stopped early; {} symbol(s) not processed",
            report.cancelled
        ));
    }
    Ok(result)
}

fn envelope_errors(report: &IngestReport) -> Result<Vec<EnvelopeError>, CliError> {
    let mut errors = Vec::new();
    for entry in &report.symbols {
        let (code, message, retryable) = match &entry.outcome {
            SymbolOutcome::FetchFailed {
                code,
                message,
                retryable,
            } => (*code, message.clone(), Some(*retryable)),
            SymbolOutcome::SchemaRejected { violations } => {
                ("ingest.schema_rejected", violations.join("; "), None)
            }
            SymbolOutcome::TransformFailed { message } => {
                ("ingest.transform_failed", message.clone(), None)
            }
            SymbolOutcome::StoreFailed { message } => {
                ("ingest.store_failed", message.clone(), None)
            }
            SymbolOutcome::Reconciled { .. } | SymbolOutcome::Cancelled => continue,
        };

        let mut error = EnvelopeError::new(code, message)?.with_symbol(entry.symbol.clone());
        if let Some(retryable) = retryable {
            error = error.with_retryable(retryable);
        }
        errors.push(error);
    }
    Ok(errors)
}
