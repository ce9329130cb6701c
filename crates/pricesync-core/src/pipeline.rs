//! Fetch, validate, transform and reconcile, one symbol at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::MissedTickBehavior;

use crate::domain::Symbol;
use crate::reconcile::{reconcile, DailyStore};
use crate::schema::PayloadSchema;
use crate::source::{provider_error, DailySource, SourceError};
use crate::transform::to_daily_records;

/// What happened to one symbol during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SymbolOutcome {
    Reconciled {
        inserted: usize,
        updated: usize,
    },
    FetchFailed {
        code: &'static str,
        message: String,
        retryable: bool,
    },
    SchemaRejected {
        violations: Vec<String>,
    },
    TransformFailed {
        message: String,
    },
    StoreFailed {
        message: String,
    },
    Cancelled,
}

impl SymbolOutcome {
    fn fetch_failed(error: &SourceError) -> Self {
        Self::FetchFailed {
            code: error.code(),
            message: error.message().to_owned(),
            retryable: error.retryable(),
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Reconciled { .. } | Self::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolReport {
    pub symbol: String,
    #[serde(flatten)]
    pub outcome: SymbolOutcome,
}

/// Per-symbol outcomes of one run, in input order, plus totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub symbols: Vec<SymbolReport>,
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl IngestReport {
    fn push(&mut self, symbol: &Symbol, outcome: SymbolOutcome) {
        match &outcome {
            SymbolOutcome::Reconciled { inserted, updated } => {
                self.inserted += inserted;
                self.updated += updated;
            }
            SymbolOutcome::Cancelled => self.cancelled += 1,
            _ => self.failed += 1,
        }
        self.symbols.push(SymbolReport {
            symbol: symbol.to_string(),
            outcome,
        });
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Sequential ingestion over a list of symbols.
///
/// A failing symbol is logged and recorded, then the run moves on. Commits of
/// earlier symbols stay in place.
pub struct IngestPipeline<D> {
    source: Arc<dyn DailySource>,
    store: D,
    schema: PayloadSchema,
    stop: Option<Arc<AtomicBool>>,
}

impl<D: DailyStore> IngestPipeline<D> {
    pub fn new(source: Arc<dyn DailySource>, store: D) -> Self {
        Self {
            source,
            store,
            schema: PayloadSchema::alphavantage_daily(),
            stop: None,
        }
    }

    /// Stop before the next symbol once `stop` is raised.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn store(&self) -> &D {
        &self.store
    }

    fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|stop| stop.load(Ordering::SeqCst))
    }

    pub async fn run(&self, symbols: &[Symbol], latest_n_days: usize) -> IngestReport {
        let mut report = IngestReport::default();

        for symbol in symbols {
            let outcome = if self.stop_requested() {
                SymbolOutcome::Cancelled
            } else {
                self.ingest_symbol(symbol, latest_n_days).await
            };
            report.push(symbol, outcome);
        }

        if report.cancelled > 0 {
            tracing::warn!(cancelled = report.cancelled, "ingest stopped early");
        }
        tracing::info!(
            symbols = symbols.len(),
            inserted = report.inserted,
            updated = report.updated,
            failed = report.failed,
            "ingest finished"
        );
        report
    }

    /// Repeat [`IngestPipeline::run`] every `period`, starting immediately,
    /// until the stop flag is raised. Returns the number of completed runs.
    ///
    /// Without a stop flag this never returns.
    pub async fn run_every(
        &self,
        symbols: &[Symbol],
        latest_n_days: usize,
        period: Duration,
    ) -> usize {
        let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut runs = 0;
        loop {
            ticker.tick().await;
            if self.stop_requested() {
                break;
            }
            let report = self.run(symbols, latest_n_days).await;
            runs += 1;
            tracing::debug!(run = runs, failed = report.failed, "scheduled ingest run done");
        }
        runs
    }

    pub async fn ingest_symbol(&self, symbol: &Symbol, latest_n_days: usize) -> SymbolOutcome {
        let payload = match self.source.fetch_daily(symbol).await {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(%symbol, code = error.code(), %error, "fetch failed; skipping");
                return SymbolOutcome::fetch_failed(&error);
            }
        };

        if let Some(message) = provider_error(&payload) {
            let error = SourceError::provider(message);
            tracing::warn!(%symbol, %error, "provider reported an error; skipping");
            return SymbolOutcome::fetch_failed(&error);
        }

        let payload = match self.schema.accept(payload) {
            Ok(payload) => payload,
            Err(report) => {
                tracing::warn!(
                    %symbol,
                    violations = report.len(),
                    details = %report,
                    "payload failed schema validation; skipping"
                );
                return SymbolOutcome::SchemaRejected {
                    violations: report.messages(),
                };
            }
        };

        let records = match to_daily_records(&payload, latest_n_days) {
            Ok(records) => records,
            Err(error) => {
                tracing::error!(%symbol, %error, "payload could not be transformed; skipping");
                return SymbolOutcome::TransformFailed {
                    message: error.to_string(),
                };
            }
        };

        match reconcile(&self.store, &records) {
            Ok(result) => {
                tracing::info!(
                    %symbol,
                    inserted = result.inserted,
                    updated = result.updated,
                    "symbol reconciled"
                );
                SymbolOutcome::Reconciled {
                    inserted: result.inserted,
                    updated: result.updated,
                }
            }
            Err(error) => {
                tracing::error!(%symbol, %error, "reconciliation rolled back");
                SymbolOutcome::StoreFailed {
                    message: error.to_string(),
                }
            }
        }
    }
}
