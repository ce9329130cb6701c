//! Core of pricesync.
//!
//! This crate contains:
//! - Domain types for daily observations and their validation
//! - The payload schema validator and record transformer
//! - Reconciliation against a unit-of-work store
//! - Request parameter constraints and the read services
//! - The Alpha Vantage transport with throttling and retry
//! - The per-symbol ingest pipeline

pub mod adapters;
pub mod config;
pub mod constraints;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod http_client;
pub mod pipeline;
pub mod provider_policy;
pub mod read;
pub mod reconcile;
pub mod retry;
pub mod schema;
pub mod source;
pub mod startup;
pub mod throttling;
pub mod transform;

pub use adapters::AlphaVantageSource;
pub use config::{ConfigError, IngestConfig};
pub use constraints::{Constraint, ConstraintSet, FieldErrors};
pub use domain::{DailyRecord, DateFormat, Symbol, TradingDate, MAX_VOLUME, SYMBOL_MAX_LENGTH};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};
pub use error::{CoreError, ValidationError};
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpRequest, HttpResponse, ReqwestHttpClient,
};
pub use pipeline::{IngestPipeline, IngestReport, SymbolOutcome, SymbolReport};
pub use pricesync_warehouse::{Warehouse, WarehouseConfig, WarehouseError};
pub use provider_policy::ProviderPolicy;
pub use read::{
    raw_data_response, statistics_response, RawDataParams, RawDataResponse, StatisticsParams,
    StatisticsResponse,
};
pub use reconcile::{reconcile, DailyStore, ReconciliationResult, StoreError, UnitOfWork};
pub use retry::{Backoff, RetryConfig};
pub use schema::{KeyPath, PayloadSchema, ValidatedPayload, ValidationReport};
pub use source::{DailySource, SourceError, SourceErrorKind};
pub use startup::{open_warehouse_with_retry, StartupPolicy};
pub use throttling::Throttle;
pub use transform::{to_daily_records, TransformError};
