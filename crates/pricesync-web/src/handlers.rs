use axum::extract::{Query, State};
use axum::Json;
use serde_json::{json, Value};

use pricesync_core::read::{
    raw_data_response, statistics_response, RawDataParams, RawDataResponse, StatisticsParams,
    StatisticsResponse,
};
use pricesync_core::CoreError;

use crate::error::{ApiError, Endpoint};
use crate::AppState;

pub async fn financial_data(
    State(state): State<AppState>,
    Query(params): Query<RawDataParams>,
) -> Result<Json<RawDataResponse>, ApiError> {
    let warehouse = state.warehouse.clone();
    let response = off_runtime(Endpoint::FinancialData, move || {
        raw_data_response(&warehouse, &params)
    })
    .await?;
    Ok(Json(response))
}

pub async fn statistics(
    State(state): State<AppState>,
    Query(params): Query<StatisticsParams>,
) -> Result<Json<StatisticsResponse>, ApiError> {
    let warehouse = state.warehouse.clone();
    let response = off_runtime(Endpoint::Statistics, move || {
        statistics_response(&warehouse, &params)
    })
    .await?;
    Ok(Json(response))
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// DuckDB reads block; run them on the blocking pool.
async fn off_runtime<T, F>(endpoint: Endpoint, read: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(read)
        .await
        .map_err(|error| ApiError::new(endpoint, error))?
        .map_err(|error| ApiError::new(endpoint, error))
}
