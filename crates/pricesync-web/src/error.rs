use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tokio::task::JoinError;

use pricesync_core::read::{RawDataResponse, StatisticsResponse};
use pricesync_core::CoreError;

/// Read endpoint a failure belongs to. Each answers in its own body shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    FinancialData,
    Statistics,
}

#[derive(Debug, Error)]
pub enum ReadFailure {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("read task failed: {0}")]
    Task(#[from] JoinError),
}

/// Failures that prevent a read endpoint from answering.
///
/// Parameter violations are not errors here; they are part of a normal
/// response body.
#[derive(Debug, Error)]
#[error("{failure}")]
pub struct ApiError {
    endpoint: Endpoint,
    #[source]
    failure: ReadFailure,
}

impl ApiError {
    pub fn new(endpoint: Endpoint, failure: impl Into<ReadFailure>) -> Self {
        Self {
            endpoint,
            failure: failure.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(endpoint = ?self.endpoint, error = %self, "read request failed");
        let message = self.to_string();
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        match self.endpoint {
            Endpoint::FinancialData => {
                (status, Json(RawDataResponse::failed(message))).into_response()
            }
            Endpoint::Statistics => {
                (status, Json(StatisticsResponse::failed(message))).into_response()
            }
        }
    }
}
