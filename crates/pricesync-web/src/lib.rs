//! HTTP read API over the pricesync warehouse.
//!
//! | Route | Description |
//! |-------|-------------|
//! | `GET /api/financial_data/` | Paginated daily rows |
//! | `GET /api/statistics/` | Averages for one symbol and date range |
//! | `GET /health` | Liveness |
//!
//! Both API routes also answer without the trailing slash.

mod error;
mod handlers;

use std::net::SocketAddr;

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use pricesync_core::Warehouse;

pub use error::{ApiError, Endpoint, ReadFailure};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub warehouse: Warehouse,
}

pub fn router(warehouse: Warehouse) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/financial_data", get(handlers::financial_data))
        .route("/api/financial_data/", get(handlers::financial_data))
        .route("/api/statistics", get(handlers::statistics))
        .route("/api/statistics/", get(handlers::statistics))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { warehouse })
}

/// Serve the API on `0.0.0.0:port` until Ctrl-C.
pub async fn serve(warehouse: Warehouse, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");

    axum::serve(listener, router(warehouse))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "cannot listen for Ctrl-C; shutting down");
        return;
    }
    tracing::info!("shutdown requested");
}
