use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::domain::Symbol;
use crate::http_client::{HttpClient, HttpErrorKind, HttpRequest};
use crate::provider_policy::ProviderPolicy;
use crate::retry::retry_async;
use crate::source::{DailySource, SourceError};
use crate::throttling::Throttle;

pub const DEFAULT_ENDPOINT: &str = "https://www.alphavantage.co/query";

/// Key names of the `TIME_SERIES_DAILY_ADJUSTED` response.
pub mod layout {
    pub const META_DATA: &str = "Meta Data";
    pub const SYMBOL: &str = "2. Symbol";
    pub const TIME_SERIES: &str = "Time Series (Daily)";
    pub const OPEN: &str = "1. open";
    pub const CLOSE: &str = "4. close";
    pub const VOLUME: &str = "6. volume";
}

/// Daily time-series source backed by the Alpha Vantage query API.
#[derive(Clone)]
pub struct AlphaVantageSource {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    endpoint: String,
    policy: ProviderPolicy,
    throttle: Throttle,
}

impl AlphaVantageSource {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        let policy = ProviderPolicy::alphavantage_default();
        Self {
            http_client,
            api_key: api_key.into(),
            endpoint: String::from(DEFAULT_ENDPOINT),
            throttle: Throttle::from_policy(&policy),
            policy,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_policy(mut self, policy: ProviderPolicy) -> Self {
        self.throttle = Throttle::from_policy(&policy);
        self.policy = policy;
        self
    }

    fn request(&self, symbol: &Symbol) -> HttpRequest {
        HttpRequest::get(self.endpoint.as_str())
            .with_query("function", "TIME_SERIES_DAILY_ADJUSTED")
            .with_query("symbol", symbol.as_str())
            .with_query("outputsize", "compact")
            .with_query("apikey", self.api_key.as_str())
            .with_header("accept", "application/json")
            .with_timeout(Duration::from_millis(self.policy.timeout_ms))
    }

    async fn fetch_once(&self, symbol: &Symbol) -> Result<Value, SourceError> {
        self.throttle.acquire().await;

        let request = self.request(symbol);
        tracing::debug!(%symbol, url = %request.redacted_url(), "requesting daily series");

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| match e.kind() {
                HttpErrorKind::InvalidRequest => SourceError::invalid_request(e.message()),
                _ => SourceError::unavailable(format!("alphavantage transport error: {e}"))
                    .with_retryable(e.retryable()),
            })?;

        if !response.is_success() {
            let retryable = self.policy.retry.should_retry_status(response.status);
            let message = format!("alphavantage returned status {}", response.status);
            let error = if response.status == 429 {
                SourceError::rate_limited(message)
            } else {
                SourceError::unavailable(message)
            };
            return Err(error.with_retryable(retryable));
        }

        serde_json::from_str(&response.body).map_err(|e| {
            SourceError::internal(format!("alphavantage response is not valid JSON: {e}"))
        })
    }
}

impl DailySource for AlphaVantageSource {
    fn fetch_daily<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<Value, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            retry_async(
                &self.policy.retry,
                |_| self.fetch_once(symbol),
                SourceError::retryable,
            )
            .await
        })
    }
}
