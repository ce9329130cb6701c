//! Minimal GET transport the provider adapters talk through.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Query parameters whose values never appear in logs.
const SECRET_PARAMS: [&str; 1] = ["apikey"];

/// One GET request: base URL, ordered query parameters, headers and a timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub base_url: String,
    pub query: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn get(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            query: Vec::new(),
            headers: BTreeMap::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL plus the percent-encoded query string.
    pub fn url(&self) -> String {
        self.render(|_, value| urlencoding::encode(value).into_owned())
    }

    /// Like [`HttpRequest::url`] with secret values masked.
    pub fn redacted_url(&self) -> String {
        self.render(|name, value| {
            if SECRET_PARAMS.contains(&name) {
                String::from("***")
            } else {
                urlencoding::encode(value).into_owned()
            }
        })
    }

    fn render(&self, value_of: impl Fn(&str, &str) -> String) -> String {
        if self.query.is_empty() {
            return self.base_url.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(name, value)| format!("{}={}", urlencoding::encode(name), value_of(name, value)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{query}", self.base_url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Why a request produced no response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorKind {
    Timeout,
    Connect,
    InvalidRequest,
    Body,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    kind: HttpErrorKind,
    message: String,
}

impl HttpError {
    pub fn new(kind: HttpErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> HttpErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Everything except a malformed request may succeed on a second try.
    pub const fn retryable(&self) -> bool {
        !matches!(self.kind, HttpErrorKind::InvalidRequest)
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Transport contract for GET requests.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;
}

/// Production HTTP client using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pricesync/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self::with_client(client)
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

fn classify(error: &reqwest::Error) -> HttpErrorKind {
    if error.is_timeout() {
        HttpErrorKind::Timeout
    } else if error.is_connect() {
        HttpErrorKind::Connect
    } else if error.is_builder() {
        HttpErrorKind::InvalidRequest
    } else if error.is_body() || error.is_decode() {
        HttpErrorKind::Body
    } else {
        HttpErrorKind::Other
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .get(&request.base_url)
                .query(&request.query)
                .timeout(request.timeout);
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            // reqwest errors embed the full URL, secrets included.
            let redacted = request.redacted_url();
            let response = builder.send().await.map_err(|e| {
                HttpError::new(classify(&e), format!("GET {redacted} failed: {}", e.without_url()))
            })?;

            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| {
                HttpError::new(
                    HttpErrorKind::Body,
                    format!("GET {redacted}: unreadable body: {}", e.without_url()),
                )
            })?;

            Ok(HttpResponse { status, body })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_encoded_query_and_masks_secrets() {
        let request = HttpRequest::get("https://example.test/query")
            .with_query("symbol", "BRK.B")
            .with_query("apikey", "my key");

        assert_eq!(
            request.url(),
            "https://example.test/query?symbol=BRK.B&apikey=my%20key"
        );
        assert_eq!(
            request.redacted_url(),
            "https://example.test/query?symbol=BRK.B&apikey=***"
        );
    }

    #[test]
    fn header_names_are_lowercased() {
        let request = HttpRequest::get("https://example.test").with_header("Accept", "application/json");

        assert_eq!(
            request.headers.get("accept").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(request.url(), "https://example.test");
    }

    #[test]
    fn only_invalid_requests_are_final() {
        assert!(HttpError::new(HttpErrorKind::Timeout, "slow").retryable());
        assert!(!HttpError::new(HttpErrorKind::InvalidRequest, "bad").retryable());
        assert!(!HttpResponse {
            status: 503,
            body: String::new()
        }
        .is_success());
    }
}
