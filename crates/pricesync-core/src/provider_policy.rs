use std::time::Duration;

use crate::retry::{Backoff, RetryConfig};

/// Request budget and resilience settings for one upstream provider.
#[derive(Debug, Clone)]
pub struct ProviderPolicy {
    pub quota_window: Duration,
    pub quota_limit: u32,
    pub timeout_ms: u64,
    pub retry: RetryConfig,
}

impl ProviderPolicy {
    /// Alpha Vantage free tier: five requests per minute.
    pub fn alphavantage_default() -> Self {
        Self {
            quota_window: Duration::from_secs(60),
            quota_limit: 5,
            timeout_ms: 10_000,
            retry: RetryConfig {
                max_retries: 2,
                backoff: Backoff::Exponential {
                    base: Duration::from_secs(1),
                    factor: 2.0,
                    max: Duration::from_secs(60),
                    jitter: true,
                },
                ..RetryConfig::default()
            },
        }
    }

    /// No throttling and no retries, for offline runs against fake transports.
    pub fn unthrottled() -> Self {
        Self {
            quota_window: Duration::from_millis(1),
            quota_limit: u32::MAX,
            timeout_ms: 1_000,
            retry: RetryConfig::no_retry(),
        }
    }
}
