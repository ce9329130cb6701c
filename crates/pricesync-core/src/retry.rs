//! Retry logic with fixed or exponential backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Backoff strategy for retrying failed operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed {
        /// Delay between retries.
        delay: Duration,
    },
    /// Uses an exponential delay between retries.
    ///
    /// The delay is calculated as `base * (factor ^ attempt)`.
    Exponential {
        /// The initial backoff duration.
        base: Duration,
        /// The multiplicative factor for each subsequent retry.
        factor: f64,
        /// The maximum duration to wait between retries.
        max: Duration,
        /// Whether to apply random jitter (+/- 50%) to the delay.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(500),
            factor: 2.0,
            max: Duration::from_secs(8),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(attempt.min(i32::MAX as u32) as i32);
                let seconds = base.as_secs_f64() * scale;
                let capped_seconds = seconds.min(max.as_secs_f64());

                let mut delay = Duration::from_secs_f64(capped_seconds);

                if jitter {
                    let jitter_ms = (delay.as_millis() as f64 * 0.5) as u64;
                    let random_offset = fastrand::u64(0..=(jitter_ms * 2));
                    let total_ms =
                        delay.as_millis() as i64 + (random_offset as i64 - jitter_ms as i64);
                    delay = Duration::from_millis(total_ms.max(0) as u64);
                }

                delay
            }
        }
    }
}

/// Configuration for the automatic retry mechanism.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Enables or disables the retry mechanism.
    pub enabled: bool,
    /// The maximum number of retries to attempt.
    /// Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// The backoff strategy to use between retries.
    pub backoff: Backoff,
    /// HTTP status codes that should trigger a retry.
    pub retry_on_status: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 2,
            backoff: Backoff::default(),
            retry_on_status: vec![408, 429, 500, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with fixed backoff.
    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    /// Fixed backoff expressed as a total number of attempts.
    pub fn attempts(attempts: u32, delay: Duration) -> Self {
        Self::fixed(delay, attempts.saturating_sub(1))
    }

    /// Disable retries.
    pub fn no_retry() -> Self {
        Self {
            enabled: false,
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

/// Run `operation` until it succeeds, returns an error `is_retryable`
/// rejects, or the retry budget is spent. The last error is returned.
///
/// `operation` receives the 0-based attempt number.
pub async fn retry_async<T, E, F, Fut, R>(
    config: &RetryConfig,
    mut operation: F,
    is_retryable: R,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: Display,
{
    let mut attempt = 0;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if !config.enabled || attempt >= config.max_retries || !is_retryable(&error) {
                    return Err(error);
                }

                let delay = config.delay_for_attempt(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts = config.max_retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    %error,
                    "attempt failed; retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_fixed_backoff() {
        let backoff = Backoff::Fixed {
            delay: Duration::from_millis(100),
        };

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(10), Duration::from_millis(100));
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_secs(1),
            jitter: false,
        };

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(800));
        assert_eq!(backoff.delay(4), Duration::from_secs(1));
    }

    #[test]
    fn test_exponential_backoff_with_jitter_stays_in_band() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_secs(1),
            jitter: true,
        };

        for attempt in 0..5 {
            let delay_ms = backoff.delay(attempt).as_millis() as f64;
            let expected = (100.0 * 2_f64.powi(attempt as i32)).min(1000.0);
            assert!(delay_ms >= expected * 0.49, "attempt={attempt}, delay_ms={delay_ms}");
            assert!(delay_ms <= expected * 1.51, "attempt={attempt}, delay_ms={delay_ms}");
        }
    }

    #[test]
    fn attempts_counts_the_first_try() {
        let config = RetryConfig::attempts(10, Duration::from_secs(15));

        assert_eq!(config.max_retries, 9);
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(15));
        assert!(config.should_retry_status(503));
        assert!(!config.should_retry_status(404));
    }

    #[tokio::test]
    async fn retry_async_stops_after_budget() {
        let calls = Cell::new(0);
        let config = RetryConfig::attempts(3, Duration::ZERO);

        let result: Result<(), String> = retry_async(
            &config,
            |_| {
                calls.set(calls.get() + 1);
                async { Err(String::from("down")) }
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Err(String::from("down")));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn retry_async_returns_first_success() {
        let config = RetryConfig::attempts(5, Duration::ZERO);

        let result: Result<u32, String> = retry_async(
            &config,
            |attempt| async move {
                if attempt < 2 {
                    Err(format!("attempt {attempt} failed"))
                } else {
                    Ok(attempt)
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Ok(2));
    }

    #[tokio::test]
    async fn retry_async_does_not_retry_permanent_errors() {
        let calls = Cell::new(0);

        let result: Result<(), String> = retry_async(
            &RetryConfig::attempts(5, Duration::ZERO),
            |_| {
                calls.set(calls.get() + 1);
                async { Err(String::from("bad request")) }
            },
            |_| false,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
        assert!(!RetryConfig::no_retry().enabled);
    }
}
