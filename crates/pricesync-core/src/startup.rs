//! Opening storage at process start, retrying while it is unavailable.

use std::fmt::Display;
use std::time::Duration;

use pricesync_warehouse::{Warehouse, WarehouseConfig, WarehouseError};

use crate::retry::{retry_async, RetryConfig};

/// Total attempts and the fixed wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupPolicy {
    pub attempts: u32,
    pub wait: Duration,
}

impl Default for StartupPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            wait: Duration::from_secs(15),
        }
    }
}

impl StartupPolicy {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::attempts(self.attempts.max(1), self.wait)
    }
}

/// Call `open` until it succeeds or the policy's attempts are spent.
pub async fn open_with_retry<T, E, F>(policy: &StartupPolicy, mut open: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: Display,
{
    let result = retry_async(
        &policy.retry_config(),
        |_| std::future::ready(open()),
        |_| true,
    )
    .await;

    if let Err(error) = &result {
        tracing::error!(attempts = policy.attempts, %error, "storage unavailable; giving up");
    }
    result
}

pub async fn open_warehouse_with_retry(
    config: WarehouseConfig,
    policy: &StartupPolicy,
) -> Result<Warehouse, WarehouseError> {
    open_with_retry(policy, || Warehouse::open(config.clone())).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(attempts: u32) -> StartupPolicy {
        StartupPolicy {
            attempts,
            wait: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn gives_up_after_configured_attempts() {
        let mut calls = 0;

        let result: Result<(), String> = open_with_retry(&quick(3), || {
            calls += 1;
            Err(String::from("connection refused"))
        })
        .await;

        assert_eq!(result, Err(String::from("connection refused")));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn succeeds_once_storage_comes_up() {
        let mut calls = 0;

        let result: Result<u32, String> = open_with_retry(&quick(10), || {
            calls += 1;
            if calls < 4 {
                Err(String::from("not yet"))
            } else {
                Ok(calls)
            }
        })
        .await;

        assert_eq!(result, Ok(4));
    }

    #[tokio::test]
    async fn opens_a_warehouse() {
        let temp = tempfile::tempdir().expect("tempdir");

        let warehouse = open_warehouse_with_retry(
            WarehouseConfig::at(temp.path().join("warehouse.duckdb")),
            &quick(1),
        )
        .await
        .expect("open");

        assert!(warehouse.db_path().exists());
    }

    #[test]
    fn default_policy_waits_fifteen_seconds_between_ten_attempts() {
        let retry = StartupPolicy::default().retry_config();

        assert_eq!(retry.max_retries, 9);
        assert_eq!(retry.delay_for_attempt(3), Duration::from_secs(15));
    }
}
