// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry logic with randomized exponential backoff.
//!
//! Only transient failures (backend throttling) are retried. Anything else
//! propagates on its first occurrence, and running out of attempts returns
//! the last error unchanged.
//!
//! # Example
//!
//! ```
//! use search_bridge::RetryConfig;
//! use std::time::Duration;
//!
//! let config = RetryConfig::default();
//! assert_eq!(config.max_attempts, 10);
//! assert_eq!(config.max_delay, Duration::from_secs(4));
//! ```

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::BridgeConfig;
use crate::error::{ClientError, SearchError};

/// Errors that may clear up if the call is simply made again.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for ClientError {
    fn is_transient(&self) -> bool {
        ClientError::is_transient(self)
    }
}

impl Transient for SearchError {
    fn is_transient(&self) -> bool {
        SearchError::is_transient(self)
    }
}

/// Configuration for retrying throttled backend calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, the first call included
    pub max_attempts: usize,
    pub base_delay: Duration,
    /// Ceiling for a single backoff
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(4),
        }
    }
}

impl From<&BridgeConfig> for RetryConfig {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            max_attempts: config.retry_max_attempts,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_wait_ms),
        }
    }
}

impl RetryConfig {
    /// Upper bound of the backoff after `attempt` failures:
    /// `min(max_delay, base_delay * 2^attempt)`.
    #[must_use]
    pub fn delay_ceiling(&self, attempt: usize) -> Duration {
        let factor = u32::try_from(attempt)
            .ok()
            .and_then(|exp| 2u32.checked_pow(exp))
            .unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Randomized backoff, uniform in `[ceiling / 2, ceiling)`.
    #[must_use]
    pub fn backoff(&self, attempt: usize) -> Duration {
        let ceiling = self.delay_ceiling(attempt);
        let floor = ceiling / 2;
        if floor >= ceiling {
            return ceiling;
        }
        let nanos = rand::rng().random_range(floor.as_nanos()..ceiling.as_nanos());
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Fast retry for tests (minimal delays)
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
        }
    }
}

/// Run `operation`, retrying transient failures with backoff.
pub async fn retry<F, Fut, T, E>(
    operation_name: &str,
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + std::fmt::Display,
{
    let mut attempts: usize = 0;

    loop {
        match operation().await {
            Ok(val) => {
                if attempts > 0 {
                    info!(operation = operation_name, retries = attempts, "Operation succeeded after retries");
                }
                return Ok(val);
            }
            Err(err) => {
                if !err.is_transient() {
                    return Err(err);
                }

                attempts += 1;
                if attempts >= config.max_attempts {
                    warn!(operation = operation_name, attempts, error = %err, "Giving up on throttled operation");
                    crate::metrics::record_retry_exhausted(operation_name);
                    return Err(err);
                }

                let delay = config.backoff(attempts);
                warn!(
                    operation = operation_name,
                    attempt = attempts,
                    max_attempts = config.max_attempts,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "Operation throttled, retrying"
                );
                crate::metrics::record_retry(operation_name);
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn throttled() -> ClientError {
        ClientError::Throttled("slow down".into())
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_try() {
        let result: Result<i32, ClientError> =
            retry("test_op", &RetryConfig::test(), || async { Ok(42) }).await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<i32, ClientError> = retry("test_op", &RetryConfig::test(), || {
            let a = attempts_clone.clone();
            async move {
                let count = a.fetch_add(1, Ordering::SeqCst) + 1;
                if count < 3 {
                    Err(throttled())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausts_attempts_with_original_error() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<i32, ClientError> = retry("test_op", &RetryConfig::test(), || {
            let a = attempts_clone.clone();
            async move {
                let count = a.fetch_add(1, Ordering::SeqCst) + 1;
                Err(ClientError::Throttled(format!("fail {count}")))
            }
        })
        .await;

        assert_eq!(result.unwrap_err(), ClientError::Throttled("fail 3".into()));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_transient_error_is_not_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<i32, SearchError> = retry("test_op", &RetryConfig::test(), || {
            let a = attempts_clone.clone();
            async move {
                a.fetch_add(1, Ordering::SeqCst);
                Err(SearchError::Client(ClientError::Rejected {
                    status: 400,
                    message: "bad document".into(),
                }))
            }
        })
        .await;

        assert!(matches!(
            result,
            Err(SearchError::Client(ClientError::Rejected { status: 400, .. }))
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_config_from_bridge_config() {
        let config = RetryConfig::from(&BridgeConfig::default());
        assert_eq!(config, RetryConfig::default());
    }

    #[test]
    fn test_delay_ceiling_grows_then_caps() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_ceiling(0), Duration::from_millis(50));
        assert_eq!(config.delay_ceiling(1), Duration::from_millis(100));
        assert_eq!(config.delay_ceiling(3), Duration::from_millis(400));
        assert_eq!(config.delay_ceiling(7), Duration::from_secs(4));
        assert_eq!(config.delay_ceiling(40), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_stays_in_upper_half() {
        let config = RetryConfig::default();
        for attempt in 0..12 {
            let ceiling = config.delay_ceiling(attempt);
            let delay = config.backoff(attempt);
            assert!(delay >= ceiling / 2, "{delay:?} below half of {ceiling:?}");
            assert!(delay < ceiling, "{delay:?} not below {ceiling:?}");
        }
    }
}
