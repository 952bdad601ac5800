//! Exponential-backoff retry for ephemeral store calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use keyward_core::config::RetryConfig;
use keyward_core::result::AppResult;

/// Retries transient failures with exponentially growing, capped delays.
///
/// Only errors whose kind is transient are retried; anything else is
/// returned on the first attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Policy for single-key operations.
    pub fn single(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
            multiplier: 2.0,
        }
    }

    /// Policy for bulk operations.
    pub fn bulk(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.bulk_max_attempts.max(1),
            ..Self::single(config)
        }
    }

    /// The delay that follows `current`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let next_ms = (current.as_millis() as f64 * self.multiplier) as u64;
        Duration::from_millis(next_ms).min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut op: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut delay = self.initial_backoff.min(self.max_backoff);
        let mut attempt = 1u32;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Ephemeral store call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = self.next_delay(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use keyward_core::error::{AppError, ErrorKind};

    fn policy() -> RetryPolicy {
        RetryPolicy::single(&RetryConfig::default())
    }

    #[test]
    fn test_next_delay_doubles_and_clamps() {
        let p = policy();
        assert_eq!(p.next_delay(Duration::from_millis(100)), Duration::from_millis(200));
        assert_eq!(p.next_delay(Duration::from_millis(1500)), Duration::from_millis(2000));
        assert_eq!(p.next_delay(Duration::from_millis(2000)), Duration::from_millis(2000));
    }

    #[test]
    fn test_bulk_policy_allows_more_attempts() {
        let config = RetryConfig::default();
        assert_eq!(RetryPolicy::single(&config).max_attempts, 3);
        assert_eq!(RetryPolicy::bulk(&config).max_attempts, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let calls = &AtomicU32::new(0);
        let result = policy()
            .run("test", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(AppError::cache("connection reset"))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = &AtomicU32::new(0);
        let result: AppResult<()> = policy()
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::cache("down"))
            })
            .await;

        assert_eq!(result.unwrap_err().kind, ErrorKind::Cache);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_errors_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: AppResult<()> = policy()
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::bad_request("nope"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
