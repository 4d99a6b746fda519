//! Retry with exponential backoff for transient adapter failures

use super::{CatalogError, CatalogResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Longest server-requested wait we honour
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Bounded retry for `RateLimited` and `Timeout`
///
/// Attempt `n` waits `base_delay * 2^(n-1)`, capped at `max_delay`. A larger
/// `Retry-After` from the server wins (up to 30 s).
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Self::default()
        }
    }

    /// Never retry
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Wait before the attempt following attempt number `attempt` (1-based)
    pub fn backoff_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);

        match retry_after {
            Some(requested) if requested > backoff => requested.min(MAX_RETRY_AFTER),
            _ => backoff,
        }
    }

    /// Run `operation`, retrying transient failures
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt_fn: F) -> CatalogResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CatalogResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let retry_after = match &e {
                        CatalogError::RateLimited { retry_after } => *retry_after,
                        _ => None,
                    };
                    let delay = self.backoff_delay(attempt, retry_after);
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient upstream failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
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

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(1, None), Duration::from_millis(500));
        assert_eq!(policy.backoff_delay(2, None), Duration::from_millis(1000));
        assert_eq!(policy.backoff_delay(3, None), Duration::from_millis(2000));
        assert_eq!(policy.backoff_delay(10, None), Duration::from_secs(8));
    }

    #[test]
    fn test_retry_after_takes_precedence_when_larger() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.backoff_delay(1, Some(Duration::from_secs(3))),
            Duration::from_secs(3)
        );
        assert_eq!(
            policy.backoff_delay(1, Some(Duration::from_millis(100))),
            Duration::from_millis(500)
        );
        assert_eq!(
            policy.backoff_delay(1, Some(Duration::from_secs(600))),
            MAX_RETRY_AFTER
        );
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result = policy
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(CatalogError::Timeout)
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: CatalogResult<()> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(CatalogError::RateLimited { retry_after: None }) }
            })
            .await;

        assert!(matches!(result, Err(CatalogError::RateLimited { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: CatalogResult<()> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(CatalogError::Unauthorized("token expired".into())) }
            })
            .await;

        assert!(matches!(result, Err(CatalogError::Unauthorized(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
