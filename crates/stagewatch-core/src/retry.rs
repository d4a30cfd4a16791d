//! Bounded fixed-interval retry.
//!
//! Used for the derived-session grace window: a session spawned from a
//! completed one may briefly read as "not found" while the backend
//! materializes it. This is not a general network-resilience policy.

use crate::error::{Result, SyncError};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

type RetryPredicate = Arc<dyn Fn(&SyncError) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Fixed wait between attempts
    pub interval: Duration,
    retryable: RetryPredicate,
}

impl RetryPolicy {
    pub fn new<F>(max_attempts: u32, interval: Duration, retryable: F) -> Self
    where
        F: Fn(&SyncError) -> bool + Send + Sync + 'static,
    {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
            retryable: Arc::new(retryable),
        }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, |_| false)
    }

    /// Retries only `NotFound`, for sessions still being materialized.
    pub fn derived_session_grace(max_attempts: u32, interval: Duration) -> Self {
        Self::new(max_attempts, interval, SyncError::is_not_found)
    }

    /// Whether a failure on attempt `attempt` (1-based) should be retried.
    pub fn should_retry(&self, attempt: u32, error: &SyncError) -> bool {
        attempt < self.max_attempts && (self.retryable)(error)
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent. The closure receives the 1-based attempt.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if self.should_retry(attempt, &e) => {
                    tracing::debug!(
                        "[RetryPolicy] attempt {}/{} failed: {}; retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        e,
                        self.interval
                    );
                    tokio::time::sleep(self.interval).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retries_not_found_until_success() {
        let policy = RetryPolicy::derived_session_grace(3, Duration::from_secs(2));
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result = policy
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(SyncError::not_found("Session", "s-followup-1"))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_budget() {
        let policy = RetryPolicy::derived_session_grace(3, Duration::from_millis(10));
        let calls = AtomicU32::new(0);

        let result: Result<()> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SyncError::not_found("Session", "x")) }
            })
            .await;

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_returns_immediately() {
        let policy = RetryPolicy::derived_session_grace(3, Duration::from_secs(1));
        let calls = AtomicU32::new(0);

        let result: Result<()> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SyncError::server(503, "busy")) }
            })
            .await;

        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_none_never_retries() {
        let policy = RetryPolicy::none();
        assert!(!policy.should_retry(1, &SyncError::not_found("Session", "x")));
    }
}
