// Retry policy with exponential backoff.
// Shared by the API client and any other fetcher that needs bounded retries.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Bounded retry with `base_delay * 2^attempt` backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self::new(0)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retrying after the failed zero-based `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = 1u32 << attempt.min(16);
        self.base_delay
            .saturating_mul(multiplier)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is spent. The last error is returned.
    pub async fn run<T, E, F, Fut, P>(&self, mut op: F, is_retryable: P) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_retries && is_retryable(&err) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn test_default_schedule_doubles_from_one_second() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::default().with_max_delay(Duration::from_secs(3));
        assert_eq!(policy.delay_for(5), Duration::from_secs(3));
        assert_eq!(policy.delay_for(40), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_budget_spent() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(2);
        let started = Instant::now();

        let result: Result<(), String> = policy
            .run(
                |_| {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err("connection refused".to_string())
                    }
                },
                |_| true,
            )
            .await;

        assert_eq!(result, Err("connection refused".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_fails_fast() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3);

        let result: Result<(), String> = policy
            .run(
                |_| {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err("HTTP 500".to_string())
                    }
                },
                |err| !err.starts_with("HTTP"),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failure() {
        let policy = RetryPolicy::new(3);

        let result: Result<u32, String> = policy
            .run(
                |attempt| async move {
                    if attempt < 1 {
                        Err("timeout".to_string())
                    } else {
                        Ok(attempt)
                    }
                },
                |_| true,
            )
            .await;

        assert_eq!(result, Ok(1));
    }
}
