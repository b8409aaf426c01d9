use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::errors::ChainError;

const BASE_BACKOFF_MS: u64 = 1000;

/// Errors that can mark themselves as rate-limit-shaped. Only those are
/// worth retrying; everything else propagates immediately.
pub trait RateLimitSignal {
    fn is_rate_limited(&self) -> bool;
}

impl RateLimitSignal for ChainError {
    fn is_rate_limited(&self) -> bool {
        ChainError::is_rate_limited(self)
    }
}

/// Bounded exponential backoff for rate-limited chain reads.
///
/// Attempt `i` (zero-based) that fails with a rate-limit signal sleeps
/// `2^i * 1000ms` before the next try, up to `max_attempts` total attempts.
/// No jitter, no shared retry budget; this is the only resilience mechanism
/// in the core.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RateLimitSignal + std::fmt::Display,
    {
        let mut last_error = None;
        for attempt in 0..self.max_attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_rate_limited() => {
                    if attempt + 1 == self.max_attempts {
                        return Err(error);
                    }
                    let delay = Duration::from_millis(BASE_BACKOFF_MS << attempt);
                    warn!(
                        "Rate limited ({}), retrying in {}ms",
                        error,
                        delay.as_millis()
                    );
                    last_error = Some(error);
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
        // max_attempts >= 1, so the loop always returned unless every
        // attempt was rate limited.
        Err(last_error.expect("retry loop ran at least once"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn rate_limited() -> ChainError {
        ChainError::classify("HTTP error 429: too many requests")
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_two_rate_limits() {
        let attempts = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result = RetryPolicy::new(3)
            .run(|| {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(rate_limited())
                    } else {
                        Ok(42u64)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(42));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // Exactly two delays: 1000ms then 2000ms
        assert_eq!(started.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_rate_limit_error_propagates_immediately() {
        let attempts = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<u64, ChainError> = RetryPolicy::new(3)
            .run(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(ChainError::Call("execution reverted".to_string())) }
            })
            .await;

        assert!(matches!(result, Err(ChainError::Call(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_rate_limit_error() {
        let attempts = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<u64, ChainError> = RetryPolicy::new(3)
            .run(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(rate_limited()) }
            })
            .await;

        assert!(matches!(result, Err(ChainError::RateLimited(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_does_not_sleep() {
        let started = tokio::time::Instant::now();
        let result: Result<&str, ChainError> =
            RetryPolicy::default().run(|| async { Ok("ok") }).await;
        assert_eq!(result, Ok("ok"));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
