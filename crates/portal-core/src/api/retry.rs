//! Exponential-backoff retry for idempotent reads.
//!
//! Only errors whose message matches one of the policy's retryable
//! substrings are retried; everything else (validation, auth, not found)
//! surfaces after the first attempt. Mutations never go through here.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Attempts made before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubles on each subsequent one.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Message fragments that mark an error as transient.
pub const DEFAULT_RETRYABLE: [&str; 4] = ["network", "timeout", "failed to fetch", "rate limited"];

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub retryable: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            retryable: DEFAULT_RETRYABLE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Case-insensitive substring match against the error's message.
    pub fn is_retryable(&self, error: &impl Display) -> bool {
        let message = error.to_string().to_lowercase();
        self.retryable
            .iter()
            .any(|fragment| message.contains(&fragment.to_lowercase()))
    }

    /// Wait after failed attempt number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up. The last error is returned.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt + 1 >= max_attempts || !policy.is_retryable(&e) {
                    return Err(e);
                }
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after transient error"
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
    use crate::api::ApiError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt() {
        let attempts = &AtomicU32::new(0);
        let started = Instant::now();

        let result = retry(&RetryPolicy::default(), || async move {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(ApiError::Network("connection refused".to_string()))
            } else {
                Ok("members")
            }
        })
        .await;

        assert_eq!(result, Ok("members"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // 1s + 2s of backoff
        assert!(started.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_fails_after_one_attempt() {
        let attempts = &AtomicU32::new(0);

        let result: Result<(), ApiError> = retry(&RetryPolicy::default(), || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::from_status(400, r#"{"error":"Email is required"}"#))
        })
        .await;

        assert_eq!(result.unwrap_err().to_string(), "Email is required");
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_return_last_error() {
        let attempts = &AtomicU32::new(0);

        let result: Result<(), ApiError> = retry(&RetryPolicy::default(), || async move {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::Timeout(format!("attempt {}", n)))
        })
        .await;

        assert_eq!(result, Err(ApiError::Timeout("attempt 2".to_string())));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_is_retryable_by_default() {
        let attempts = &AtomicU32::new(0);

        let result = retry(&RetryPolicy::default(), || async move {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ApiError::RateLimited)
            } else {
                Ok(1)
            }
        })
        .await;

        assert_eq!(result, Ok(1));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(100),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable(&"TypeError: Failed to fetch"));
        assert!(policy.is_retryable(&ApiError::Network("reset".into())));
        assert!(!policy.is_retryable(&ApiError::NotFound("member".into())));
        assert!(!policy.is_retryable(&ApiError::Unauthorized("expired".into())));
    }
}
