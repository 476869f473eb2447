//! Retry policy for transient transport failures.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use super::ApiError;

/// Waits between attempts. Injected so tests can record delays instead of sleeping.
#[async_trait]
pub trait Sleeper: Send + Sync + fmt::Debug {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How often and how patiently a request is retried.
///
/// `max_retries` counts attempts after the first one. Retry `n` (zero-based)
/// waits `base_delay * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, base_delay: Duration::from_secs(1) }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self { max_retries: 0, base_delay: Duration::ZERO }
    }

    /// Delay before retry number `retry` (zero-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// retry budget is spent. The last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, sleeper: &dyn Sleeper, what: &str, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut retry = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && retry < self.max_retries => {
                    let delay = self.delay_for(retry);
                    retry += 1;
                    tracing::warn!(
                        request = what,
                        retry,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    sleeper.sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::testing::RecordingSleeper;
    use super::*;

    fn server_error() -> ApiError {
        ApiError::Http { status: 503, message: "unavailable".into() }
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_saturates() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert!(policy.delay_for(64) >= policy.delay_for(31));
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let sleeper = RecordingSleeper::default();
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_secs(1));

        let result = policy
            .run(&sleeper, "GET content", || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 { Err(server_error()) } else { Ok(42) }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.delays(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn test_returns_last_error_after_budget() {
        let sleeper = RecordingSleeper::default();
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_secs(1));

        let result: Result<(), _> = policy
            .run(&sleeper, "GET content", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::Timeout)
            })
            .await;

        assert!(matches!(result, Err(ApiError::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(sleeper.delays(), vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)]);
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let sleeper = RecordingSleeper::default();
        let calls = &AtomicU32::new(0);

        let result: Result<(), _> = RetryPolicy::default()
            .run(&sleeper, "GET content/9", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::Http { status: 404, message: "not found".into() })
            })
            .await;

        assert_eq!(result.unwrap_err().status(), Some(404));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn test_none_policy_single_attempt() {
        let sleeper = RecordingSleeper::default();
        let calls = &AtomicU32::new(0);

        let result: Result<(), _> = RetryPolicy::none()
            .run(&sleeper, "POST plugins/update", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(server_error())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
