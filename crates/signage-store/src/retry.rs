use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{Result, StoreError};

/// Bounded exponential backoff applied to rate-limit errors only.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(1200),
        }
    }
}

impl RetryPolicy {
    /// Policy with no sleeping between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
        }
    }

    /// Delay after the given failed attempt (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }

    /// Run `call` until it succeeds, fails with a non-rate-limit error, or the
    /// attempt budget is spent. The last error is returned on exhaustion.
    pub async fn run<T, F, Fut>(&self, op: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_rate_limited() && attempt < max => {
                    let delay = self.backoff(attempt);
                    warn!(
                        "{} rate limited (attempt {}/{}), retrying in {:?}",
                        op, attempt, max, delay
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
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

    /// Fails with the given errors in order, then succeeds with the call count.
    async fn scripted(calls: &AtomicU32, script: &[fn() -> StoreError]) -> Result<u32> {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        match script.get(n as usize) {
            Some(make) => Err(make()),
            None => Ok(n + 1),
        }
    }

    fn quota() -> StoreError {
        StoreError::RateLimited {
            status: 429,
            message: "Quota exceeded".into(),
        }
    }

    fn permanent() -> StoreError {
        StoreError::Remote {
            status: 400,
            message: "bad range".into(),
        }
    }

    #[tokio::test]
    async fn succeeds_when_failures_below_budget() {
        let policy = RetryPolicy::immediate(4);
        for failures in 0..4usize {
            let calls = AtomicU32::new(0);
            let script = vec![quota as fn() -> StoreError; failures];
            let out = policy.run("read", || scripted(&calls, &script)).await;
            assert_eq!(out.unwrap(), failures as u32 + 1);
        }
    }

    #[tokio::test]
    async fn exhausting_budget_propagates_last_error() {
        let policy = RetryPolicy::immediate(3);
        let calls = AtomicU32::new(0);
        let script = [quota as fn() -> StoreError; 3];
        let err = policy
            .run("read", || scripted(&calls, &script))
            .await
            .unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_error_is_never_retried() {
        let policy = RetryPolicy::immediate(4);

        let calls = AtomicU32::new(0);
        let first: [fn() -> StoreError; 1] = [permanent];
        assert!(policy.run("update", || scripted(&calls, &first)).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // A permanent error after a retried quota error stops immediately too.
        let calls = AtomicU32::new(0);
        let mixed: [fn() -> StoreError; 3] = [quota, permanent, quota];
        let err = policy
            .run("update", || scripted(&calls, &mixed))
            .await
            .unwrap_err();
        assert!(!err.is_rate_limited());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy {
            max_attempts: 4,
            initial_backoff: Duration::from_secs(1),
        };
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
    }
}
