//! Reusable exponential-backoff policy (§9: "express as a small reusable policy value
//! rather than scattered sleeps"). Used both for admin-call backoff (§4.5) and for
//! reclassifying transient probes within a cycle (§4.2).

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// Exponential backoff: `initial * factor^attempt`, capped at `max`, for up to
/// `max_retries` retries (so `max_retries + 1` total attempts).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub factor: u32,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff_ms: 1_000,
            factor: 2,
            max_backoff_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff_ms: u64, factor: u32, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            factor,
            max_backoff_ms,
        }
    }

    /// Duration to wait before the attempt numbered `attempt` (0-indexed).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(u64::from(self.factor).saturating_pow(attempt))
            .min(self.max_backoff_ms);
        Duration::from_millis(backoff_ms)
    }

    /// Runs `operation` until it succeeds, `should_retry` says stop, or retries are
    /// exhausted. Sleeps between attempts using `backoff_for`.
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F, should_retry: impl Fn(&E) -> bool) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= self.max_retries || !should_retry(&err) {
                        return Err(err);
                    }
                    sleep(self.backoff_for(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}
