use crate::config::RetryConfig;
use crate::errors::EngineResult;
use crate::feeds::snapshot::MarketSnapshot;
use crate::feeds::SnapshotProvider;
use std::future::Future;
use std::time::Duration;

/// Exponential backoff for provider calls. Only transient failures
/// (`Unavailable`, I/O) are retried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_backoff: config.base_backoff,
            max_backoff: config.max_backoff,
        }
    }

    /// Delay after the `attempt`-th failure (1-based): base * 2^(attempt-1),
    /// capped at `max_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.base_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }

    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> EngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let backoff = self.backoff_for(attempt);
                    tracing::warn!(
                        op = label,
                        error = %e,
                        attempt = attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "provider call failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Wraps a provider with a retry policy.
pub struct RetryingProvider<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: SnapshotProvider> RetryingProvider<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<P: SnapshotProvider> SnapshotProvider for RetryingProvider<P> {
    async fn fetch(&self, ticker: &str) -> EngineResult<MarketSnapshot> {
        self.policy.run(ticker, || self.inner.fetch(ticker)).await
    }
}
