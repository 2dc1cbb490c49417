//! Bounded retry around an async attempt

use std::future::Future;

use tenantdb_core::{ConnectionConfig, Result};

use super::BackoffStrategy;

/// Default cap when a config asks for exponential backoff without one
const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Retry configuration for one connection-establishment call
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = attempt exactly once)
    max_attempts: u32,
    backoff: BackoffStrategy,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: BackoffStrategy) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Attempt once, never retry
    pub fn none() -> Self {
        Self::new(0, BackoffStrategy::fixed(0))
    }

    /// Policy described by the retry fields of `config`
    pub fn from_config(config: &ConnectionConfig) -> Self {
        let mut backoff = BackoffStrategy::fixed(config.retry_delay_ms);
        if config.retry_backoff_multiplier > 1.0 {
            backoff = backoff
                .with_max_delay_ms(config.retry_max_delay_ms.unwrap_or(DEFAULT_MAX_DELAY_MS))
                .with_multiplier(config.retry_backoff_multiplier);
        }
        Self::new(config.retry_attempts, backoff)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &BackoffStrategy {
        &self.backoff
    }

    /// Run `attempt` until it succeeds or the retry budget is spent.
    ///
    /// The closure receives the 0-based attempt number. The last error is
    /// returned unchanged. Every error kind is retried.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retry = 0u32;

        loop {
            match attempt(retry).await {
                Ok(value) => {
                    if retry > 0 {
                        tracing::info!(attempts_taken = retry + 1, "connection attempt succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    if retry >= self.max_attempts {
                        if self.max_attempts > 0 {
                            tracing::error!(
                                error = %err,
                                total_attempts = retry + 1,
                                "connection retries exhausted"
                            );
                        }
                        return Err(err);
                    }

                    let delay = self.backoff.calculate_delay(retry);
                    retry += 1;
                    tracing::warn!(
                        error = %err,
                        retry,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Unable to connect to the database. Retrying ({})...",
                        retry
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}
