//! Delay calculation between connection attempts
//!
//! The default strategy waits the same delay before every retry. A
//! multiplier above 1.0 turns it into exponential backoff capped at a
//! maximum, with optional jitter to keep many tenants from retrying in lockstep.

use std::time::Duration;

/// Backoff strategy for connection retries.
///
/// # Example
///
/// ```
/// use tenantdb_connection::retry::BackoffStrategy;
/// use std::time::Duration;
///
/// let fixed = BackoffStrategy::fixed(3000);
/// assert_eq!(fixed.calculate_delay(0), Duration::from_millis(3000));
/// assert_eq!(fixed.calculate_delay(5), Duration::from_millis(3000));
///
/// let exponential = BackoffStrategy::exponential(100, 30_000);
/// assert_eq!(exponential.calculate_delay(1), Duration::from_millis(200));
/// assert!(exponential.calculate_delay(20) <= Duration::from_millis(30_000));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffStrategy {
    /// Delay in milliseconds before the first retry
    initial_ms: u64,
    /// Cap for exponential growth
    max_ms: u64,
    /// 1.0 = fixed delay
    multiplier: f64,
    jitter: bool,
}

impl BackoffStrategy {
    /// Same delay before every retry
    pub fn fixed(delay_ms: u64) -> Self {
        Self {
            initial_ms: delay_ms,
            max_ms: delay_ms,
            multiplier: 1.0,
            jitter: false,
        }
    }

    /// Delay doubling from `initial_ms` up to `max_ms`
    pub fn exponential(initial_ms: u64, max_ms: u64) -> Self {
        Self {
            initial_ms,
            max_ms: max_ms.max(initial_ms),
            multiplier: 2.0,
            jitter: false,
        }
    }

    /// Set the growth multiplier; values below 1.0 are clamped to 1.0.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// Cap for the delay; never below the initial delay.
    pub fn with_max_delay_ms(mut self, max_ms: u64) -> Self {
        self.max_ms = max_ms.max(self.initial_ms);
        self
    }

    /// Add up to ±25% random jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `retry` (0 = first retry)
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        let delay_ms = (self.initial_ms as f64) * self.multiplier.powi(retry as i32);
        let capped_ms = delay_ms.min(self.max_ms as f64) as u64;

        let final_ms = if self.jitter {
            let jitter_range = capped_ms / 4;
            let offset = (rand::random::<f64>() * (jitter_range * 2) as f64) as u64;
            capped_ms
                .saturating_sub(jitter_range)
                .saturating_add(offset)
        } else {
            capped_ms
        };

        Duration::from_millis(final_ms)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn has_jitter(&self) -> bool {
        self.jitter
    }
}

impl Default for BackoffStrategy {
    /// Fixed 3 second delay
    fn default() -> Self {
        Self::fixed(tenantdb_core::DEFAULT_RETRY_DELAY_MS)
    }
}
