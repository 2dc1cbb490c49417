//! Bounded retry for connection establishment
//!
//! The lifecycle manager wraps the whole connect, model load and sync
//! sequence in one [`RetryPolicy`] run, so a failed sync after a successful
//! connect retries everything, reconnect included.
//!
//! # Example
//!
//! ```ignore
//! use tenantdb_connection::retry::{BackoffStrategy, RetryPolicy};
//!
//! let policy = RetryPolicy::new(2, BackoffStrategy::fixed(10));
//! let conn = policy.run(|_attempt| async { driver.connect(&config).await }).await?;
//! ```

mod backoff;
mod policy;


pub use backoff::BackoffStrategy;
pub use policy::RetryPolicy;
