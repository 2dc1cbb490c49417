//! tenantdb Connection - Tenant connection lifecycle
//!
//! This crate decides when a tenant's connection is built, reused, rebuilt
//! and closed. Connections are cached per tenant key, probed before reuse,
//! and initialized (models, authenticate, sync) under a retry policy.

mod cache;
pub mod health;
mod host;
mod manager;
pub mod retry;

#[cfg(test)]
mod mock;

pub use cache::{CachedConnection, ConnectionCache, InitFlags};
pub use health::{ProbeError, ProbeResult, probe_liveness};
pub use host::{
    AsyncModuleOptions, ConfigSource, ConnectionConfigFactory, LifecycleHost,
    TenantConnectionModule,
};
pub use manager::ConnectionLifecycleManager;
pub use retry::{BackoffStrategy, RetryPolicy};
