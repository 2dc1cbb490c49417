//! tenantdb Core - Core abstractions for tenant connection management
//!
//! This crate provides the traits and types that the other tenantdb crates
//! depend on:
//!
//! - `Connection` - Trait for live database connections
//! - `DatabaseDriver` / `DriverRegistry` - Connection construction per dialect
//! - `ConnectionConfig` - Resolved configuration for one tenant
//! - `ConnectionKeyResolver` - Cache key and token derivation
//! - `ModelRegistry` - Model definitions per connection name

mod config;
mod connection;
mod driver;
mod error;
mod key;
mod model;
mod tenants;

pub use config::*;
pub use connection::*;
pub use driver::*;
pub use error::*;
pub use key::*;
pub use model::*;
pub use tenants::*;
