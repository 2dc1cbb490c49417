//! Error types for tenantdb

use thiserror::Error;

/// Core error type for tenantdb operations
#[derive(Error, Debug)]
pub enum TenantDbError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Sync error: {0}")]
    Sync(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for tenantdb operations
pub type Result<T> = std::result::Result<T, TenantDbError>;
