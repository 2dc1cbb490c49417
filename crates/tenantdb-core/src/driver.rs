//! Database driver trait and registry

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{Connection, ConnectionConfig, Result, TenantDbError};

/// Constructs connections for one dialect
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Dialect name this driver is registered under (e.g., "sqlite")
    fn name(&self) -> &'static str;

    /// Open a connection from structured options
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>>;

    /// Open a connection from a URI; `config` still carries the non-target settings
    async fn connect_uri(&self, uri: &str, config: &ConnectionConfig)
    -> Result<Arc<dyn Connection>>;
}

/// Registry of available database drivers
#[derive(Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn DatabaseDriver>>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new driver, replacing any driver with the same name
    pub fn register(&mut self, driver: Arc<dyn DatabaseDriver>) {
        let name = driver.name().to_string();
        tracing::info!(driver = %name, "registering database driver");
        self.drivers.insert(name, driver);
    }

    pub fn with_driver(mut self, driver: Arc<dyn DatabaseDriver>) -> Self {
        self.register(driver);
        self
    }

    /// Get a driver by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn DatabaseDriver>> {
        let driver = self.drivers.get(name).cloned();
        if driver.is_none() {
            tracing::warn!(driver = %name, "driver not found in registry");
        }
        driver
    }

    /// Open a connection for `config` with the driver for its dialect,
    /// using the URI constructor when the config has a URI.
    pub async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let driver = self.get(&config.dialect).ok_or_else(|| {
            TenantDbError::Configuration(format!("Unknown dialect: {}", config.dialect))
        })?;

        match config.uri() {
            Some(uri) => driver.connect_uri(uri, config).await,
            None => driver.connect(config).await,
        }
    }

    /// List all registered driver names
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.drivers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Check if a driver is registered
    pub fn has(&self, name: &str) -> bool {
        self.drivers.contains_key(name)
    }
}
