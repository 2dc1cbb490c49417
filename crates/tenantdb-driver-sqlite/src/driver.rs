//! SQLite driver implementation

use async_trait::async_trait;
use std::sync::Arc;
use tenantdb_core::{Connection, ConnectionConfig, DatabaseDriver, Result, TenantDbError};

use crate::SqliteConnection;

const MEMORY: &str = ":memory:";

/// SQLite database driver
pub struct SqliteDriver;

impl SqliteDriver {
    /// Create a new SQLite driver instance
    pub fn new() -> Self {
        tracing::debug!("SQLite driver initialized");
        Self
    }

    /// Database path for a structured config (`storage`, else in-memory)
    pub fn storage_path(config: &ConnectionConfig) -> String {
        config
            .options()
            .and_then(|options| options.storage.clone())
            .unwrap_or_else(|| MEMORY.to_string())
    }

    /// Database path for `sqlite::memory:` or `sqlite://<path>`
    pub fn uri_path(uri: &str) -> Result<String> {
        if uri == "sqlite::memory:" {
            return Ok(MEMORY.to_string());
        }
        match uri.strip_prefix("sqlite://") {
            Some(path) if !path.is_empty() => Ok(path.to_string()),
            _ => Err(TenantDbError::Configuration(format!(
                "Unsupported SQLite URI '{}'. Expected 'sqlite::memory:' or 'sqlite://<path>'",
                uri
            ))),
        }
    }

    fn open(path: &str) -> Result<Arc<dyn Connection>> {
        let conn = SqliteConnection::open(path).map_err(|e| {
            tracing::error!(error = %e, "failed to connect to SQLite database");
            e
        })?;
        tracing::info!(path = %conn.path(), "SQLite connection created");
        Ok(Arc::new(conn))
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    #[tracing::instrument(skip(self, config))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        Self::open(&Self::storage_path(config))
    }

    #[tracing::instrument(skip(self, uri, _config))]
    async fn connect_uri(
        &self,
        uri: &str,
        _config: &ConnectionConfig,
    ) -> Result<Arc<dyn Connection>> {
        let path = Self::uri_path(uri)?;
        Self::open(&path)
    }
}
