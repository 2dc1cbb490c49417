//! Tenants file: a list of connection configs plus the models to register
//!
//! ```toml
//! [[tenants]]
//! database = "tenant_a"
//! storage = "/var/lib/app/tenant_a.db"
//! auto_load_models = true
//!
//! [[models]]
//! connection = "default"
//! name = "User"
//! columns = [{ name = "id", type = "integer", primary_key = true }]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ConnectionConfig, ModelDefinition, Result, TenantDbError};
use crate::{DEFAULT_CONNECTION_NAME, InMemoryModelRegistry};

/// A model bound to a connection name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    #[serde(default = "default_connection")]
    pub connection: String,

    #[serde(flatten)]
    pub model: ModelDefinition,
}

fn default_connection() -> String {
    DEFAULT_CONNECTION_NAME.to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantsFile {
    #[serde(default)]
    pub tenants: Vec<ConnectionConfig>,

    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

impl TenantsFile {
    /// Load from a `.toml` or `.json` file
    pub async fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading tenants file");
        let content = tokio::fs::read_to_string(path).await?;

        let file = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&content)?,
            Some("json") => Self::from_json(&content)?,
            other => {
                return Err(TenantDbError::Configuration(format!(
                    "Unsupported tenants file extension: {:?}",
                    other
                )));
            }
        };

        tracing::info!(
            path = %path.display(),
            tenants = file.tenants.len(),
            models = file.models.len(),
            "tenants file loaded"
        );
        Ok(file)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Register every model entry into `registry`
    pub fn register_models(&self, registry: &InMemoryModelRegistry) {
        for entry in &self.models {
            registry.register(&entry.connection, entry.model.clone());
        }
    }
}
