//! Connection trait

use async_trait::async_trait;

use crate::{ModelDefinition, Result, SyncOptions};

/// A live database connection.
///
/// Connections are shared as `Arc<dyn Connection>`; every method takes
/// `&self` and implementations use interior mutability.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "sqlite", "postgres")
    fn driver_name(&self) -> &str;

    /// Round-trip check that the server accepts this connection.
    ///
    /// Used both as the liveness probe for cached connections and as the
    /// mandatory check after models are attached.
    async fn authenticate(&self) -> Result<()>;

    /// Attach model definitions to the connection
    fn add_models(&self, models: Vec<ModelDefinition>) -> Result<()>;

    /// Models currently attached, in attach order
    fn models(&self) -> Vec<ModelDefinition>;

    /// Reconcile the live schema with the attached models
    async fn sync(&self, options: &SyncOptions) -> Result<()>;

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}

impl std::fmt::Debug for dyn Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("driver", &self.driver_name())
            .field("closed", &self.is_closed())
            .finish()
    }
}
