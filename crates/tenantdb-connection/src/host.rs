//! Host-facing registration of tenant connections
//!
//! A [`TenantConnectionModule`] is one registration: it resolves its config
//! (directly, or through an async factory), obtains the connection from the
//! shared [`ConnectionLifecycleManager`], and closes it again on shutdown.
//!
//! # Example
//!
//! ```ignore
//! use tenantdb_connection::{AsyncModuleOptions, TenantConnectionModule};
//!
//! let module = TenantConnectionModule::for_root_async(
//!     manager.clone(),
//!     AsyncModuleOptions::use_factory(|| async { load_config().await }).with_name("billing"),
//! )
//! .await?;
//! let conn = module.connection();
//! // ...
//! module.shutdown().await;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tenantdb_core::{
    Connection, ConnectionConfig, ConnectionKey, ConnectionKeyResolver, InMemoryModelRegistry,
    ModelDefinition, Result, DEFAULT_CONNECTION_NAME,
};
use uuid::Uuid;

use crate::ConnectionLifecycleManager;


/// Produces connection configs on demand
#[async_trait]
pub trait ConnectionConfigFactory: Send + Sync {
    /// Build the config for the named connection (`None` = default connection)
    async fn create_connection_config(&self, connection_name: Option<&str>)
    -> Result<ConnectionConfig>;
}

type ConfigFactoryFn = Box<dyn Fn() -> BoxFuture<'static, Result<ConnectionConfig>> + Send + Sync>;

/// Where an async registration gets its config from
pub enum ConfigSource {
    /// A factory closure
    UseFactory(ConfigFactoryFn),
    /// A factory owned by this registration
    UseClass(Box<dyn ConnectionConfigFactory>),
    /// A factory instance shared with the rest of the host
    UseExisting(Arc<dyn ConnectionConfigFactory>),
}

/// Options for [`TenantConnectionModule::for_root_async`]
pub struct AsyncModuleOptions {
    /// Overrides the `name` of the produced config when set
    pub name: Option<String>,
    pub source: ConfigSource,
}

impl AsyncModuleOptions {
    pub fn use_factory<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ConnectionConfig>> + Send + 'static,
    {
        Self {
            name: None,
            source: ConfigSource::UseFactory(Box::new(
                move || -> BoxFuture<'static, Result<ConnectionConfig>> { Box::pin(factory()) },
            )),
        }
    }

    /// Instantiate `T` for this registration only
    pub fn use_class<T>() -> Self
    where
        T: ConnectionConfigFactory + Default + 'static,
    {
        Self {
            name: None,
            source: ConfigSource::UseClass(Box::new(T::default())),
        }
    }

    pub fn use_existing(factory: Arc<dyn ConnectionConfigFactory>) -> Self {
        Self {
            name: None,
            source: ConfigSource::UseExisting(factory),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    async fn resolve(&self) -> Result<ConnectionConfig> {
        let name = self.name.as_deref();
        let config = match &self.source {
            ConfigSource::UseFactory(factory) => factory().await?,
            ConfigSource::UseClass(factory) => factory.create_connection_config(name).await?,
            ConfigSource::UseExisting(factory) => factory.create_connection_config(name).await?,
        };

        Ok(match name {
            Some(name) => config.with_name(name),
            None => config,
        })
    }
}

/// Shutdown hook the host calls when the process is going away
#[async_trait]
pub trait LifecycleHost: Send + Sync {
    async fn on_shutdown(&self);
}

/// One registered tenant connection
pub struct TenantConnectionModule {
    id: Uuid,
    manager: Arc<ConnectionLifecycleManager>,
    config: ConnectionConfig,
    key: ConnectionKey,
    token: String,
    connection: Arc<dyn Connection>,
}

impl TenantConnectionModule {
    /// Register with a static config
    pub async fn for_root(
        manager: Arc<ConnectionLifecycleManager>,
        config: ConnectionConfig,
    ) -> Result<Self> {
        let key = ConnectionKeyResolver::resolve(&config);
        let token = ConnectionKeyResolver::token_for_key(&key);
        let id = Uuid::new_v4();
        tracing::debug!(module_id = %id, key = %key, token = %token, "registering tenant connection");

        let connection = manager.obtain(&config).await?;

        Ok(Self {
            id,
            manager,
            config,
            key,
            token,
            connection,
        })
    }

    /// Register with a config produced asynchronously
    pub async fn for_root_async(
        manager: Arc<ConnectionLifecycleManager>,
        options: AsyncModuleOptions,
    ) -> Result<Self> {
        let config = options.resolve().await?;
        Self::for_root(manager, config).await
    }

    /// Register models for a connection name (`None` = default connection)
    pub fn for_feature(
        registry: &InMemoryModelRegistry,
        models: impl IntoIterator<Item = ModelDefinition>,
        connection_name: Option<&str>,
    ) {
        registry.register_all(connection_name.unwrap_or(DEFAULT_CONNECTION_NAME), models);
    }

    pub fn connection(&self) -> Arc<dyn Connection> {
        self.connection.clone()
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn module_id(&self) -> Uuid {
        self.id
    }

    /// Close the connection cached under this module's key.
    ///
    /// The entry stays in the shared cache; nothing happens when there is none.
    pub async fn shutdown(&self) {
        tracing::info!(module_id = %self.id, key = %self.key, "shutting down tenant connection");
        self.manager.close_cached(&self.key).await;
    }
}

#[async_trait]
impl LifecycleHost for TenantConnectionModule {
    async fn on_shutdown(&self) {
        self.shutdown().await
    }
}

impl std::fmt::Debug for TenantConnectionModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantConnectionModule")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("token", &self.token)
            .finish()
    }
}
