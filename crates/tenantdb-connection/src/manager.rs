//! Connection lifecycle manager
//!
//! Decides for each request whether the cached connection for a tenant can
//! be reused, rebuilds it when its liveness probe fails, and initializes
//! fresh connections (models, authenticate, sync) before caching them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tenantdb_core::{
    Connection, ConnectionConfig, ConnectionKey, ConnectionKeyResolver, DriverRegistry,
    ModelRegistry, Result,
};

use crate::cache::{CachedConnection, ConnectionCache, InitFlags};
use crate::health::probe_liveness;
use crate::retry::RetryPolicy;


/// Owns the connection cache for a process
pub struct ConnectionLifecycleManager {
    drivers: Arc<DriverRegistry>,
    models: Arc<dyn ModelRegistry>,
    cache: ConnectionCache,
    /// One async lock per key so a key is only ever built by one caller
    key_locks: Mutex<HashMap<ConnectionKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl ConnectionLifecycleManager {
    pub fn new(drivers: Arc<DriverRegistry>, models: Arc<dyn ModelRegistry>) -> Self {
        Self {
            drivers,
            models,
            cache: ConnectionCache::new(),
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn drivers(&self) -> &Arc<DriverRegistry> {
        &self.drivers
    }

    pub fn models(&self) -> &Arc<dyn ModelRegistry> {
        &self.models
    }

    pub fn cache(&self) -> &ConnectionCache {
        &self.cache
    }

    pub fn cached_keys(&self) -> Vec<ConnectionKey> {
        self.cache.keys()
    }

    pub fn is_cached(&self, key: &ConnectionKey) -> bool {
        self.cache.contains(key)
    }

    /// Get a usable connection for `config`.
    ///
    /// Reuses the cached connection for the config's key when it passes the
    /// liveness probe, otherwise builds a new one. The whole sequence runs
    /// under the config's retry policy and the key's lock.
    ///
    /// A reused connection keeps the initialization it was cached with, even
    /// when `config` asks for different model loading or sync flags.
    #[tracing::instrument(skip_all, fields(key = tracing::field::Empty, dialect = %config.dialect))]
    pub async fn obtain(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let key = ConnectionKeyResolver::resolve(config);
        tracing::Span::current().record("key", key.as_str());

        let result = {
            let lock = self.key_lock(&key);
            let _guard = lock.lock().await;
            RetryPolicy::from_config(config)
                .run(|attempt| self.establish(config, &key, attempt))
                .await
        };
        if result.is_err() {
            self.prune_key_locks();
        }
        result
    }

    /// One pass of the obtain sequence
    async fn establish(
        &self,
        config: &ConnectionConfig,
        key: &ConnectionKey,
        attempt: u32,
    ) -> Result<Arc<dyn Connection>> {
        tracing::debug!(attempt, "establishing connection");

        if let Some(existing) = self.cache.get(key) {
            match probe_liveness(existing.connection.as_ref()).await {
                Ok(latency) => {
                    tracing::debug!(latency_ms = latency.as_millis() as u64, "reusing cached connection");
                    let requested = requested_flags(config);
                    if existing.init != requested {
                        tracing::warn!(
                            cached_auto_load_models = existing.init.auto_load_models,
                            cached_synchronize = existing.init.synchronize,
                            requested_auto_load_models = requested.auto_load_models,
                            requested_synchronize = requested.synchronize,
                            "reused connection was initialized with different flags; keeping its original initialization"
                        );
                    }
                    return Ok(existing.connection);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "cached connection is stale, rebuilding");
                    self.cache.remove(key);
                    close_quietly(key, existing.connection.as_ref()).await;
                }
            }
        }

        let connection = self.drivers.connect(config).await?;

        if !config.auto_load_models {
            tracing::debug!("returning connection without model loading; not cached");
            return Ok(connection);
        }

        if let Err(err) = self.initialize(config, connection.as_ref()).await {
            close_quietly(key, connection.as_ref()).await;
            return Err(err);
        }

        let entry = CachedConnection::new(connection.clone(), requested_flags(config));
        if let Some(previous) = self.cache.put(key.clone(), entry)
            && !Arc::ptr_eq(&previous.connection, &connection)
        {
            close_quietly(key, previous.connection.as_ref()).await;
        }

        tracing::info!(driver = %connection.driver_name(), "connection initialized and cached");
        Ok(connection)
    }

    /// Attach models, authenticate and optionally sync
    async fn initialize(&self, config: &ConnectionConfig, connection: &dyn Connection) -> Result<()> {
        let connection_name = ConnectionKeyResolver::connection_name(config);
        let models = self.models.models_for(connection_name);
        tracing::debug!(
            connection_name,
            models = models.len(),
            "attaching models"
        );
        connection.add_models(models)?;

        connection.authenticate().await?;

        if config.synchronize {
            tracing::debug!(force = config.sync.force, alter = config.sync.alter, "synchronizing schema");
            connection.sync(&config.sync).await?;
        }
        Ok(())
    }

    /// Close the connection cached under `key` but leave the entry in place.
    ///
    /// Used on host shutdown. A missing entry or a close failure is not an
    /// error.
    #[tracing::instrument(skip(self), fields(key = %key))]
    pub async fn close_cached(&self, key: &ConnectionKey) {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        match self.cache.get(key) {
            Some(entry) => {
                close_quietly(key, entry.connection.as_ref()).await;
                tracing::info!("cached connection closed");
            }
            None => tracing::debug!("no cached connection to close"),
        }
    }

    /// Remove the entry for `key` and close it. Returns whether there was one.
    #[tracing::instrument(skip(self), fields(key = %key))]
    pub async fn evict(&self, key: &ConnectionKey) -> bool {
        let removed = {
            let lock = self.key_lock(key);
            let _guard = lock.lock().await;
            match self.cache.remove(key) {
                Some(entry) => {
                    close_quietly(key, entry.connection.as_ref()).await;
                    true
                }
                None => false,
            }
        };
        self.prune_key_locks();
        removed
    }

    /// Remove and close every cached connection
    #[tracing::instrument(skip(self))]
    pub async fn close_all(&self) {
        let entries = self.cache.drain();
        let count = entries.len();
        for (key, entry) in entries {
            close_quietly(&key, entry.connection.as_ref()).await;
        }
        self.prune_key_locks();
        tracing::info!(count, "all cached connections closed");
    }

    fn key_lock(&self, key: &ConnectionKey) -> Arc<tokio::sync::Mutex<()>> {
        self.key_locks
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drop key locks nobody holds or waits on.
    ///
    /// Locks are only cloned under the map lock, so a count of one means the
    /// map holds the last reference.
    fn prune_key_locks(&self) {
        self.key_locks.lock().retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

fn requested_flags(config: &ConnectionConfig) -> InitFlags {
    InitFlags {
        auto_load_models: config.auto_load_models,
        synchronize: config.synchronize,
    }
}

/// Best-effort close; failures are logged and dropped
async fn close_quietly(key: &ConnectionKey, connection: &dyn Connection) {
    if let Err(err) = connection.close().await {
        tracing::warn!(key = %key, error = %err, "failed to close connection");
    }
}
