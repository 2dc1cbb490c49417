//! Keyed store of initialized connections

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tenantdb_core::{Connection, ConnectionKey};

/// Flags a cached connection was initialized with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitFlags {
    pub auto_load_models: bool,
    pub synchronize: bool,
}

/// A live connection handle plus what we know about how it was built
#[derive(Clone)]
pub struct CachedConnection {
    pub connection: Arc<dyn Connection>,
    pub init: InitFlags,
    pub established_at: Instant,
}

impl CachedConnection {
    pub fn new(connection: Arc<dyn Connection>, init: InitFlags) -> Self {
        Self {
            connection,
            init,
            established_at: Instant::now(),
        }
    }
}

impl std::fmt::Debug for CachedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedConnection")
            .field("driver", &self.connection.driver_name())
            .field("init", &self.init)
            .field("established_at", &self.established_at)
            .finish()
    }
}

/// Map from connection key to cached connection.
///
/// Each call is atomic on its own. Closing is never done here: callers close
/// a replaced or removed entry themselves.
#[derive(Default)]
pub struct ConnectionCache {
    entries: RwLock<HashMap<ConnectionKey, CachedConnection>>,
}

impl ConnectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ConnectionKey) -> Option<CachedConnection> {
        let entry = self.entries.read().get(key).cloned();
        if entry.is_none() {
            tracing::trace!(key = %key, "cache miss");
        }
        entry
    }

    /// Store `entry` under `key`, returning whatever it replaced
    pub fn put(&self, key: ConnectionKey, entry: CachedConnection) -> Option<CachedConnection> {
        self.entries.write().insert(key, entry)
    }

    /// Remove the entry for `key` without closing it
    pub fn remove(&self, key: &ConnectionKey) -> Option<CachedConnection> {
        self.entries.write().remove(key)
    }

    pub fn contains(&self, key: &ConnectionKey) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Cached keys, sorted
    pub fn keys(&self) -> Vec<ConnectionKey> {
        let mut keys: Vec<ConnectionKey> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Remove and return every entry
    pub fn drain(&self) -> Vec<(ConnectionKey, CachedConnection)> {
        self.entries.write().drain().collect()
    }
}
