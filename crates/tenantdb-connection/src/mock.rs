//! Mock driver and connection shared by the unit tests

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tenantdb_core::{
    Connection, ConnectionConfig, DatabaseDriver, DriverRegistry, ModelDefinition, Result,
    SyncOptions, TenantDbError,
};

/// Failure budget shared by every connection a driver hands out
#[derive(Default)]
pub struct FailureBudget(AtomicU32);

impl FailureBudget {
    pub fn set(&self, failures: u32) {
        self.0.store(failures, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

pub struct MockConnection {
    pub id: u32,
    pub via_uri: bool,
    dead: AtomicBool,
    closed: AtomicBool,
    fail_close: AtomicBool,
    models: RwLock<Vec<ModelDefinition>>,
    pub authenticate_calls: AtomicU32,
    pub add_models_calls: AtomicU32,
    pub sync_calls: AtomicU32,
    pub close_calls: AtomicU32,
    pub last_sync: Mutex<Option<SyncOptions>>,
    auth_failures: Arc<FailureBudget>,
    sync_failures: Arc<FailureBudget>,
}

impl MockConnection {
    fn new(id: u32, via_uri: bool, driver: &MockDriver) -> Self {
        Self {
            id,
            via_uri,
            dead: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
            models: RwLock::new(Vec::new()),
            authenticate_calls: AtomicU32::new(0),
            add_models_calls: AtomicU32::new(0),
            sync_calls: AtomicU32::new(0),
            close_calls: AtomicU32::new(0),
            last_sync: Mutex::new(None),
            auth_failures: driver.auth_failures.clone(),
            sync_failures: driver.sync_failures.clone(),
        }
    }

    /// Make every further authenticate fail, like a dropped server socket
    pub fn kill(&self) {
        self.dead.store(true, Ordering::SeqCst);
    }

    pub fn fail_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }

    pub fn count(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn authenticate(&self) -> Result<()> {
        self.authenticate_calls.fetch_add(1, Ordering::SeqCst);
        if self.dead.load(Ordering::SeqCst) || self.auth_failures.take() {
            return Err(TenantDbError::Authentication("connection reset by peer".into()));
        }
        Ok(())
    }

    fn add_models(&self, models: Vec<ModelDefinition>) -> Result<()> {
        self.add_models_calls.fetch_add(1, Ordering::SeqCst);
        self.models.write().extend(models);
        Ok(())
    }

    fn models(&self) -> Vec<ModelDefinition> {
        self.models.read().clone()
    }

    async fn sync(&self, options: &SyncOptions) -> Result<()> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_sync.lock() = Some(options.clone());
        if self.sync_failures.take() {
            return Err(TenantDbError::Sync("deadlock detected".into()));
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(TenantDbError::Connection("close on broken socket".into()));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Driver that records every connection it creates
#[derive(Default)]
pub struct MockDriver {
    connections: Mutex<Vec<Arc<MockConnection>>>,
    connect_failures: FailureBudget,
    pub auth_failures: Arc<FailureBudget>,
    pub sync_failures: Arc<FailureBudget>,
    connect_delay: Mutex<Option<Duration>>,
}

impl MockDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_connects(&self, failures: u32) {
        self.connect_failures.set(failures);
    }

    pub fn fail_authenticates(&self, failures: u32) {
        self.auth_failures.set(failures);
    }

    pub fn fail_syncs(&self, failures: u32) {
        self.sync_failures.set(failures);
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock() = Some(delay);
    }

    pub fn connections(&self) -> Vec<Arc<MockConnection>> {
        self.connections.lock().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn registry(self: &Arc<Self>) -> Arc<DriverRegistry> {
        Arc::new(DriverRegistry::new().with_driver(self.clone()))
    }

    async fn open(&self, via_uri: bool) -> Result<Arc<dyn Connection>> {
        let delay = *self.connect_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.connect_failures.take() {
            return Err(TenantDbError::Connection("connection refused".into()));
        }
        let mut connections = self.connections.lock();
        let conn = Arc::new(MockConnection::new(connections.len() as u32, via_uri, self));
        connections.push(conn.clone());
        Ok(conn)
    }
}

#[async_trait]
impl DatabaseDriver for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn connect(&self, _config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        self.open(false).await
    }

    async fn connect_uri(
        &self,
        _uri: &str,
        _config: &ConnectionConfig,
    ) -> Result<Arc<dyn Connection>> {
        self.open(true).await
    }
}

/// Same handle, compared by address
pub fn same_connection(a: &Arc<dyn Connection>, b: &Arc<MockConnection>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
