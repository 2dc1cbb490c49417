//! Lifecycle manager against real SQLite databases

use std::path::Path;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use tenantdb_connection::{ConnectionLifecycleManager, TenantConnectionModule};
use tenantdb_core::{
    ColumnDefinition, ColumnType, Connection, ConnectionConfig, ConnectionKey, DriverRegistry,
    InMemoryModelRegistry, ModelDefinition, SyncOptions, TenantDbError,
};
use tenantdb_driver_sqlite::{SqliteConnection, SqliteDriver};

fn manager_with_models() -> (Arc<InMemoryModelRegistry>, Arc<ConnectionLifecycleManager>) {
    let drivers = Arc::new(DriverRegistry::new().with_driver(Arc::new(SqliteDriver::new())));
    let models = Arc::new(InMemoryModelRegistry::new());
    TenantConnectionModule::for_feature(
        &models,
        [ModelDefinition::new("User")
            .with_table_name("users")
            .with_column(ColumnDefinition::id("id"))
            .with_column(ColumnDefinition::new("email", ColumnType::Text).not_null())],
        None,
    );
    let manager = Arc::new(ConnectionLifecycleManager::new(drivers, models.clone()));
    (models, manager)
}

fn tenant(dir: &Path, name: &str) -> ConnectionConfig {
    ConnectionConfig::new(name)
        .with_storage(dir.join(format!("{name}.db")).to_string_lossy())
        .with_auto_load_models(true)
}

fn table_names(path: &Path) -> Vec<String> {
    let conn = SqliteConnection::open(path.to_str().unwrap()).unwrap();
    conn.table_names().unwrap()
}

#[tokio::test]
async fn test_obtain_creates_schema_per_tenant() {
    let dir = tempfile::tempdir().unwrap();
    let (_models, manager) = manager_with_models();

    manager.obtain(&tenant(dir.path(), "tenant_a")).await.unwrap();
    manager.obtain(&tenant(dir.path(), "tenant_b")).await.unwrap();

    assert_eq!(table_names(&dir.path().join("tenant_a.db")), vec!["users"]);
    assert_eq!(table_names(&dir.path().join("tenant_b.db")), vec!["users"]);
    assert_eq!(
        manager.cached_keys(),
        vec![ConnectionKey::new("tenant_a"), ConnectionKey::new("tenant_b")]
    );

    manager.close_all().await;
}

#[tokio::test]
async fn test_reuse_returns_same_handle() {
    let dir = tempfile::tempdir().unwrap();
    let (_models, manager) = manager_with_models();
    let config = tenant(dir.path(), "tenant_a");

    let first = manager.obtain(&config).await.unwrap();
    let second = manager.obtain(&config).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    manager.close_all().await;
    assert!(first.is_closed());
}

#[tokio::test]
async fn test_closed_connection_is_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let (_models, manager) = manager_with_models();
    let module = TenantConnectionModule::for_root(manager.clone(), tenant(dir.path(), "tenant_a"))
        .await
        .unwrap();
    let original = module.connection();

    module.shutdown().await;
    assert!(original.is_closed());

    let rebuilt = manager.obtain(&tenant(dir.path(), "tenant_a")).await.unwrap();
    assert!(!Arc::ptr_eq(&original, &rebuilt));
    rebuilt.authenticate().await.unwrap();
    manager.close_all().await;
}

#[tokio::test]
async fn test_alter_sync_adds_columns_on_new_connection() {
    let dir = tempfile::tempdir().unwrap();
    let (models, manager) = manager_with_models();
    let config = tenant(dir.path(), "tenant_a");
    manager.obtain(&config).await.unwrap();
    assert!(manager.evict(&ConnectionKey::new("tenant_a")).await);

    models.register(
        "default",
        ModelDefinition::new("User")
            .with_table_name("users")
            .with_column(ColumnDefinition::id("id"))
            .with_column(ColumnDefinition::new("email", ColumnType::Text).not_null())
            .with_column(ColumnDefinition::new("plan", ColumnType::Text)),
    );
    let altered = config.with_sync_options(SyncOptions {
        force: false,
        alter: true,
    });
    manager.obtain(&altered).await.unwrap();
    manager.close_all().await;

    let conn = SqliteConnection::open(dir.path().join("tenant_a.db").to_str().unwrap()).unwrap();
    assert_eq!(conn.column_names("users").unwrap(), vec!["id", "email", "plan"]);
}

#[tokio::test]
async fn test_uri_configs_in_different_directories_do_not_collide() {
    let first_dir = tempfile::tempdir().unwrap();
    let second_dir = tempfile::tempdir().unwrap();
    let (_models, manager) = manager_with_models();
    let uri_config = |dir: &Path| {
        let uri = format!("sqlite://{}", dir.join("tenant.db").display());
        ConnectionConfig::from_uri(uri).with_auto_load_models(true)
    };

    let first = TenantConnectionModule::for_root(manager.clone(), uri_config(first_dir.path()))
        .await
        .unwrap();
    let second = TenantConnectionModule::for_root(manager.clone(), uri_config(second_dir.path()))
        .await
        .unwrap();

    assert_ne!(first.key(), second.key());
    assert_ne!(first.token(), second.token());
    assert!(!Arc::ptr_eq(&first.connection(), &second.connection()));
    assert_eq!(manager.cached_keys().len(), 2);
    assert_eq!(table_names(&first_dir.path().join("tenant.db")), vec!["users"]);
    assert_eq!(table_names(&second_dir.path().join("tenant.db")), vec!["users"]);
    manager.close_all().await;
}

#[tokio::test]
async fn test_missing_directory_exhausts_retries() {
    let dir = tempfile::tempdir().unwrap();
    let (_models, manager) = manager_with_models();
    let config = ConnectionConfig::new("tenant_x")
        .with_storage(dir.path().join("missing").join("tenant_x.db").to_string_lossy())
        .with_auto_load_models(true)
        .with_retry(2, 1);

    let err = manager.obtain(&config).await.unwrap_err();

    assert!(matches!(err, TenantDbError::Connection(_)));
    assert!(manager.cached_keys().is_empty());
}
