//! SQLite connection implementation

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rusqlite::{Connection as RusqliteConnection, OpenFlags};
use tenantdb_core::{Connection, ModelDefinition, Result, SyncOptions, TenantDbError};

use crate::schema::{add_column_sql, create_table_sql, drop_table_sql, quote_identifier};

/// SQLite connection wrapper
pub struct SqliteConnection {
    /// `None` once closed
    conn: Mutex<Option<RusqliteConnection>>,
    path: String,
    models: RwLock<Vec<ModelDefinition>>,
}

impl SqliteConnection {
    /// Open a SQLite database
    pub fn open(path: &str) -> Result<Self> {
        tracing::info!(path = %path, "opening SQLite database");
        let expanded_path = Self::expand_path(path)?;

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = if path == ":memory:" {
            RusqliteConnection::open_in_memory().map_err(|e| {
                TenantDbError::Connection(format!("Failed to open in-memory database: {}", e))
            })?
        } else {
            if !expanded_path.starts_with("file:") {
                let file_path = std::path::Path::new(&expanded_path);
                if let Some(parent) = file_path.parent()
                    && !parent.exists()
                {
                    return Err(TenantDbError::Connection(format!(
                        "Parent directory does not exist: {}",
                        parent.display()
                    )));
                }
            }

            RusqliteConnection::open_with_flags(&expanded_path, flags).map_err(|e| {
                TenantDbError::Connection(format!(
                    "Failed to open SQLite database at '{}': {}",
                    expanded_path, e
                ))
            })?
        };

        conn.pragma_update(None, "foreign_keys", "ON").map_err(|e| {
            TenantDbError::Connection(format!("Failed to enable foreign keys: {}", e))
        })?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| TenantDbError::Connection(format!("Failed to set journal mode: {}", e)))?;

        tracing::info!(path = %expanded_path, "SQLite database connection established");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: expanded_path,
            models: RwLock::new(Vec::new()),
        })
    }

    /// Expand `~/` and make relative paths absolute
    fn expand_path(path: &str) -> Result<String> {
        if path == ":memory:" || path.starts_with("file:") {
            return Ok(path.to_string());
        }

        let expanded = if let Some(rest) = path.strip_prefix("~/") {
            match dirs::home_dir() {
                Some(home) => home.join(rest).to_string_lossy().to_string(),
                None => {
                    return Err(TenantDbError::Configuration(
                        "Unable to determine home directory".into(),
                    ));
                }
            }
        } else if path.starts_with('~') {
            return Err(TenantDbError::Configuration(
                "User-specific home directories (~user) are not supported".into(),
            ));
        } else {
            path.to_string()
        };

        let path_buf = std::path::PathBuf::from(&expanded);
        let result = if path_buf.is_relative() {
            std::env::current_dir()?
                .join(path_buf)
                .to_string_lossy()
                .to_string()
        } else {
            expanded
        };

        Ok(result)
    }

    /// Resolved database path (`:memory:` for in-memory databases)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Run `f` against the open handle, or fail if the connection is closed.
    ///
    /// Calls run inline on the caller's task. They are short pings and schema
    /// DDL issued once per connection build, not per query.
    fn with_conn<T>(&self, f: impl FnOnce(&RusqliteConnection) -> Result<T>) -> Result<T> {
        let guard = self.conn.lock();
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(TenantDbError::Connection("Connection is closed".into())),
        }
    }

    /// Execute one or more SQL statements
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "executing SQL batch");
        self.with_conn(|conn| {
            conn.execute_batch(sql)
                .map_err(|e| TenantDbError::Driver(format!("Failed to execute batch: {}", e)))
        })
    }

    /// User tables in the database, sorted by name
    pub fn table_names(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' \
                     AND name NOT LIKE 'sqlite_%' ORDER BY name",
                )
                .map_err(|e| TenantDbError::Driver(e.to_string()))?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| TenantDbError::Driver(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| TenantDbError::Driver(e.to_string()))?;
            Ok(names)
        })
    }

    /// Column names of `table`, in declaration order
    pub fn column_names(&self, table: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| table_columns(conn, table))
    }

    fn sync_model(conn: &RusqliteConnection, model: &ModelDefinition, options: &SyncOptions) -> Result<()> {
        let table = model.table();
        let ddl_err =
            |e: rusqlite::Error| TenantDbError::Sync(format!("Failed to sync table '{}': {}", table, e));

        if options.force {
            tracing::debug!(table = %table, "dropping table before sync");
            conn.execute_batch(&drop_table_sql(model)).map_err(ddl_err)?;
        }

        conn.execute_batch(&create_table_sql(model)).map_err(ddl_err)?;

        if options.alter {
            let existing = table_columns(conn, table)?;
            for column in &model.columns {
                if existing.iter().any(|name| name == &column.name) {
                    continue;
                }
                tracing::debug!(table = %table, column = %column.name, "adding missing column");
                conn.execute_batch(&add_column_sql(table, column))
                    .map_err(ddl_err)?;
            }
        }
        Ok(())
    }
}

fn table_columns(conn: &RusqliteConnection, table: &str) -> Result<Vec<String>> {
    let sql = format!("PRAGMA table_info({})", quote_identifier(table));
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| TenantDbError::Driver(format!("Failed to read table info: {}", e)))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|e| TenantDbError::Driver(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| TenantDbError::Driver(e.to_string()))?;
    Ok(columns)
}

#[async_trait]
impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    #[tracing::instrument(skip(self), fields(path = %self.path))]
    async fn authenticate(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(|_| ())
                .map_err(|e| TenantDbError::Authentication(format!("SELECT 1 failed: {}", e)))
        })
    }

    fn add_models(&self, models: Vec<ModelDefinition>) -> Result<()> {
        let mut current = self.models.write();
        for model in models {
            if model.columns.is_empty() {
                return Err(TenantDbError::Model(format!(
                    "Model '{}' has no columns",
                    model.name
                )));
            }
            match current.iter_mut().find(|m| m.name == model.name) {
                Some(existing) => *existing = model,
                None => current.push(model),
            }
        }
        tracing::debug!(models = current.len(), "models attached");
        Ok(())
    }

    fn models(&self) -> Vec<ModelDefinition> {
        self.models.read().clone()
    }

    #[tracing::instrument(skip(self, options), fields(path = %self.path, force = options.force, alter = options.alter))]
    async fn sync(&self, options: &SyncOptions) -> Result<()> {
        let models = self.models();
        self.with_conn(|conn| {
            for model in &models {
                Self::sync_model(conn, model, options)?;
            }
            Ok(())
        })?;
        tracing::info!(tables = models.len(), "schema synchronized");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let Some(conn) = self.conn.lock().take() else {
            tracing::debug!(path = %self.path, "SQLite connection already closed");
            return Ok(());
        };
        tracing::info!(path = %self.path, "closing SQLite connection");
        conn.close().map_err(|(_, e)| {
            TenantDbError::Connection(format!("Failed to close SQLite connection: {}", e))
        })
    }

    fn is_closed(&self) -> bool {
        self.conn.lock().is_none()
    }
}
