//! Connection configuration
//!
//! A [`ConnectionConfig`] describes one tenant database: where it lives
//! (either structured options or a connection URI, never both), which driver
//! opens it, and how the lifecycle manager should initialize and retry it.

use serde::{Deserialize, Serialize};

use crate::{Result, TenantDbError};

/// Dialect used when a config does not name one
pub const DEFAULT_DIALECT: &str = "sqlite";

/// Default delay between connection retries in milliseconds
pub const DEFAULT_RETRY_DELAY_MS: u64 = 3000;

/// Schema synchronization options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Drop tables before creating them
    #[serde(default)]
    pub force: bool,

    /// Add columns that exist in the model but not in the table
    #[serde(default)]
    pub alter: bool,
}

/// Structured connection options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    pub database: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// File path for file based dialects
    pub storage: Option<String>,
}

/// Where the database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    Structured(ConnectionOptions),
    Uri(String),
}

/// Resolved configuration for one tenant connection
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawConnectionConfig", into = "RawConnectionConfig")]
pub struct ConnectionConfig {
    pub target: DatabaseTarget,
    pub dialect: String,
    /// Connection name used for model lookup
    pub name: Option<String>,
    pub auto_load_models: bool,
    pub synchronize: bool,
    pub sync: SyncOptions,
    /// Retries after the first attempt; 0 means a single attempt
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    /// 1.0 keeps the delay fixed
    pub retry_backoff_multiplier: f64,
    pub retry_max_delay_ms: Option<u64>,
}

impl ConnectionConfig {
    /// Structured config for a named database
    pub fn new(database: impl Into<String>) -> Self {
        Self::from_options(ConnectionOptions {
            database: Some(database.into()),
            ..Default::default()
        })
    }

    pub fn from_options(options: ConnectionOptions) -> Self {
        Self::with_target(DatabaseTarget::Structured(options))
    }

    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self::with_target(DatabaseTarget::Uri(uri.into()))
    }

    fn with_target(target: DatabaseTarget) -> Self {
        Self {
            target,
            dialect: DEFAULT_DIALECT.to_string(),
            name: None,
            auto_load_models: false,
            synchronize: true,
            sync: SyncOptions::default(),
            retry_attempts: 0,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            retry_backoff_multiplier: 1.0,
            retry_max_delay_ms: None,
        }
    }

    pub fn with_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = dialect.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_storage(mut self, storage: impl Into<String>) -> Self {
        if let DatabaseTarget::Structured(options) = &mut self.target {
            options.storage = Some(storage.into());
        }
        self
    }

    pub fn with_auto_load_models(mut self, enabled: bool) -> Self {
        self.auto_load_models = enabled;
        self
    }

    pub fn with_synchronize(mut self, enabled: bool) -> Self {
        self.synchronize = enabled;
        self
    }

    pub fn with_sync_options(mut self, sync: SyncOptions) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_retry(mut self, attempts: u32, delay_ms: u64) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay_ms = delay_ms;
        self
    }

    pub fn with_retry_backoff(mut self, multiplier: f64, max_delay_ms: Option<u64>) -> Self {
        self.retry_backoff_multiplier = multiplier;
        self.retry_max_delay_ms = max_delay_ms;
        self
    }

    /// Structured options, if this is not a URI config
    pub fn options(&self) -> Option<&ConnectionOptions> {
        match &self.target {
            DatabaseTarget::Structured(options) => Some(options),
            DatabaseTarget::Uri(_) => None,
        }
    }

    pub fn uri(&self) -> Option<&str> {
        match &self.target {
            DatabaseTarget::Uri(uri) => Some(uri),
            DatabaseTarget::Structured(_) => None,
        }
    }

    /// The configured database name.
    ///
    /// For URI configs this is the last non-empty path segment of the URI,
    /// which is not unique across hosts. Keys use [`Self::identity`].
    pub fn database(&self) -> Option<String> {
        match &self.target {
            DatabaseTarget::Structured(options) => options.database.clone(),
            DatabaseTarget::Uri(uri) => database_from_uri(uri),
        }
    }

    /// What makes this config a distinct database.
    ///
    /// Structured configs are identified by `database`. URI configs are
    /// identified by the whole normalized URI without credentials, so the
    /// same database name on two hosts or in two directories stays apart.
    pub fn identity(&self) -> Option<String> {
        match &self.target {
            DatabaseTarget::Structured(options) => options.database.clone(),
            DatabaseTarget::Uri(uri) => uri_identity(uri),
        }
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Credentials stay out of logs
        let target = match &self.target {
            DatabaseTarget::Structured(options) => format!(
                "Structured {{ database: {:?}, host: {:?}, port: {:?}, storage: {:?} }}",
                options.database, options.host, options.port, options.storage
            ),
            DatabaseTarget::Uri(_) => "Uri(..)".to_string(),
        };
        f.debug_struct("ConnectionConfig")
            .field("target", &target)
            .field("dialect", &self.dialect)
            .field("name", &self.name)
            .field("auto_load_models", &self.auto_load_models)
            .field("synchronize", &self.synchronize)
            .field("sync", &self.sync)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .finish()
    }
}

fn uri_identity(uri: &str) -> Option<String> {
    let uri = uri.trim();
    if uri.is_empty() {
        return None;
    }
    let Ok(mut parsed) = url::Url::parse(uri) else {
        return Some(uri.to_string());
    };
    // Cannot-be-a-base URIs such as `sqlite::memory:` carry no credentials
    let _ = parsed.set_username("");
    let _ = parsed.set_password(None);
    parsed.set_fragment(None);
    Some(parsed.into())
}

fn database_from_uri(uri: &str) -> Option<String> {
    let parsed = url::Url::parse(uri).ok()?;
    parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(|segment| segment.to_string())
}

/// Flat on-disk shape of [`ConnectionConfig`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawConnectionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    storage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dialect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default)]
    auto_load_models: bool,
    #[serde(default)]
    synchronize: Option<bool>,
    #[serde(default)]
    sync: SyncOptions,
    #[serde(default)]
    retry_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retry_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retry_backoff_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retry_max_delay_ms: Option<u64>,
}

impl TryFrom<RawConnectionConfig> for ConnectionConfig {
    type Error = TenantDbError;

    fn try_from(raw: RawConnectionConfig) -> Result<Self> {
        let options = ConnectionOptions {
            database: raw.database,
            host: raw.host,
            port: raw.port,
            username: raw.username,
            password: raw.password,
            storage: raw.storage,
        };

        let target = match raw.uri {
            Some(uri) => {
                if options != ConnectionOptions::default() {
                    return Err(TenantDbError::Configuration(
                        "'uri' cannot be combined with database, host, port, username, password or storage".into(),
                    ));
                }
                DatabaseTarget::Uri(uri)
            }
            None => DatabaseTarget::Structured(options),
        };

        let multiplier = raw.retry_backoff_multiplier.unwrap_or(1.0);
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(TenantDbError::Configuration(format!(
                "retry_backoff_multiplier must be >= 1.0, got {}",
                multiplier
            )));
        }

        Ok(Self {
            target,
            dialect: raw.dialect.unwrap_or_else(|| DEFAULT_DIALECT.to_string()),
            name: raw.name,
            auto_load_models: raw.auto_load_models,
            synchronize: raw.synchronize.unwrap_or(true),
            sync: raw.sync,
            retry_attempts: raw.retry_attempts,
            retry_delay_ms: raw.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS),
            retry_backoff_multiplier: multiplier,
            retry_max_delay_ms: raw.retry_max_delay_ms,
        })
    }
}

impl From<ConnectionConfig> for RawConnectionConfig {
    fn from(config: ConnectionConfig) -> Self {
        let mut raw = RawConnectionConfig {
            dialect: Some(config.dialect),
            name: config.name,
            auto_load_models: config.auto_load_models,
            synchronize: Some(config.synchronize),
            sync: config.sync,
            retry_attempts: config.retry_attempts,
            retry_delay_ms: Some(config.retry_delay_ms),
            retry_backoff_multiplier: Some(config.retry_backoff_multiplier),
            retry_max_delay_ms: config.retry_max_delay_ms,
            ..Default::default()
        };
        match config.target {
            DatabaseTarget::Uri(uri) => raw.uri = Some(uri),
            DatabaseTarget::Structured(options) => {
                raw.database = options.database;
                raw.host = options.host;
                raw.port = options.port;
                raw.username = options.username;
                raw.password = options.password;
                raw.storage = options.storage;
            }
        }
        raw
    }
}
