//! Cache key and provider token derivation

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ConnectionConfig;

/// Key shared by every config that does not name a database, and the
/// connection name used for model lookup when a config has no name.
pub const DEFAULT_CONNECTION_NAME: &str = "default";

/// Token of the connection registered under the default key
pub const DEFAULT_CONNECTION_TOKEN: &str = "TenantConnection";

/// Identity under which one connection is cached
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionKey(String);

impl ConnectionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn default_key() -> Self {
        Self(DEFAULT_CONNECTION_NAME.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_CONNECTION_NAME
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ConnectionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derives cache keys and provider tokens from configs
pub struct ConnectionKeyResolver;

impl ConnectionKeyResolver {
    /// The config's database identity, or the default key when it has none.
    ///
    /// A URI config is keyed by its full URI without credentials.
    pub fn resolve(config: &ConnectionConfig) -> ConnectionKey {
        match config.identity() {
            Some(identity) if !identity.is_empty() => ConnectionKey(identity),
            _ => ConnectionKey::default_key(),
        }
    }

    /// Token under which the host exposes the connection for `config`
    pub fn connection_token(config: &ConnectionConfig) -> String {
        Self::token_for_key(&Self::resolve(config))
    }

    pub fn token_for_key(key: &ConnectionKey) -> String {
        if key.is_default() {
            DEFAULT_CONNECTION_TOKEN.to_string()
        } else {
            format!("{}Connection", key)
        }
    }

    /// Connection name used to look up models for `config`
    pub fn connection_name(config: &ConnectionConfig) -> &str {
        config.name.as_deref().unwrap_or(DEFAULT_CONNECTION_NAME)
    }
}
