//! Storage configuration.
//!
//! Read once by the composition root and passed down explicitly. Nothing in this
//! crate reads the environment on its own.

use thiserror::Error;

/// Default pool size when `DATABASE_MAX_CONNECTIONS` is unset.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    InMemory,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")]
    MissingDatabaseUrl,

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self {
            backend: StorageBackend::InMemory,
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    pub fn postgres(database_url: impl Into<String>) -> Self {
        Self {
            backend: StorageBackend::Postgres,
            database_url: Some(database_url.into()),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Read `USE_PERSISTENT_STORES`, `DATABASE_URL` and `DATABASE_MAX_CONNECTIONS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`StorageConfig::from_env`], over an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let use_persistent = match lookup("USE_PERSISTENT_STORES") {
            None => false,
            Some(raw) => raw.trim().parse::<bool>().map_err(|_| ConfigError::Invalid {
                key: "USE_PERSISTENT_STORES",
                value: raw,
            })?,
        };

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "DATABASE_MAX_CONNECTIONS",
                        value: raw,
                    });
                }
            },
        };

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let backend = if use_persistent {
            if database_url.is_none() {
                return Err(ConfigError::MissingDatabaseUrl);
            }
            StorageBackend::Postgres
        } else {
            StorageBackend::InMemory
        };

        Ok(Self {
            backend,
            database_url,
            max_connections,
        })
    }
}
