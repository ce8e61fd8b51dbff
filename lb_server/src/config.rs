//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use league_brackets::db::DatabaseConfig;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Default HTTP bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:7070";

/// Where tournaments are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process memory; lost on restart
    Memory,
    /// PostgreSQL through `DATABASE_URL`
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            other => Err(ConfigError::Invalid {
                var: "STORAGE_BACKEND".to_string(),
                reason: format!("Unknown backend {other:?}, expected memory or postgres"),
            }),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => f.write_str("memory"),
            StorageBackend::Postgres => f.write_str("postgres"),
        }
    }
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP bind address
    pub bind: SocketAddr,
    pub storage: StorageBackend,
    /// Used when `storage` is `Postgres`
    pub database: DatabaseConfig,
    /// Create tables on startup (Postgres only)
    pub apply_schema: bool,
    /// Prometheus exporter address; disabled when absent
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// CLI overrides take precedence over `SERVER_BIND`, `DATABASE_URL` and
    /// `STORAGE_BACKEND`. Other variables: `APPLY_SCHEMA` (default true),
    /// `METRICS_BIND`, and the `DB_*` pool settings read by
    /// [`DatabaseConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but cannot be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        storage_override: Option<StorageBackend>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_addr("SERVER_BIND")?.unwrap_or(default_bind()),
        };

        let storage = match storage_override {
            Some(storage) => storage,
            None => match std::env::var("STORAGE_BACKEND") {
                Ok(value) => value.parse()?,
                Err(_) => StorageBackend::Memory,
            },
        };

        let mut database = DatabaseConfig::from_env();
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        Ok(ServerConfig {
            bind,
            storage,
            database,
            apply_schema: parse_env_or("APPLY_SCHEMA", true),
            metrics_bind: parse_env_addr("METRICS_BIND")?,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage == StorageBackend::Postgres {
            if !self.database.database_url.starts_with("postgres://")
                && !self.database.database_url.starts_with("postgresql://")
            {
                return Err(ConfigError::Invalid {
                    var: "DATABASE_URL".to_string(),
                    reason: "Must be a postgres:// or postgresql:// URL".to_string(),
                });
            }

            if self.database.max_connections == 0 {
                return Err(ConfigError::Invalid {
                    var: "DB_MAX_CONNECTIONS".to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }

            if self.database.min_connections > self.database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed max connections ({})",
                        self.database.max_connections
                    ),
                });
            }
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server address ({})", self.bind),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 7070))
}

/// Read an optional socket address; present but malformed is an error
fn parse_env_addr(key: &str) -> Result<Option<SocketAddr>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value.parse().map(Some).map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("{value:?} is not an IP:PORT address"),
        }),
        Err(_) => Ok(None),
    }
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
