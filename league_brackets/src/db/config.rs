//! Database configuration.

use std::env;
use std::str::FromStr;

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    ///
    /// - `DATABASE_URL`: PostgreSQL connection string (default: development URL)
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 20)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 2)
    /// - `DB_CONNECTION_TIMEOUT`: Connection timeout in seconds (default: 10)
    /// - `DB_IDLE_TIMEOUT`: Idle timeout in seconds (default: 600)
    /// - `DB_MAX_LIFETIME`: Max lifetime in seconds (default: 1800)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::development();
        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: env_or("DB_MIN_CONNECTIONS", defaults.min_connections),
            connection_timeout_secs: env_or(
                "DB_CONNECTION_TIMEOUT",
                defaults.connection_timeout_secs,
            ),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT", defaults.idle_timeout_secs),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME", defaults.max_lifetime_secs),
        }
    }

    /// Default configuration for local development
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/league_brackets".to_string(),
            max_connections: 20,
            min_connections: 2,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_defaults() {
        let config = DatabaseConfig::default();
        assert!(config.database_url.starts_with("postgres://"));
        assert!(config.min_connections <= config.max_connections);
    }

    #[test]
    fn test_env_or_falls_back_on_missing_variable() {
        let value: u32 = env_or("LEAGUE_BRACKETS_TEST_UNSET_VARIABLE", 7);
        assert_eq!(value, 7);
    }
}
