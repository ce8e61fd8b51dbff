//! Persistence for tournaments, teams, rounds and matches.
//!
//! The engine talks to storage through the [`BracketRepository`] and
//! [`BracketTransaction`] traits. Two implementations ship with the crate:
//! [`PgBracketRepository`] on a sqlx PostgreSQL pool and
//! [`MemoryBracketRepository`] for tests and single-process deployments.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod config;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod timeouts;

pub use config::DatabaseConfig;
pub use memory::MemoryBracketRepository;
pub use postgres::PgBracketRepository;
pub use repository::{
    BracketRepository, BracketTransaction, MatchRepository, RoundRepository, TeamRepository,
    TournamentRepository,
};

use timeouts::{SCHEMA_TIMEOUT, TimeoutResult, with_default_timeout, with_timeout};

/// Schema applied by [`Database::apply_schema`]
pub const SCHEMA_SQL: &str = include_str!("../../migrations/0001_brackets.sql");

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use league_brackets::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let config = DatabaseConfig::from_env();
    ///     let db = Database::new(&config).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Repository over this pool
    pub fn repository(&self) -> PgBracketRepository {
        PgBracketRepository::new(self.pool.clone())
    }

    /// Create the bracket tables if they do not exist
    pub async fn apply_schema(&self) -> TimeoutResult<()> {
        with_timeout(SCHEMA_TIMEOUT, sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool)).await?;
        log::info!("Bracket schema is up to date");
        Ok(())
    }

    /// Check if the database connection is healthy
    pub async fn health_check(&self) -> TimeoutResult<()> {
        with_default_timeout(sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}
