//! Database timeout helpers
//!
//! Row locks taken by `lock_tournament` can wait on another transaction, so
//! lock acquisition, transaction begin/commit and schema setup run under a
//! deadline.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Default timeout for single statements (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for beginning/committing a transaction and waiting on a row lock (10 seconds)
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for schema setup (30 seconds)
pub const SCHEMA_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for timeout operations
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl TimeoutError {
    /// The underlying database error, if the operation did not time out
    pub fn database_error(&self) -> Option<&sqlx::Error> {
        match self {
            TimeoutError::Database(e) => Some(e),
            TimeoutError::Timeout(_) => None,
        }
    }

    /// True when a unique constraint rejected the operation
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self.database_error(),
            Some(sqlx::Error::Database(db)) if db.is_unique_violation()
        )
    }
}

/// Result type for timeout operations
pub type TimeoutResult<T> = Result<T, TimeoutError>;

/// Run a database future with a deadline
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> TimeoutResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(TimeoutError::Database(e)),
        Err(_) => Err(TimeoutError::Timeout(duration)),
    }
}

/// Run a database future with the default statement timeout
pub async fn with_default_timeout<F, T>(future: F) -> TimeoutResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}
