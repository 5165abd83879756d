use std::time::Duration;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures while borrowing a connection from the pool.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),

    #[error("timed out after {0:?} waiting for a free connection")]
    Timeout(Duration),

    #[error("connection acquisition was cancelled")]
    Cancelled,

    #[error("connection pool is shut down")]
    Closed,

    #[error("failed to open database connection: {0}")]
    Connect(#[source] BoxError),

    /// An idle connection failed its liveness probe and could not be
    /// replaced.
    #[error("pooled connection is dead and reconnecting failed: {0}")]
    ConnectionDead(#[source] BoxError),
}

/// Failures surfaced by the query executor.
///
/// Acquisition problems stay wrapped in [`DbError::Pool`] so callers can tell
/// "could not get a connection" apart from "the statement failed".
#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    #[error("transaction failed: {0}")]
    Transaction(#[source] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

impl DbError {
    /// Whether retrying the same request later may succeed.
    ///
    /// Only acquisition failures qualify; a statement the server rejected
    /// will be rejected again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DbError::Pool(
                PoolError::Timeout(_)
                    | PoolError::Connect(_)
                    | PoolError::ConnectionDead(_)
            )
        )
    }

    pub fn is_acquisition_failure(&self) -> bool {
        matches!(self, DbError::Pool(_))
    }

    /// The statement hit a unique or primary key constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::Query(sqlx::Error::Database(db)) => {
                db.is_unique_violation()
            }
            _ => false,
        }
    }
}
