//! Connection pooling and query execution against MySQL.

pub mod errors;
pub mod executor;
pub mod manager;
pub mod pool;
pub mod slot;
pub mod values;

pub use errors::{BoxError, DbError, PoolError};
pub use executor::{
    BatchResult, ExecuteResult, MySqlPool, QueryExecutor, execute_on,
    fetch_rows,
};
pub use manager::{ConnectionManager, MySqlConnectionManager};
pub use pool::{ConnectionPool, PoolConfig, PoolStats, PooledConnection};
pub use slot::PoolSlot;
pub use values::Row;

/// Schema migrations for the `users` table.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
