use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use sqlx::{Connection, MySql, MySqlConnection, Transaction};
use tracing::{debug, warn};

use super::{
    MIGRATOR,
    errors::DbError,
    manager::MySqlConnectionManager,
    pool::{ConnectionPool, PoolStats},
    values::{Row, bind_params, row_to_map},
};

pub type MySqlPool = ConnectionPool<MySqlConnectionManager>;

/// Outcome of a single data-modifying statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExecuteResult {
    pub affected_rows: u64,
    /// Auto-increment id generated by the statement, 0 when none was.
    pub last_insert_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub affected_rows: u64,
    pub success: bool,
}

/// Runs parameterized SQL on connections borrowed from the pool.
///
/// Every call borrows its own connection and gives it back before
/// returning, on success and on failure. Writes run inside a transaction
/// that is committed only if every statement succeeds.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    pool: MySqlPool,
}

impl QueryExecutor {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Read-only query; returns all rows in result order.
    pub async fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, DbError> {
        let mut conn = self.pool.acquire().await?;
        fetch_rows(&mut conn, sql, params).await
    }

    pub async fn query_one(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<Row>, DbError> {
        Ok(self.query(sql, params).await?.into_iter().next())
    }

    pub async fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<ExecuteResult, DbError> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = Connection::begin(&mut *conn)
            .await
            .map_err(DbError::Transaction)?;

        match execute_on(&mut *tx, sql, params).await {
            Ok(result) => {
                tx.commit().await.map_err(DbError::Transaction)?;
                Ok(result)
            }
            Err(err) => {
                roll_back(tx).await;
                Err(err)
            }
        }
    }

    /// Run `sql` once per parameter set, all in one transaction.
    ///
    /// Either every set is applied or none is. An empty list succeeds
    /// without touching the database.
    pub async fn execute_batch(
        &self,
        sql: &str,
        params_list: &[Vec<Value>],
    ) -> Result<BatchResult, DbError> {
        if params_list.is_empty() {
            return Ok(BatchResult {
                affected_rows: 0,
                success: true,
            });
        }

        let mut conn = self.pool.acquire().await?;
        let mut tx = Connection::begin(&mut *conn)
            .await
            .map_err(DbError::Transaction)?;

        let mut affected_rows = 0;
        for (index, params) in params_list.iter().enumerate() {
            match execute_on(&mut *tx, sql, params).await {
                Ok(result) => affected_rows += result.affected_rows,
                Err(err) => {
                    debug!(index, "batch statement failed; rolling back");
                    roll_back(tx).await;
                    return Err(err);
                }
            }
        }

        tx.commit().await.map_err(DbError::Transaction)?;
        Ok(BatchResult {
            affected_rows,
            success: true,
        })
    }

    /// Run `work` inside a transaction on one borrowed connection.
    ///
    /// Commits when `work` returns `Ok`, rolls back when it returns `Err`.
    /// If the returned future is dropped midway the transaction is rolled
    /// back before the connection is reused.
    pub async fn transaction<T, F>(&self, work: F) -> Result<T, DbError>
    where
        F: for<'c> FnOnce(
            &'c mut MySqlConnection,
        ) -> BoxFuture<'c, Result<T, DbError>>,
    {
        let mut conn = self.pool.acquire().await?;
        let mut tx = Connection::begin(&mut *conn)
            .await
            .map_err(DbError::Transaction)?;

        match work(&mut *tx).await {
            Ok(value) => {
                tx.commit().await.map_err(DbError::Transaction)?;
                Ok(value)
            }
            Err(err) => {
                roll_back(tx).await;
                Err(err)
            }
        }
    }

    pub async fn migrate(&self) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        MIGRATOR
            .run(&mut *conn)
            .await
            .map_err(DbError::Migration)
    }
}

/// Run a read query on a connection the caller already holds, typically
/// inside [`QueryExecutor::transaction`].
pub async fn fetch_rows(
    conn: &mut MySqlConnection,
    sql: &str,
    params: &[Value],
) -> Result<Vec<Row>, DbError> {
    let rows = bind_params(sqlx::query(sql), params)
        .fetch_all(&mut *conn)
        .await
        .map_err(DbError::Query)?;
    rows.iter()
        .map(row_to_map)
        .collect::<Result<_, _>>()
        .map_err(DbError::Query)
}

pub async fn execute_on(
    conn: &mut MySqlConnection,
    sql: &str,
    params: &[Value],
) -> Result<ExecuteResult, DbError> {
    let done = bind_params(sqlx::query(sql), params)
        .execute(&mut *conn)
        .await
        .map_err(DbError::Query)?;
    Ok(ExecuteResult {
        affected_rows: done.rows_affected(),
        last_insert_id: done.last_insert_id(),
    })
}

async fn roll_back(tx: Transaction<'_, MySql>) {
    if let Err(err) = tx.rollback().await {
        warn!(error = %err, "transaction rollback failed");
    }
}
