#![cfg(feature = "e2e")]

use serde_json::{Value, json};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use userhub_core::{
    ConnectionPool, DbError, MySqlConnectionManager, PoolConfig, QueryExecutor,
    database::{execute_on, fetch_rows},
};

async fn executor(opts: MySqlConnectOptions) -> QueryExecutor {
    let manager = MySqlConnectionManager::new(opts, "sqlx-test");
    let config = PoolConfig {
        max_connections: 4,
        min_connections: 1,
        max_idle: 2,
        ..PoolConfig::default()
    };
    let pool = ConnectionPool::connect(manager, config)
        .await
        .expect("pool connects");
    QueryExecutor::new(pool)
}

fn user(name: &str, userid: &str) -> Vec<Value> {
    vec![json!(name), json!(format!("{name}@example.com")), json!(userid)]
}

const INSERT: &str = "INSERT INTO users (name, email, userid) VALUES (?, ?, ?)";

#[sqlx::test(migrator = "userhub_core::MIGRATOR")]
async fn execute_reports_generated_id(
    _pool: MySqlPoolOptions,
    opts: MySqlConnectOptions,
) {
    let db = executor(opts).await;

    let first = db.execute(INSERT, &user("ann", "u-1")).await.unwrap();
    let second = db.execute(INSERT, &user("bob", "u-2")).await.unwrap();

    assert_eq!(first.affected_rows, 1);
    assert!(second.last_insert_id > first.last_insert_id);

    let rows = db
        .query(
            "SELECT id, name, mobile, status FROM users WHERE id = ?",
            &[json!(second.last_insert_id)],
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], json!("bob"));
    assert_eq!(rows[0]["mobile"], Value::Null);
    assert_eq!(rows[0]["status"], json!(1));
    assert_eq!(db.stats().loaned, 0);
}

#[sqlx::test(migrator = "userhub_core::MIGRATOR")]
async fn query_without_matches_is_empty(
    _pool: MySqlPoolOptions,
    opts: MySqlConnectOptions,
) {
    let db = executor(opts).await;
    let rows = db
        .query("SELECT id FROM users WHERE status = ?", &[json!(1)])
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[sqlx::test(migrator = "userhub_core::MIGRATOR")]
async fn failing_statement_returns_connection(
    _pool: MySqlPoolOptions,
    opts: MySqlConnectOptions,
) {
    let db = executor(opts).await;

    let err = db.query("SELECT * FROM missing_table", &[]).await.unwrap_err();
    assert!(matches!(err, DbError::Query(_)));
    assert_eq!(db.stats().loaned, 0);
}

#[sqlx::test(migrator = "userhub_core::MIGRATOR")]
async fn batch_is_all_or_nothing(
    _pool: MySqlPoolOptions,
    opts: MySqlConnectOptions,
) {
    let db = executor(opts).await;

    let ok = db
        .execute_batch(INSERT, &[user("ann", "u-1"), user("bob", "u-2")])
        .await
        .unwrap();
    assert_eq!(ok.affected_rows, 2);
    assert!(ok.success);

    // third set collides on the unique userid
    let err = db
        .execute_batch(
            INSERT,
            &[user("cat", "u-3"), user("dan", "u-4"), user("eve", "u-1")],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Query(_)));

    let rows = db.query("SELECT userid FROM users", &[]).await.unwrap();
    assert_eq!(rows.len(), 2);
}

#[sqlx::test(migrator = "userhub_core::MIGRATOR")]
async fn empty_batch_succeeds(
    _pool: MySqlPoolOptions,
    opts: MySqlConnectOptions,
) {
    let db = executor(opts).await;
    let result = db.execute_batch(INSERT, &[]).await.unwrap();
    assert_eq!(result.affected_rows, 0);
    assert!(result.success);
}

#[sqlx::test(migrator = "userhub_core::MIGRATOR")]
async fn transaction_commits_and_rolls_back(
    _pool: MySqlPoolOptions,
    opts: MySqlConnectOptions,
) {
    let db = executor(opts).await;

    let id = db
        .transaction(|conn| {
            Box::pin(async move {
                let done = execute_on(conn, INSERT, &user("ann", "u-1")).await?;
                Ok(done.last_insert_id)
            })
        })
        .await
        .unwrap();

    let outcome: Result<(), DbError> = db
        .transaction(|conn| {
            Box::pin(async move {
                execute_on(
                    conn,
                    "UPDATE users SET name = ? WHERE id = ?",
                    &[json!("changed"), json!(id)],
                )
                .await?;
                let rows = fetch_rows(
                    conn,
                    "SELECT name FROM users WHERE id = ?",
                    &[json!(id)],
                )
                .await?;
                assert_eq!(rows[0]["name"], json!("changed"));
                Err(DbError::Query(sqlx::Error::RowNotFound))
            })
        })
        .await;
    assert!(outcome.is_err());

    let row = db
        .query_one("SELECT name FROM users WHERE id = ?", &[json!(id)])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row["name"], json!("ann"));
}
