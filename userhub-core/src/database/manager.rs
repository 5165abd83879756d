use std::fmt;

use async_trait::async_trait;
use sqlx::{
    ConnectOptions, Connection, MySqlConnection, mysql::MySqlConnectOptions,
};
use tracing::debug;

/// Opens, probes and closes the connections a [`ConnectionPool`] lends out.
///
/// [`ConnectionPool`]: super::ConnectionPool
#[async_trait]
pub trait ConnectionManager: Send + Sync + 'static {
    type Connection: Send + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn connect(&self) -> Result<Self::Connection, Self::Error>;

    /// Lightweight keepalive check run before an idle connection is handed
    /// out.
    async fn is_alive(&self, conn: &mut Self::Connection) -> bool;

    async fn close(&self, conn: Self::Connection);
}

/// MySQL sessions opened with `sqlx`.
#[derive(Clone)]
pub struct MySqlConnectionManager {
    options: MySqlConnectOptions,
    target: String,
}

impl fmt::Debug for MySqlConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlConnectionManager")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl MySqlConnectionManager {
    /// `target` is only used in logs and `Debug` output.
    pub fn new(
        options: MySqlConnectOptions,
        target: impl Into<String>,
    ) -> Self {
        Self {
            options,
            target: target.into(),
        }
    }

    pub fn from_parts(
        host: &str,
        port: u16,
        user: &str,
        password: &str,
        database: &str,
    ) -> Self {
        let options = MySqlConnectOptions::new()
            .host(host)
            .port(port)
            .username(user)
            .password(password)
            .database(database)
            .charset("utf8mb4");
        Self::new(options, format!("{user}@{host}:{port}/{database}"))
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn options(&self) -> &MySqlConnectOptions {
        &self.options
    }
}

#[async_trait]
impl ConnectionManager for MySqlConnectionManager {
    type Connection = MySqlConnection;
    type Error = sqlx::Error;

    async fn connect(&self) -> Result<MySqlConnection, sqlx::Error> {
        self.options.connect().await
    }

    async fn is_alive(&self, conn: &mut MySqlConnection) -> bool {
        conn.ping().await.is_ok()
    }

    async fn close(&self, conn: MySqlConnection) {
        if let Err(err) = conn.close().await {
            debug!(error = %err, "error while closing MySQL connection");
        }
    }
}
