use std::{fmt, path::PathBuf, time::Duration};

use crate::constants::{DEFAULT_JWT_SECRET, DEFAULT_PASSWORD_PEPPER};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: usize,
    pub min_connections: usize,
    pub max_idle: usize,
    /// `None` lets callers wait for a connection indefinitely.
    pub acquire_timeout: Option<Duration>,
    /// `None` disables background pool maintenance.
    pub maintenance_interval: Option<Duration>,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("max_idle", &self.max_idle)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("maintenance_interval", &self.maintenance_interval)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_hours: i64,
    pub refresh_token_days: i64,
    pub password_pepper: String,
    pub login: Option<LoginAccount>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_token_hours", &self.access_token_hours)
            .field("refresh_token_days", &self.refresh_token_days)
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

impl AuthConfig {
    pub fn is_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    pub fn is_default_pepper(&self) -> bool {
        self.password_pepper == DEFAULT_PASSWORD_PEPPER
    }
}

/// The single account allowed to log in.
#[derive(Clone)]
pub struct LoginAccount {
    pub username: String,
    pub user_id: i64,
    /// Argon2id PHC string.
    pub password_hash: String,
}

impl fmt::Debug for LoginAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginAccount")
            .field("username", &self.username)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub env_file_loaded: bool,
    pub env_file_path: Option<PathBuf>,
}
