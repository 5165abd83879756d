use std::time::Duration;

use crate::{
    ConfigLoadError,
    util::{non_empty, parse_number, parse_optional_duration},
};

/// Environment-derived configuration values, before defaults are applied.
///
/// Durations use `Some(None)` for an explicit `0` (disabled).
#[derive(Default, Clone)]
pub struct EnvConfig {
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub db_host: Option<String>,
    pub db_port: Option<u16>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub db_database: Option<String>,
    pub db_max_connections: Option<usize>,
    pub db_min_connections: Option<usize>,
    pub db_max_idle: Option<usize>,
    pub db_acquire_timeout: Option<Option<Duration>>,
    pub db_maintenance_interval: Option<Option<Duration>>,
    pub jwt_secret_key: Option<String>,
    pub jwt_expiration_hours: Option<i64>,
    pub refresh_token_expiration_days: Option<i64>,
    pub password_pepper: Option<String>,
    pub auth_username: Option<String>,
    pub auth_user_id: Option<i64>,
    pub auth_password_hash: Option<String>,
}

impl std::fmt::Debug for EnvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvConfig")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("db_host", &self.db_host)
            .field("db_port", &self.db_port)
            .field("db_user", &self.db_user)
            .field("db_database", &self.db_database)
            .field("auth_username", &self.auth_username)
            .finish_non_exhaustive()
    }
}

impl EnvConfig {
    /// Read from the process environment.
    pub fn gather() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            server_host: non_empty(lookup("SERVER_HOST")),
            server_port: parse_number("SERVER_PORT", lookup("SERVER_PORT"))?,
            db_host: non_empty(lookup("DB_HOST")),
            db_port: parse_number("DB_PORT", lookup("DB_PORT"))?,
            db_user: non_empty(lookup("DB_USER")),
            // an empty password is a legitimate value
            db_password: lookup("DB_PASSWORD"),
            db_database: non_empty(lookup("DB_DATABASE")),
            db_max_connections: parse_number(
                "DB_MAX_CONNECTIONS",
                lookup("DB_MAX_CONNECTIONS"),
            )?,
            db_min_connections: parse_number(
                "DB_MIN_CONNECTIONS",
                lookup("DB_MIN_CONNECTIONS"),
            )?,
            db_max_idle: parse_number("DB_MAX_IDLE", lookup("DB_MAX_IDLE"))?,
            db_acquire_timeout: parse_optional_duration(
                "DB_ACQUIRE_TIMEOUT",
                lookup("DB_ACQUIRE_TIMEOUT"),
            )?,
            db_maintenance_interval: parse_optional_duration(
                "DB_MAINTENANCE_INTERVAL",
                lookup("DB_MAINTENANCE_INTERVAL"),
            )?,
            jwt_secret_key: non_empty(lookup("JWT_SECRET_KEY")),
            jwt_expiration_hours: parse_number(
                "JWT_EXPIRATION_HOURS",
                lookup("JWT_EXPIRATION_HOURS"),
            )?,
            refresh_token_expiration_days: parse_number(
                "REFRESH_TOKEN_EXPIRATION_DAYS",
                lookup("REFRESH_TOKEN_EXPIRATION_DAYS"),
            )?,
            password_pepper: non_empty(lookup("PASSWORD_PEPPER")),
            auth_username: non_empty(lookup("AUTH_USERNAME")),
            auth_user_id: parse_number("AUTH_USER_ID", lookup("AUTH_USER_ID"))?,
            auth_password_hash: non_empty(lookup("AUTH_PASSWORD_HASH")),
        })
    }
}
