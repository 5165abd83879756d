pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";
pub const DEFAULT_SERVER_PORT: u16 = 5000;

pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_DB_USER: &str = "root";
pub const DEFAULT_DB_NAME: &str = "mydb";
pub const DEFAULT_DB_MAX_CONNECTIONS: usize = 10;
pub const DEFAULT_DB_MIN_CONNECTIONS: usize = 2;
pub const DEFAULT_DB_MAX_IDLE: usize = 5;
pub const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DB_MAINTENANCE_INTERVAL_SECS: u64 = 60;

/// Development-only signing key. Never deploy with it.
pub const DEFAULT_JWT_SECRET: &str = "dev-secret-key";
pub const DEFAULT_PASSWORD_PEPPER: &str = "dev-password-pepper";
pub const DEFAULT_ACCESS_TOKEN_HOURS: i64 = 24;
pub const DEFAULT_REFRESH_TOKEN_DAYS: i64 = 7;
pub const MAX_ACCESS_TOKEN_HOURS: i64 = 24 * 366;
pub const MAX_REFRESH_TOKEN_DAYS: i64 = 3660;

/// HS256 keys shorter than this are flagged at startup.
pub const MIN_RECOMMENDED_SECRET_LEN: usize = 32;
