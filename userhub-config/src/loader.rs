use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{
    ConfigLoadError, ConfigWarnings, EnvConfig,
    constants::*,
    models::{
        AuthConfig, Config, ConfigMetadata, DatabaseConfig, LoginAccount,
        ServerConfig,
    },
};

/// Result of a successful load: the effective configuration plus anything
/// worth warning about.
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

/// Builds a [`Config`] from the environment and an optional `.env` file.
///
/// Process environment variables take precedence over the file. The file is
/// read without modifying the process environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    env_file: Option<PathBuf>,
    skip_env_file: bool,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `path` instead of `./.env`. A missing explicit file is an error.
    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    pub fn without_env_file(mut self) -> Self {
        self.skip_env_file = true;
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        self.load_with(|key| std::env::var(key).ok())
    }

    /// Like [`load`](Self::load) but reads "process" variables through
    /// `lookup`.
    pub fn load_with<F>(&self, lookup: F) -> Result<ConfigLoad, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (file_vars, metadata) = self.read_env_file()?;
        let env = EnvConfig::from_lookup(|key| {
            lookup(key).or_else(|| file_vars.get(key).cloned())
        })?;
        resolve(env, metadata)
    }

    fn read_env_file(
        &self,
    ) -> Result<(HashMap<String, String>, ConfigMetadata), ConfigLoadError>
    {
        if self.skip_env_file {
            return Ok((HashMap::new(), ConfigMetadata::default()));
        }

        let path = self
            .env_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(".env"));
        let iter = match dotenvy::from_path_iter(&path) {
            Ok(iter) => iter,
            Err(err) if err.not_found() && self.env_file.is_none() => {
                debug!(path = %path.display(), "no env file found");
                return Ok((HashMap::new(), ConfigMetadata::default()));
            }
            Err(source) => return Err(env_file_error(&path, source)),
        };

        let mut vars = HashMap::new();
        for item in iter {
            let (key, value) =
                item.map_err(|source| env_file_error(&path, source))?;
            vars.insert(key, value);
        }

        Ok((
            vars,
            ConfigMetadata {
                env_file_loaded: true,
                env_file_path: Some(path),
            },
        ))
    }
}

fn env_file_error(path: &Path, source: dotenvy::Error) -> ConfigLoadError {
    ConfigLoadError::EnvFile {
        path: path.to_path_buf(),
        source,
    }
}

/// Apply defaults, check consistency and collect warnings.
pub fn resolve(
    env: EnvConfig,
    metadata: ConfigMetadata,
) -> Result<ConfigLoad, ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    let server = ServerConfig {
        host: env
            .server_host
            .unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
        port: env.server_port.unwrap_or(DEFAULT_SERVER_PORT),
    };

    let database = DatabaseConfig {
        host: env.db_host.unwrap_or_else(|| DEFAULT_DB_HOST.to_string()),
        port: env.db_port.unwrap_or(DEFAULT_DB_PORT),
        user: env.db_user.unwrap_or_else(|| DEFAULT_DB_USER.to_string()),
        password: env.db_password.unwrap_or_default(),
        database: env
            .db_database
            .unwrap_or_else(|| DEFAULT_DB_NAME.to_string()),
        max_connections: env
            .db_max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
        min_connections: env
            .db_min_connections
            .unwrap_or(DEFAULT_DB_MIN_CONNECTIONS),
        max_idle: env.db_max_idle.unwrap_or(DEFAULT_DB_MAX_IDLE),
        acquire_timeout: env.db_acquire_timeout.unwrap_or(Some(
            std::time::Duration::from_secs(DEFAULT_DB_ACQUIRE_TIMEOUT_SECS),
        )),
        maintenance_interval: env.db_maintenance_interval.unwrap_or(Some(
            std::time::Duration::from_secs(
                DEFAULT_DB_MAINTENANCE_INTERVAL_SECS,
            ),
        )),
    };
    check_pool_bounds(&database)?;

    if database.password.is_empty() {
        warnings.push(
            "database password is empty",
            Some("set DB_PASSWORD for any shared or production server"),
        );
    }
    if database.acquire_timeout.is_none() {
        warnings.push(
            "DB_ACQUIRE_TIMEOUT is disabled; requests may wait forever for a connection",
            None,
        );
    }

    let auth = AuthConfig {
        jwt_secret: env
            .jwt_secret_key
            .unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string()),
        access_token_hours: token_lifetime(
            "JWT_EXPIRATION_HOURS",
            env.jwt_expiration_hours,
            DEFAULT_ACCESS_TOKEN_HOURS,
            MAX_ACCESS_TOKEN_HOURS,
        )?,
        refresh_token_days: token_lifetime(
            "REFRESH_TOKEN_EXPIRATION_DAYS",
            env.refresh_token_expiration_days,
            DEFAULT_REFRESH_TOKEN_DAYS,
            MAX_REFRESH_TOKEN_DAYS,
        )?,
        password_pepper: env
            .password_pepper
            .unwrap_or_else(|| DEFAULT_PASSWORD_PEPPER.to_string()),
        login: login_account(
            env.auth_username,
            env.auth_user_id,
            env.auth_password_hash,
        )?,
    };

    if auth.is_default_secret() {
        warnings.push(
            "JWT_SECRET_KEY is the built-in development key",
            Some("generate a random key of at least 32 bytes"),
        );
    } else if auth.jwt_secret.len() < MIN_RECOMMENDED_SECRET_LEN {
        warnings.push(
            format!(
                "JWT_SECRET_KEY is shorter than {MIN_RECOMMENDED_SECRET_LEN} bytes"
            ),
            None,
        );
    }
    if auth.access_token_hours == 0 {
        warnings.push(
            "JWT_EXPIRATION_HOURS is 0; access tokens expire as they are issued",
            None,
        );
    }
    if auth.refresh_token_days == 0 {
        warnings.push(
            "REFRESH_TOKEN_EXPIRATION_DAYS is 0; refresh tokens are never usable",
            None,
        );
    }
    if auth.is_default_pepper() {
        warnings.push(
            "PASSWORD_PEPPER is the built-in development pepper",
            Some("changing it later invalidates AUTH_PASSWORD_HASH"),
        );
    }
    if auth.login.is_none() {
        warnings.push(
            "no login account configured; /api/auth/login will reject every request",
            Some(
                "set AUTH_USERNAME, AUTH_USER_ID and AUTH_PASSWORD_HASH \
                 (see `userhub-server hash-password`)",
            ),
        );
    }

    Ok(ConfigLoad {
        config: Config {
            server,
            database,
            auth,
            metadata,
        },
        warnings,
    })
}

fn check_pool_bounds(db: &DatabaseConfig) -> Result<(), ConfigLoadError> {
    if db.max_connections == 0 {
        return Err(ConfigLoadError::InvalidPoolBounds(
            "DB_MAX_CONNECTIONS must be at least 1".into(),
        ));
    }
    if db.min_connections > db.max_connections {
        return Err(ConfigLoadError::InvalidPoolBounds(format!(
            "DB_MIN_CONNECTIONS ({}) exceeds DB_MAX_CONNECTIONS ({})",
            db.min_connections, db.max_connections
        )));
    }
    if db.min_connections > db.max_idle {
        return Err(ConfigLoadError::InvalidPoolBounds(format!(
            "DB_MIN_CONNECTIONS ({}) exceeds DB_MAX_IDLE ({})",
            db.min_connections, db.max_idle
        )));
    }
    Ok(())
}

fn token_lifetime(
    key: &'static str,
    value: Option<i64>,
    default: i64,
    max: i64,
) -> Result<i64, ConfigLoadError> {
    let reason = match value {
        None => return Ok(default),
        Some(v) if v < 0 => "must not be negative".to_string(),
        Some(v) if v > max => format!("must be at most {max}"),
        Some(v) => return Ok(v),
    };
    Err(ConfigLoadError::InvalidValue {
        key,
        value: value.map(|v| v.to_string()).unwrap_or_default(),
        reason,
    })
}

fn login_account(
    username: Option<String>,
    user_id: Option<i64>,
    password_hash: Option<String>,
) -> Result<Option<LoginAccount>, ConfigLoadError> {
    match (username, user_id, password_hash) {
        (Some(username), Some(user_id), Some(password_hash)) => {
            Ok(Some(LoginAccount {
                username,
                user_id,
                password_hash,
            }))
        }
        (None, None, None) => Ok(None),
        (username, user_id, password_hash) => {
            let missing: Vec<&str> = [
                ("AUTH_USERNAME", username.is_none()),
                ("AUTH_USER_ID", user_id.is_none()),
                ("AUTH_PASSWORD_HASH", password_hash.is_none()),
            ]
            .into_iter()
            .filter_map(|(key, absent)| absent.then_some(key))
            .collect();
            Err(ConfigLoadError::InvalidLoginAccount(format!(
                "missing {}",
                missing.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, time::Duration};

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ConfigLoad, ConfigLoadError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConfigLoader::new()
            .without_env_file()
            .load_with(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_match_documented_values() {
        let ConfigLoad { config, warnings } = load(&[]).unwrap();

        assert_eq!(config.server.bind_address(), "127.0.0.1:5000");
        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.port, 3306);
        assert_eq!(config.database.user, "root");
        assert_eq!(config.database.database, "mydb");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(
            config.database.acquire_timeout,
            Some(Duration::from_secs(30))
        );
        assert_eq!(config.auth.access_token_hours, 24);
        assert_eq!(config.auth.refresh_token_days, 7);
        assert!(config.auth.login.is_none());

        assert!(warnings.contains("JWT_SECRET_KEY"));
        assert!(warnings.contains("PASSWORD_PEPPER"));
        assert!(warnings.contains("no login account"));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let ConfigLoad { config, warnings } = load(&[
            ("SERVER_PORT", "8080"),
            ("DB_HOST", "db.internal"),
            ("DB_PASSWORD", "hunter2"),
            ("DB_MAX_CONNECTIONS", "4"),
            ("DB_MIN_CONNECTIONS", "0"),
            ("DB_ACQUIRE_TIMEOUT", "250ms"),
            ("DB_MAINTENANCE_INTERVAL", "0"),
            ("JWT_SECRET_KEY", "0123456789abcdef0123456789abcdef"),
            ("JWT_EXPIRATION_HOURS", "1"),
            ("PASSWORD_PEPPER", "pepper"),
            ("AUTH_USERNAME", "kaka"),
            ("AUTH_USER_ID", "266"),
            ("AUTH_PASSWORD_HASH", "$argon2id$stub"),
        ])
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(
            config.database.acquire_timeout,
            Some(Duration::from_millis(250))
        );
        assert_eq!(config.database.maintenance_interval, None);
        assert_eq!(config.auth.access_token_hours, 1);

        let login = config.auth.login.unwrap();
        assert_eq!(login.username, "kaka");
        assert_eq!(login.user_id, 266);
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = load(&[("DB_PORT", "mysql")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::InvalidValue { key: "DB_PORT", .. }
        ));
    }

    #[test]
    fn negative_ttl_is_rejected() {
        let err = load(&[("JWT_EXPIRATION_HOURS", "-1")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::InvalidValue {
                key: "JWT_EXPIRATION_HOURS",
                ..
            }
        ));
    }

    #[test]
    fn oversized_ttl_is_rejected() {
        let err =
            load(&[("JWT_EXPIRATION_HOURS", "2000000000000")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::InvalidValue {
                key: "JWT_EXPIRATION_HOURS",
                ..
            }
        ));

        let err =
            load(&[("REFRESH_TOKEN_EXPIRATION_DAYS", "3661")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::InvalidValue {
                key: "REFRESH_TOKEN_EXPIRATION_DAYS",
                ..
            }
        ));

        let ConfigLoad { config, .. } =
            load(&[("REFRESH_TOKEN_EXPIRATION_DAYS", "3660")]).unwrap();
        assert_eq!(config.auth.refresh_token_days, MAX_REFRESH_TOKEN_DAYS);
    }

    #[test]
    fn zero_access_ttl_is_flagged() {
        let ConfigLoad { config, warnings } =
            load(&[("JWT_EXPIRATION_HOURS", "0")]).unwrap();
        assert_eq!(config.auth.access_token_hours, 0);
        assert!(warnings.contains("JWT_EXPIRATION_HOURS is 0"));
    }

    #[test]
    fn inconsistent_pool_bounds_are_rejected() {
        let err =
            load(&[("DB_MAX_CONNECTIONS", "2"), ("DB_MIN_CONNECTIONS", "3")])
                .unwrap_err();
        assert!(matches!(err, ConfigLoadError::InvalidPoolBounds(_)));

        let err =
            load(&[("DB_MAX_CONNECTIONS", "0"), ("DB_MIN_CONNECTIONS", "0")])
                .unwrap_err();
        assert!(matches!(err, ConfigLoadError::InvalidPoolBounds(_)));
    }

    #[test]
    fn partial_login_account_names_missing_keys() {
        let err = load(&[("AUTH_USERNAME", "kaka")]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("AUTH_USER_ID"));
        assert!(message.contains("AUTH_PASSWORD_HASH"));
        assert!(!message.contains("AUTH_USERNAME,"));
    }

    #[test]
    fn env_file_fills_gaps_but_process_env_wins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DB_DATABASE=from_file").unwrap();
        writeln!(file, "SERVER_PORT=7000").unwrap();

        let ConfigLoad { config, .. } = ConfigLoader::new()
            .with_env_file(file.path())
            .load_with(|key| (key == "SERVER_PORT").then(|| "9000".to_string()))
            .unwrap();

        assert_eq!(config.database.database, "from_file");
        assert_eq!(config.server.port, 9000);
        assert!(config.metadata.env_file_loaded);
    }

    #[test]
    fn missing_explicit_env_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::new()
            .with_env_file(dir.path().join("absent.env"))
            .load_with(|_| None)
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::EnvFile { .. }));
    }
}
