use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use userhub_config::{Config, DatabaseConfig};
use userhub_core::{
    AuthCrypto, MySqlConnectionManager, PoolConfig, QueryExecutor,
    TokenService, TokenTtl,
};

use super::app_state::{AppState, MySqlPoolSlot};

pub fn pool_config(db: &DatabaseConfig) -> PoolConfig {
    PoolConfig {
        max_connections: db.max_connections,
        min_connections: db.min_connections,
        max_idle: db.max_idle,
        acquire_timeout: db.acquire_timeout,
    }
}

pub fn connection_manager(db: &DatabaseConfig) -> MySqlConnectionManager {
    MySqlConnectionManager::from_parts(
        &db.host,
        db.port,
        &db.user,
        &db.password,
        &db.database,
    )
}

pub fn token_service(config: &Config) -> anyhow::Result<TokenService> {
    let ttl = TokenTtl::new(
        config.auth.access_token_hours,
        config.auth.refresh_token_days,
    )
    .context("invalid token lifetime")?;
    TokenService::new(&config.auth.jwt_secret, ttl)
        .context("invalid JWT configuration")
}

/// Open the pool through `slot` and assemble the shared handler state.
pub async fn build_app_state(
    config: Arc<Config>,
    slot: Arc<MySqlPoolSlot>,
) -> anyhow::Result<AppState> {
    let auth_crypto = Arc::new(
        AuthCrypto::new(&config.auth.password_pepper)
            .context("invalid password pepper")?,
    );
    build_app_state_with_crypto(config, slot, auth_crypto).await
}

/// Like [`build_app_state`] with caller-supplied password hashing, so tests
/// can use cheap Argon2 parameters.
pub async fn build_app_state_with_crypto(
    config: Arc<Config>,
    slot: Arc<MySqlPoolSlot>,
    auth_crypto: Arc<AuthCrypto>,
) -> anyhow::Result<AppState> {
    let tokens = Arc::new(token_service(&config)?);

    let manager = connection_manager(&config.database);
    let target = manager.target().to_string();
    let pool = slot
        .initialize(manager, pool_config(&config.database))
        .await
        .with_context(|| {
            format!("failed to open connection pool to {target}")
        })?;

    let stats = pool.stats();
    info!(
        db = %target,
        idle = stats.idle,
        max_connections = stats.max_connections,
        "MySQL connection pool ready"
    );

    Ok(AppState {
        executor: QueryExecutor::new(pool),
        tokens,
        auth_crypto,
        config,
        pool_slot: slot,
    })
}
