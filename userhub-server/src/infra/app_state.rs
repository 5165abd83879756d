use std::{fmt, sync::Arc};

use userhub_config::Config;
use userhub_core::{
    AuthCrypto, MySqlConnectionManager, PoolSlot, QueryExecutor, TokenService,
};

pub type MySqlPoolSlot = PoolSlot<MySqlConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub executor: QueryExecutor,
    pub tokens: Arc<TokenService>,
    pub auth_crypto: Arc<AuthCrypto>,
    pub config: Arc<Config>,
    /// Owner of the process-wide pool; shut down after the server drains.
    pub pool_slot: Arc<MySqlPoolSlot>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("pool", &self.executor.stats())
            .finish_non_exhaustive()
    }
}
