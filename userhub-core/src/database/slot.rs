use std::fmt;

use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{
    errors::PoolError,
    manager::ConnectionManager,
    pool::{ConnectionPool, PoolConfig},
};

/// Holder for the single connection pool a process is allowed to run.
///
/// The slot is created once at startup and shared through application state.
/// `initialize` on an occupied slot returns the existing pool and ignores the
/// new arguments; `shutdown` closes the pool and empties the slot so a later
/// `initialize` builds a fresh one.
pub struct PoolSlot<M: ConnectionManager> {
    current: Mutex<Option<ConnectionPool<M>>>,
}

impl<M: ConnectionManager> Default for PoolSlot<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: ConnectionManager> fmt::Debug for PoolSlot<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let initialized = self
            .current
            .try_lock()
            .map(|guard| guard.is_some())
            .ok();
        f.debug_struct("PoolSlot")
            .field("initialized", &initialized)
            .finish()
    }
}

impl<M: ConnectionManager> PoolSlot<M> {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    pub async fn initialize(
        &self,
        manager: M,
        config: PoolConfig,
    ) -> Result<ConnectionPool<M>, PoolError> {
        let mut current = self.current.lock().await;
        if let Some(pool) = current.as_ref() {
            warn!("connection pool already initialized; keeping existing pool");
            return Ok(pool.clone());
        }

        let pool = ConnectionPool::connect(manager, config).await?;
        *current = Some(pool.clone());
        Ok(pool)
    }

    pub async fn get(&self) -> Option<ConnectionPool<M>> {
        self.current.lock().await.clone()
    }

    pub async fn is_initialized(&self) -> bool {
        self.current.lock().await.is_some()
    }

    pub async fn shutdown(&self) {
        let pool = self.current.lock().await.take();
        match pool {
            Some(pool) => pool.shutdown().await,
            None => {
                info!("connection pool shutdown requested but none running")
            }
        }
    }
}
