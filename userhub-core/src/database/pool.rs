use std::{
    collections::VecDeque,
    fmt,
    ops::{Deref, DerefMut},
    sync::Arc,
    time::Duration,
};

use parking_lot::Mutex;
use tokio::{
    sync::{OwnedSemaphorePermit, Semaphore},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{errors::PoolError, manager::ConnectionManager};

/// Sizing and timing knobs for a [`ConnectionPool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Upper bound on connections loaned out at the same time.
    pub max_connections: usize,
    /// Idle connections opened at startup and restored by maintenance.
    pub min_connections: usize,
    /// Idle connections retained on release; extras are closed.
    pub max_idle: usize,
    /// How long `acquire` may wait for a free slot. `None` waits forever.
    pub acquire_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
            max_idle: 5,
            acquire_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_connections == 0 {
            return Err(PoolError::InvalidConfig(
                "max_connections must be at least 1".into(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(PoolError::InvalidConfig(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        if self.min_connections > self.max_idle {
            return Err(PoolError::InvalidConfig(format!(
                "min_connections ({}) exceeds max_idle ({})",
                self.min_connections, self.max_idle
            )));
        }
        Ok(())
    }
}

/// Point-in-time view of the pool for health checks and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PoolStats {
    pub idle: usize,
    pub loaned: usize,
    pub max_connections: usize,
    pub min_connections: usize,
    pub max_idle: usize,
}

struct PoolState<C> {
    idle: VecDeque<C>,
    loaned: usize,
    closed: bool,
}

struct PoolInner<M: ConnectionManager> {
    manager: M,
    config: PoolConfig,
    state: Mutex<PoolState<M::Connection>>,
    /// One permit per loanable connection; closed on shutdown to wake
    /// waiters.
    permits: Arc<Semaphore>,
}

impl<M: ConnectionManager> PoolInner<M> {
    /// Put a returned connection back in the idle set. Hands the connection
    /// back when it has to be closed instead.
    fn check_in(&self, conn: M::Connection) -> Option<M::Connection> {
        let mut state = self.state.lock();
        state.loaned = state.loaned.saturating_sub(1);
        if state.closed || state.idle.len() >= self.config.max_idle {
            Some(conn)
        } else {
            state.idle.push_back(conn);
            None
        }
    }

    /// Close a connection from a synchronous context.
    fn close_detached(self: &Arc<Self>, conn: M::Connection) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let inner = Arc::clone(self);
                handle.spawn(async move {
                    inner.manager.close(conn).await;
                });
            }
            Err(_) => drop(conn),
        }
    }
}

/// Bounded pool lending connections produced by a [`ConnectionManager`].
///
/// At most `max_connections` connections are loaned at once; further
/// `acquire` calls wait for a release. Idle connections are probed before
/// reuse and silently replaced when dead. Cloning is cheap and every clone
/// shares the same pool.
pub struct ConnectionPool<M: ConnectionManager> {
    inner: Arc<PoolInner<M>>,
}

impl<M: ConnectionManager> Clone for ConnectionPool<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: ConnectionManager> fmt::Debug for ConnectionPool<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl<M: ConnectionManager> ConnectionPool<M> {
    /// Build a pool and pre-open `min_connections` idle connections.
    pub async fn connect(
        manager: M,
        config: PoolConfig,
    ) -> Result<Self, PoolError> {
        config.validate()?;

        let pool = Self {
            inner: Arc::new(PoolInner {
                permits: Arc::new(Semaphore::new(config.max_connections)),
                state: Mutex::new(PoolState {
                    idle: VecDeque::with_capacity(config.max_idle),
                    loaned: 0,
                    closed: false,
                }),
                manager,
                config,
            }),
        };
        pool.warm_up().await?;

        info!(
            max_connections = pool.inner.config.max_connections,
            min_connections = pool.inner.config.min_connections,
            max_idle = pool.inner.config.max_idle,
            "connection pool initialized"
        );
        Ok(pool)
    }

    async fn warm_up(&self) -> Result<(), PoolError> {
        let wanted = self.inner.config.min_connections;
        let mut fresh = Vec::with_capacity(wanted);
        for _ in 0..wanted {
            match self.inner.manager.connect().await {
                Ok(conn) => fresh.push(conn),
                Err(err) => {
                    for conn in fresh {
                        self.inner.manager.close(conn).await;
                    }
                    return Err(PoolError::Connect(Box::new(err)));
                }
            }
        }

        self.inner.state.lock().idle.extend(fresh);
        Ok(())
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    pub fn manager(&self) -> &M {
        &self.inner.manager
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock();
        PoolStats {
            idle: state.idle.len(),
            loaned: state.loaned,
            max_connections: self.inner.config.max_connections,
            min_connections: self.inner.config.min_connections,
            max_idle: self.inner.config.max_idle,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Borrow a connection, waiting while all `max_connections` are loaned.
    ///
    /// The returned guard gives the connection back when dropped.
    pub async fn acquire(&self) -> Result<PooledConnection<M>, PoolError> {
        let permit = self.wait_for_permit().await?;
        self.checkout(permit).await
    }

    /// [`acquire`](Self::acquire) that gives up with
    /// [`PoolError::Cancelled`] once `cancel` fires.
    pub async fn acquire_cancellable(
        &self,
        cancel: &CancellationToken,
    ) -> Result<PooledConnection<M>, PoolError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PoolError::Cancelled),
            result = self.acquire() => result,
        }
    }

    async fn wait_for_permit(&self) -> Result<OwnedSemaphorePermit, PoolError> {
        let acquire = Arc::clone(&self.inner.permits).acquire_owned();
        let permit = match self.inner.config.acquire_timeout {
            Some(limit) => tokio::time::timeout(limit, acquire)
                .await
                .map_err(|_| PoolError::Timeout(limit))?,
            None => acquire.await,
        };
        permit.map_err(|_| PoolError::Closed)
    }

    async fn checkout(
        &self,
        permit: OwnedSemaphorePermit,
    ) -> Result<PooledConnection<M>, PoolError> {
        let idle = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(PoolError::Closed);
            }
            state.idle.pop_back()
        };

        let manager = &self.inner.manager;
        let conn = match idle {
            Some(conn) => {
                let mut probe = IdleProbe {
                    conn: Some(conn),
                    pool: &self.inner,
                };
                let alive = probe.run().await;
                match probe.into_inner() {
                    Some(conn) if alive => conn,
                    stale => {
                        warn!(
                            "pooled connection failed liveness probe, replacing"
                        );
                        if let Some(conn) = stale {
                            manager.close(conn).await;
                        }
                        manager.connect().await.map_err(|err| {
                            PoolError::ConnectionDead(Box::new(err))
                        })?
                    }
                }
            }
            None => manager
                .connect()
                .await
                .map_err(|err| PoolError::Connect(Box::new(err)))?,
        };

        let closed = {
            let mut state = self.inner.state.lock();
            if !state.closed {
                state.loaned += 1;
            }
            state.closed
        };
        if closed {
            manager.close(conn).await;
            return Err(PoolError::Closed);
        }

        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }

    /// Return a connection and, if the idle set is full, close it before
    /// returning.
    pub async fn release(&self, conn: PooledConnection<M>) {
        conn.release().await;
    }

    /// Close every idle connection and refuse further acquisitions.
    ///
    /// Callers blocked in `acquire` fail with [`PoolError::Closed`];
    /// connections still on loan are closed as they come back.
    pub async fn shutdown(&self) {
        let (drained, in_flight) = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            (state.idle.drain(..).collect::<Vec<_>>(), state.loaned)
        };
        self.inner.permits.close();

        let closed = drained.len();
        for conn in drained {
            self.inner.manager.close(conn).await;
        }
        info!(closed, in_flight, "connection pool shut down");
    }

    /// Probe idle connections, drop the dead ones and reopen up to
    /// `min_connections`.
    pub async fn maintain(&self) {
        let candidates: Vec<M::Connection> = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return;
            }
            state.idle.drain(..).collect()
        };

        let manager = &self.inner.manager;
        let mut healthy = Vec::with_capacity(candidates.len());
        let mut evicted = 0usize;
        for mut conn in candidates {
            if manager.is_alive(&mut conn).await {
                healthy.push(conn);
            } else {
                evicted += 1;
                manager.close(conn).await;
            }
        }

        let mut opened = 0usize;
        while healthy.len() < self.inner.config.min_connections {
            match manager.connect().await {
                Ok(conn) => {
                    healthy.push(conn);
                    opened += 1;
                }
                Err(err) => {
                    warn!(error = %err, "failed to replenish idle connections");
                    break;
                }
            }
        }

        let surplus: Vec<M::Connection> = {
            let mut state = self.inner.state.lock();
            if state.closed {
                healthy
            } else {
                let mut surplus = Vec::new();
                for conn in healthy {
                    if state.idle.len() < self.inner.config.max_idle {
                        state.idle.push_back(conn);
                    } else {
                        surplus.push(conn);
                    }
                }
                surplus
            }
        };
        for conn in surplus {
            manager.close(conn).await;
        }

        if evicted > 0 || opened > 0 {
            debug!(evicted, opened, "pool maintenance pass");
        }
    }

    /// Run [`maintain`](Self::maintain) every `period` until the pool is
    /// shut down or dropped.
    pub fn spawn_maintenance(&self, period: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                let pool = ConnectionPool { inner };
                if pool.is_closed() {
                    break;
                }
                pool.maintain().await;
            }
        })
    }
}

/// An idle connection taken out for its liveness probe.
///
/// If the acquiring future is dropped mid-probe the connection is closed
/// through the manager. It is never put back: a half-finished probe may
/// leave the session in an unknown protocol state.
struct IdleProbe<'a, M: ConnectionManager> {
    conn: Option<M::Connection>,
    pool: &'a Arc<PoolInner<M>>,
}

impl<M: ConnectionManager> IdleProbe<'_, M> {
    async fn run(&mut self) -> bool {
        match self.conn.as_mut() {
            Some(conn) => self.pool.manager.is_alive(conn).await,
            None => false,
        }
    }

    fn into_inner(mut self) -> Option<M::Connection> {
        self.conn.take()
    }
}

impl<M: ConnectionManager> Drop for IdleProbe<'_, M> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            debug!("acquire dropped mid-probe; closing idle connection");
            self.pool.close_detached(conn);
        }
    }
}

/// A connection on loan from a [`ConnectionPool`].
///
/// Dereferences to the underlying connection. Dropping the guard returns the
/// connection on every exit path, including early returns and panics.
pub struct PooledConnection<M: ConnectionManager> {
    conn: Option<M::Connection>,
    pool: Arc<PoolInner<M>>,
    // Released after `conn` is checked back in.
    _permit: OwnedSemaphorePermit,
}

impl<M: ConnectionManager> PooledConnection<M> {
    /// Explicit form of drop that awaits closing an overflow connection.
    pub async fn release(mut self) {
        let Some(conn) = self.conn.take() else { return };
        let pool = Arc::clone(&self.pool);
        let overflow = pool.check_in(conn);
        drop(self);
        if let Some(conn) = overflow {
            pool.manager.close(conn).await;
        }
    }
}

impl<M: ConnectionManager> Deref for PooledConnection<M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        self.conn
            .as_ref()
            .expect("pooled connection is present until release")
    }
}

impl<M: ConnectionManager> DerefMut for PooledConnection<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn
            .as_mut()
            .expect("pooled connection is present until release")
    }
}

impl<M: ConnectionManager> Drop for PooledConnection<M> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take()
            && let Some(overflow) = self.pool.check_in(conn)
        {
            self.pool.close_detached(overflow);
        }
    }
}

impl<M: ConnectionManager> fmt::Debug for PooledConnection<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("checked_out", &self.conn.is_some())
            .finish_non_exhaustive()
    }
}
