//! Core library for userhub.
//!
//! Two subsystems live here:
//!
//! - [`auth`]: HS256 access/refresh token issuance and verification, the
//!   bearer-credential guard used by the HTTP middleware, and Argon2id
//!   password hashing for the login account.
//! - [`database`]: a bounded connection pool with liveness probing, the
//!   per-process [`database::PoolSlot`], and the [`database::QueryExecutor`]
//!   that runs parameterized SQL in auto-commit or transactional mode.

pub mod auth;
pub mod database;

pub use auth::{
    AuthCrypto, AuthCryptoError, AuthError, AuthenticatedIdentity, Claims,
    TokenError, TokenKind, TokenPair, TokenService, TokenTtl, authenticate,
};
pub use database::{
    BatchResult, ConnectionManager, ConnectionPool, DbError, ExecuteResult,
    MIGRATOR, MySqlConnectionManager, PoolConfig, PoolError, PoolSlot,
    PoolStats, PooledConnection, QueryExecutor, Row,
};
