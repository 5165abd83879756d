use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, warn};
use userhub_core::{AuthError, DbError, TokenError};

use crate::api_types::ApiResponse;

pub type AppResult<T> = Result<T, AppError>;

/// Body of every authentication failure. Callers never learn which check
/// failed.
pub const UNAUTHORIZED_MESSAGE: &str = "invalid or missing credentials";

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ApiResponse::<()>::error(self.message));
        (self.status, body).into_response()
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        if err.is_unique_violation() {
            debug!(error = %err, "duplicate record rejected");
            return Self::conflict("a record with the same key already exists");
        }
        if err.is_acquisition_failure() {
            warn!(
                error = %err,
                retryable = err.is_retryable(),
                "no database connection available"
            );
            return Self::service_unavailable(
                "database temporarily unavailable",
            );
        }
        error!(error = %err, "database operation failed");
        Self::internal("database operation failed")
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        debug!(error = %err, "authentication failed");
        Self::unauthorized()
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encode(_)
            | TokenError::EmptySecret
            | TokenError::TtlOutOfRange => {
                error!(error = %err, "token issuance failed");
                Self::internal("failed to issue token")
            }
            other => {
                debug!(error = %other, "token rejected");
                Self::unauthorized()
            }
        }
    }
}
