use axum::{Json, extract::State};
use tracing::{error, info, warn};
use zeroize::Zeroizing;

use crate::{
    AppState,
    api_types::{
        ApiResponse, LoginRequest, LoginResponse, RefreshRequest,
        RefreshResponse,
    },
    errors::{AppError, AppResult},
};

const MAX_CREDENTIAL_LEN: usize = 50;

/// Exchange the configured account's credentials for an access/refresh pair.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let LoginRequest { username, password } = request;
    let password = Zeroizing::new(password);

    for (field, value) in [("username", &username), ("password", &*password)] {
        if value.is_empty() || value.chars().count() > MAX_CREDENTIAL_LEN {
            return Err(AppError::bad_request(format!(
                "{field} must be 1-{MAX_CREDENTIAL_LEN} characters"
            )));
        }
    }

    let Some(account) = state.config.auth.login.clone() else {
        warn!("login attempted but no login account is configured");
        return Err(AppError::unauthorized());
    };

    // Verify even for an unknown username so both paths cost the same.
    let crypto = state.auth_crypto.clone();
    let hash = account.password_hash.clone();
    let password_ok = tokio::task::spawn_blocking(move || {
        crypto.verify_password(&password, &hash)
    })
    .await
    .map_err(|err| {
        error!(error = %err, "password verification task failed");
        AppError::internal("login failed")
    })?
    .map_err(|err| {
        error!(error = %err, "configured password hash is unusable");
        AppError::internal("login is misconfigured")
    })?;

    if !password_ok || username != account.username {
        info!(username = %username, "login rejected");
        return Err(AppError::unauthorized());
    }

    let tokens = state.tokens.issue_pair(account.user_id, &account.username)?;
    info!(user_id = account.user_id, "login succeeded");

    Ok(Json(
        ApiResponse::success(LoginResponse {
            user_id: account.user_id,
            username: account.username,
            tokens,
        })
        .with_message("login successful"),
    ))
}

/// Mint a new access token. The refresh token stays valid until it expires.
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<RefreshResponse>>> {
    let access_token = state.tokens.refresh(request.refresh_token.trim())?;

    Ok(Json(ApiResponse::success(RefreshResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.ttl().access.num_seconds(),
    })))
}
