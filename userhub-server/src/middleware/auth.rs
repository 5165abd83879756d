use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;
use userhub_core::authenticate;

use crate::{AppState, errors::AppError};

/// Rejects requests without a valid access token and hands the verified
/// identity to handlers as `Extension<AuthenticatedIdentity>`.
///
/// Every failure produces the same 401 response; the cause is only logged.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // a non-UTF-8 header counts as missing
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let identity =
        authenticate(authorization, &state.tokens).map_err(|err| {
            debug!(
                error = %err,
                path = %request.uri().path(),
                "rejected unauthenticated request"
            );
            AppError::unauthorized()
        })?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
