use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    handlers::{auth, health::health, users},
    middleware::auth_middleware,
};

/// The complete application: public auth and health routes plus the
/// bearer-protected user routes.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh", post(auth::refresh))
        .merge(create_user_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn create_user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/user/list", get(users::list_users))
        .route("/api/user/add", post(users::add_user))
        .route("/api/user/update/{id}", put(users::update_user))
        .route("/api/user/delete/{id}", delete(users::delete_user))
        .route("/api/user/{id}", get(users::get_user))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
