use std::{collections::HashMap, sync::Arc};

use argon2::ParamsBuilder;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt;
use userhub_config::{Config, ConfigLoad, ConfigLoader};
use userhub_core::AuthCrypto;
use userhub_server::{
    AppState,
    infra::{app_state::MySqlPoolSlot, startup::build_app_state_with_crypto},
    routes::create_app,
};

#[allow(unused)]
pub const USERNAME: &str = "kaka";
#[allow(unused)]
pub const PASSWORD: &str = "kaka22_jj";
#[allow(unused)]
pub const USER_ID: i64 = 266;
pub const PEPPER: &str = "test-pepper";

// Code is used by test modules, but not in this scope
#[allow(unused)]
#[derive(Debug)]
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub fn fast_crypto() -> AuthCrypto {
    let params = ParamsBuilder::new()
        .m_cost(8 * 1024)
        .t_cost(1)
        .p_cost(1)
        .build()
        .unwrap();
    AuthCrypto::with_params(PEPPER, params).unwrap()
}

/// Configuration for the test account. The database points at a closed
/// port so anything that reaches it fails with 503.
#[allow(unused)]
pub fn test_config(crypto: &AuthCrypto) -> Config {
    let hash = crypto.hash_password(PASSWORD).unwrap();
    let vars: HashMap<&str, String> = [
        ("DB_HOST", "127.0.0.1".to_string()),
        ("DB_PORT", "1".to_string()),
        ("DB_MIN_CONNECTIONS", "0".to_string()),
        ("DB_ACQUIRE_TIMEOUT", "2s".to_string()),
        ("JWT_SECRET_KEY", "router-test-secret-0123456789abcdef".to_string()),
        ("PASSWORD_PEPPER", PEPPER.to_string()),
        ("AUTH_USERNAME", USERNAME.to_string()),
        ("AUTH_USER_ID", USER_ID.to_string()),
        ("AUTH_PASSWORD_HASH", hash),
    ]
    .into_iter()
    .collect();

    let ConfigLoad { config, .. } = ConfigLoader::new()
        .without_env_file()
        .load_with(|key| vars.get(key).cloned())
        .unwrap();
    config
}

#[allow(unused)]
pub async fn build_test_app() -> TestApp {
    let crypto = fast_crypto();
    let config = test_config(&crypto);
    let state = build_app_state_with_crypto(
        Arc::new(config),
        Arc::new(MySqlPoolSlot::new()),
        Arc::new(crypto),
    )
    .await
    .unwrap();

    TestApp {
        router: create_app(state.clone()),
        state,
    }
}

#[allow(unused)]
pub fn request(
    method: Method,
    uri: &str,
    body: Option<Value>,
    bearer: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder =
            builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Run one request; a non-JSON body comes back as `Value::Null`.
#[allow(unused)]
pub async fn send(
    router: &Router,
    request: Request<Body>,
) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}
