#![cfg(feature = "e2e")]

mod common;

use std::sync::Arc;

use axum::{
    Router,
    http::{Method, StatusCode},
};
use serde_json::json;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use userhub_core::{
    MySqlConnectionManager, PoolConfig, QueryExecutor, TokenKind,
    TokenService, TokenTtl,
};
use userhub_server::{
    AppState, infra::app_state::MySqlPoolSlot, routes::create_app,
};

use common::{USER_ID, USERNAME, fast_crypto, request, send, test_config};

async fn app(opts: MySqlConnectOptions) -> (Router, String) {
    let crypto = fast_crypto();
    let config = test_config(&crypto);
    let tokens = TokenService::new("user-routes-secret", TokenTtl::default())
        .unwrap();
    let access = tokens.issue(USER_ID, USERNAME, TokenKind::Access).unwrap();

    let slot = Arc::new(MySqlPoolSlot::new());
    let pool = slot
        .initialize(
            MySqlConnectionManager::new(opts, "sqlx-test"),
            PoolConfig {
                max_connections: 4,
                min_connections: 1,
                max_idle: 2,
                ..PoolConfig::default()
            },
        )
        .await
        .unwrap();

    let state = AppState {
        executor: QueryExecutor::new(pool),
        tokens: Arc::new(tokens),
        auth_crypto: Arc::new(crypto),
        config: Arc::new(config),
        pool_slot: slot,
    };
    (create_app(state), access)
}

#[sqlx::test(migrator = "userhub_core::MIGRATOR")]
async fn user_lifecycle(_pool: MySqlPoolOptions, opts: MySqlConnectOptions) {
    let (router, token) = app(opts).await;
    let bearer = Some(token.as_str());

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            "/api/user/add",
            Some(json!({
                "name": "ann",
                "email": "ann@example.com",
                "mobile": "13800138000",
                "userid": "u-1",
            })),
            bearer,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let id = body["data"]["id"].as_u64().unwrap();

    let (status, body) = send(
        &router,
        request(Method::GET, &format!("/api/user/{id}"), None, bearer),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], json!("ann@example.com"));

    let (status, _) = send(
        &router,
        request(
            Method::PUT,
            &format!("/api/user/update/{id}"),
            Some(json!({"name": "anne"})),
            bearer,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) =
        send(&router, request(Method::GET, "/api/user/list", None, bearer))
            .await;
    assert_eq!(body["data"], json!([{"id": id, "name": "anne"}]));

    let (status, _) = send(
        &router,
        request(
            Method::DELETE,
            &format!("/api/user/delete/{id}"),
            None,
            bearer,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // soft delete: gone from the list, row still readable
    let (_, body) =
        send(&router, request(Method::GET, "/api/user/list", None, bearer))
            .await;
    assert_eq!(body["data"], json!([]));
    let (status, body) = send(
        &router,
        request(Method::GET, &format!("/api/user/{id}"), None, bearer),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!(7));
}

#[sqlx::test(migrator = "userhub_core::MIGRATOR")]
async fn missing_users_are_not_found(
    _pool: MySqlPoolOptions,
    opts: MySqlConnectOptions,
) {
    let (router, token) = app(opts).await;
    let bearer = Some(token.as_str());

    for (method, uri, body) in [
        (Method::GET, "/api/user/404", None),
        (Method::PUT, "/api/user/update/404", Some(json!({"name": "x"}))),
        (Method::DELETE, "/api/user/delete/404", None),
    ] {
        let (status, _) =
            send(&router, request(method, uri, body, bearer)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
}

#[sqlx::test(migrator = "userhub_core::MIGRATOR")]
async fn duplicate_userid_conflicts(
    _pool: MySqlPoolOptions,
    opts: MySqlConnectOptions,
) {
    let (router, token) = app(opts).await;
    let user = json!({
        "name": "ann",
        "email": "ann@example.com",
        "userid": "u-1",
    });

    let (first, _) = send(
        &router,
        request(
            Method::POST,
            "/api/user/add",
            Some(user.clone()),
            Some(&token),
        ),
    )
    .await;
    let (second, _) = send(
        &router,
        request(Method::POST, "/api/user/add", Some(user), Some(&token)),
    )
    .await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::CONFLICT);
}
