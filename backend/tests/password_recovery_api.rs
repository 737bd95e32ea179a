use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use chrono::{Duration, Utc};
use quarterdeck_backend::{
    handlers, middleware,
    models::account::{Account, AccountRole},
    repositories::account as account_repo,
    state::AppState,
    utils::recovery::{generate_recovery_token, hash_recovery_token},
};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

mod support;

use support::{
    open_session, seed_account_with_password, test_config, try_test_pool, TEST_PASSWORD,
};

const NEW_PASSWORD: &str = "Fr3shSecretPass9";

async fn integration_guard() -> tokio::sync::MutexGuard<'static, ()> {
    static GUARD: std::sync::OnceLock<tokio::sync::Mutex<()>> = std::sync::OnceLock::new();
    GUARD.get_or_init(|| tokio::sync::Mutex::new(())).lock().await
}

fn recovery_router(pool: PgPool) -> Router {
    let state = AppState::new(pool, test_config());
    let public = Router::new()
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route(
            "/api/v1/auth/password-reset/request",
            post(handlers::password::password_reset_request),
        )
        .route(
            "/api/v1/auth/password-reset/confirm",
            post(handlers::password::password_reset_confirm),
        );
    let protected = Router::new()
        .route("/api/v1/auth/me", get(handlers::auth::me))
        .route(
            "/api/v1/auth/change-password",
            post(handlers::password::change_password),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(axum_middleware::from_fn(middleware::request_id::request_id))
        .with_state(state)
}

fn post_json(uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn post_json_with_bearer(uri: &str, token: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Plants a reset token the way the request handler would, returning the
/// plaintext a user would receive by email.
async fn plant_reset_token(pool: &PgPool, account: &Account, sent_at: chrono::DateTime<Utc>) -> String {
    let token = generate_recovery_token();
    let token_hash = hash_recovery_token(&token);
    let mut tx = pool.begin().await.expect("begin");
    account_repo::set_password_reset_token(&mut tx, account.id, &token_hash, sent_at)
        .await
        .expect("set reset token");
    tx.commit().await.expect("commit");
    token
}

#[tokio::test]
async fn test_reset_request_is_silent_about_account_existence() {
    let _guard = integration_guard().await;
    let Some(pool) = try_test_pool().await else { return };

    let account = seed_account_with_password(&pool, AccountRole::Viewer, TEST_PASSWORD).await;
    let app = recovery_router(pool.clone());

    let known = app
        .clone()
        .oneshot(post_json(
            "/api/v1/auth/password-reset/request",
            &json!({ "email": account.email }),
        ))
        .await
        .unwrap();
    assert_eq!(known.status(), StatusCode::OK);
    let known_body = response_json(known).await;

    let unknown = app
        .oneshot(post_json(
            "/api/v1/auth/password-reset/request",
            &json!({ "email": "whoisthis@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::OK);
    let unknown_body = response_json(unknown).await;

    assert_eq!(known_body, unknown_body);

    // The known account actually got a pending token.
    let pending: Option<String> =
        sqlx::query_scalar("SELECT password_reset_token_hash FROM accounts WHERE id = $1")
            .bind(account.id)
            .fetch_one(&pool)
            .await
            .expect("read reset hash");
    assert!(pending.is_some());
}

#[tokio::test]
async fn test_reset_confirm_replaces_password_and_revokes_every_session() {
    let _guard = integration_guard().await;
    let Some(pool) = try_test_pool().await else { return };

    let config = test_config();
    let account = seed_account_with_password(&pool, AccountRole::Viewer, TEST_PASSWORD).await;
    let first = open_session(&pool, &config, &account).await;
    let second = open_session(&pool, &config, &account).await;
    let token = plant_reset_token(&pool, &account, Utc::now()).await;
    let app = recovery_router(pool);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/auth/password-reset/confirm",
            &json!({ "token": token, "new_password": NEW_PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Global logout: both sessions are gone.
    for session in [&first, &second] {
        let response = app
            .clone()
            .oneshot(get_with_bearer("/api/v1/auth/me", &session.access_token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let stale_login = app
        .clone()
        .oneshot(post_json(
            "/api/v1/auth/login",
            &json!({ "email": account.email, "password": TEST_PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(stale_login.status(), StatusCode::UNAUTHORIZED);

    let fresh_login = app
        .oneshot(post_json(
            "/api/v1/auth/login",
            &json!({ "email": account.email, "password": NEW_PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(fresh_login.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_reset_token_is_single_use() {
    let _guard = integration_guard().await;
    let Some(pool) = try_test_pool().await else { return };

    let account = seed_account_with_password(&pool, AccountRole::Viewer, TEST_PASSWORD).await;
    let token = plant_reset_token(&pool, &account, Utc::now()).await;
    let app = recovery_router(pool);

    let payload = json!({ "token": token, "new_password": NEW_PASSWORD });
    let response = app
        .clone()
        .oneshot(post_json("/api/v1/auth/password-reset/confirm", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let replay = app
        .oneshot(post_json("/api/v1/auth/password-reset/confirm", &payload))
        .await
        .unwrap();
    assert_eq!(replay.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_confirm_rejects_unknown_token() {
    let _guard = integration_guard().await;
    let Some(pool) = try_test_pool().await else { return };

    let app = recovery_router(pool);
    let response = app
        .oneshot(post_json(
            "/api/v1/auth/password-reset/confirm",
            &json!({
                "token": "deadbeefdeadbeefdeadbeefdeadbeefdeadbeef",
                "new_password": NEW_PASSWORD,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Invalid or expired reset token");
}

#[tokio::test]
async fn test_reset_confirm_rejects_expired_token() {
    let _guard = integration_guard().await;
    let Some(pool) = try_test_pool().await else { return };

    let account = seed_account_with_password(&pool, AccountRole::Viewer, TEST_PASSWORD).await;
    let sent_at = Utc::now() - Duration::hours(25);
    let token = plant_reset_token(&pool, &account, sent_at).await;
    let app = recovery_router(pool);

    let response = app
        .oneshot(post_json(
            "/api/v1/auth/password-reset/confirm",
            &json!({ "token": token, "new_password": NEW_PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Invalid or expired reset token");
}

#[tokio::test]
async fn test_change_password_spares_other_sessions() {
    let _guard = integration_guard().await;
    let Some(pool) = try_test_pool().await else { return };

    let config = test_config();
    let account = seed_account_with_password(&pool, AccountRole::Viewer, TEST_PASSWORD).await;
    let caller = open_session(&pool, &config, &account).await;
    let other = open_session(&pool, &config, &account).await;
    let app = recovery_router(pool);

    let response = app
        .clone()
        .oneshot(post_json_with_bearer(
            "/api/v1/auth/change-password",
            &caller.access_token,
            &json!({
                "current_password": TEST_PASSWORD,
                "new_password": NEW_PASSWORD,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A deliberate password change keeps every session alive, unlike a
    // reset through the recovery flow.
    for session in [&caller, &other] {
        let response = app
            .clone()
            .oneshot(get_with_bearer("/api/v1/auth/me", &session.access_token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let fresh_login = app
        .oneshot(post_json(
            "/api/v1/auth/login",
            &json!({ "email": account.email, "password": NEW_PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(fresh_login.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_change_password_rejects_wrong_current_password() {
    let _guard = integration_guard().await;
    let Some(pool) = try_test_pool().await else { return };

    let config = test_config();
    let account = seed_account_with_password(&pool, AccountRole::Viewer, TEST_PASSWORD).await;
    let caller = open_session(&pool, &config, &account).await;
    let app = recovery_router(pool);

    let response = app
        .oneshot(post_json_with_bearer(
            "/api/v1/auth/change-password",
            &caller.access_token,
            &json!({
                "current_password": "NotMyPassword1!",
                "new_password": NEW_PASSWORD,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Current password is incorrect");
}
