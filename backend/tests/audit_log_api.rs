use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use chrono::{Duration, SecondsFormat, Utc};
use quarterdeck_backend::{
    handlers, middleware, models::account::AccountRole, state::AppState,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

mod support;

use support::{open_session, seed_account, test_config, try_test_pool, TEST_PASSWORD};

async fn integration_guard() -> tokio::sync::MutexGuard<'static, ()> {
    static GUARD: std::sync::OnceLock<tokio::sync::Mutex<()>> = std::sync::OnceLock::new();
    GUARD.get_or_init(|| tokio::sync::Mutex::new(())).lock().await
}

fn audit_router(pool: PgPool) -> Router {
    let state = AppState::new(pool, test_config());
    Router::new()
        .route(
            "/api/v1/admin/users",
            post(handlers::admin::users::create_user),
        )
        .route(
            "/api/v1/admin/audit-logs",
            get(handlers::admin::audit_logs::list_audit_logs),
        )
        .route(
            "/api/v1/admin/audit-logs/export",
            get(handlers::admin::audit_logs::export_audit_logs),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth,
        ))
        .layer(axum_middleware::from_fn(middleware::request_id::request_id))
        .with_state(state)
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

#[tokio::test]
async fn test_mutations_land_in_the_audit_trail() {
    let _guard = integration_guard().await;
    let Some(pool) = try_test_pool().await else { return };

    let config = test_config();
    let admin = seed_account(&pool, AccountRole::Admin).await;
    let session = open_session(&pool, &config, &admin).await;
    let app = audit_router(pool);

    let email = format!("audited_{}@example.com", uuid::Uuid::new_v4());
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/admin/users")
                .header("Authorization", format!("Bearer {}", session.access_token))
                .header("Content-Type", "application/json")
                .header("User-Agent", "audit-probe/1.0")
                .body(Body::from(
                    json!({ "email": email, "password": TEST_PASSWORD }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let uri = format!(
        "/api/v1/admin/audit-logs?action=user_created&actor_id={}",
        admin.id
    );
    let response = app
        .oneshot(get_with_bearer(&uri, &session.access_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert!(body["total"].as_i64().expect("total") >= 1);
    let items = body["items"].as_array().expect("items");
    let entry = items
        .iter()
        .find(|e| e["details"]["email"] == email.as_str())
        .expect("audit entry for the new user");
    assert_eq!(entry["action"], "user_created");
    assert_eq!(entry["resource_type"], "account");
    assert_eq!(entry["actor_id"], admin.id.to_string());
    assert_eq!(entry["user_agent"], "audit-probe/1.0");
    assert!(entry["request_id"].is_string());
}

#[tokio::test]
async fn test_viewer_cannot_read_audit_logs() {
    let _guard = integration_guard().await;
    let Some(pool) = try_test_pool().await else { return };

    let config = test_config();
    let viewer = seed_account(&pool, AccountRole::Viewer).await;
    let session = open_session(&pool, &config, &viewer).await;
    let app = audit_router(pool);

    let response = app
        .clone()
        .oneshot(get_with_bearer("/api/v1/admin/audit-logs", &session.access_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(get_with_bearer(
            "/api/v1/admin/audit-logs/export",
            &session.access_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_filter_validation() {
    let _guard = integration_guard().await;
    let Some(pool) = try_test_pool().await else { return };

    let config = test_config();
    let admin = seed_account(&pool, AccountRole::Admin).await;
    let session = open_session(&pool, &config, &admin).await;
    let app = audit_router(pool);

    let response = app
        .clone()
        .oneshot(get_with_bearer(
            "/api/v1/admin/audit-logs?from=2026-02-01&to=2026-01-01",
            &session.access_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "`from` must not be after `to`");

    let response = app
        .clone()
        .oneshot(get_with_bearer(
            "/api/v1/admin/audit-logs?from=yesterday-ish",
            &session.access_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get_with_bearer(
            "/api/v1/admin/audit-logs?actor_id=not-a-uuid",
            &session.access_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pagination_is_clamped() {
    let _guard = integration_guard().await;
    let Some(pool) = try_test_pool().await else { return };

    let config = test_config();
    let admin = seed_account(&pool, AccountRole::Admin).await;
    let session = open_session(&pool, &config, &admin).await;
    let app = audit_router(pool);

    let response = app
        .oneshot(get_with_bearer(
            "/api/v1/admin/audit-logs?page=0&per_page=9999",
            &session.access_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["page"], 1);
    assert_eq!(body["per_page"], 100);
}

#[tokio::test]
async fn test_export_produces_a_csv_attachment() {
    let _guard = integration_guard().await;
    let Some(pool) = try_test_pool().await else { return };

    let config = test_config();
    let admin = seed_account(&pool, AccountRole::Admin).await;
    let session = open_session(&pool, &config, &admin).await;
    let app = audit_router(pool);

    // Make sure at least one row exists inside the window.
    let email = format!("exported_{}@example.com", uuid::Uuid::new_v4());
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/admin/users")
                .header("Authorization", format!("Bearer {}", session.access_token))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    json!({ "email": email, "password": TEST_PASSWORD }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(get_with_bearer(
            "/api/v1/admin/audit-logs/export?action=user_created",
            &session.access_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .expect("content-type")
        .to_string();
    assert!(content_type.starts_with("text/csv"));

    let disposition = response
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .expect("content-disposition")
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"audit_logs_"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let csv = String::from_utf8(bytes.to_vec()).expect("utf8 csv");
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("\"id\",\"created_at\",\"actor_id\",\"action\",\"resource_type\",\"resource_id\",\"ip\",\"user_agent\",\"request_id\",\"details\"")
    );
    assert!(lines.any(|line| line.contains(&email)));
}

#[tokio::test]
async fn test_export_window_is_capped() {
    let _guard = integration_guard().await;
    let Some(pool) = try_test_pool().await else { return };

    let config = test_config();
    let admin = seed_account(&pool, AccountRole::Admin).await;
    let session = open_session(&pool, &config, &admin).await;
    let app = audit_router(pool);

    let to = Utc::now();
    let from = to - Duration::days(60);
    let uri = format!(
        "/api/v1/admin/audit-logs/export?from={}&to={}",
        from.to_rfc3339_opts(SecondsFormat::Secs, true),
        to.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    let response = app
        .oneshot(get_with_bearer(&uri, &session.access_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
