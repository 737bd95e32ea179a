use axum::{
    http::{HeaderValue, Method},
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
    Router,
};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use quarterdeck_backend::{
    config::Config,
    db::connection::{create_pool, DbPool},
    docs::ApiDoc,
    handlers, middleware,
    state::AppState,
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(24 * 60 * 60));

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quarterdeck_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        environment = %config.environment,
        jwt_secret = %mask_secret(&config.jwt_secret),
        access_token_expiration_hours = config.access_token_expiration_hours,
        refresh_token_expiration_days = config.refresh_token_expiration_days,
        "Loaded configuration from environment/.env"
    );

    // Initialize database
    let pool: DbPool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let addr: SocketAddr = config.bind_addr.parse()?;
    let cors = build_cors(&config.cors_allow_origins);
    let state = AppState::new(pool, config);

    // Build public routes (no auth)
    let public_routes = Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/api/v1/auth/register", post(handlers::auth::register))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route("/api/v1/auth/refresh", post(handlers::auth::refresh))
        .route(
            "/api/v1/auth/bootstrap/create-admin",
            post(handlers::auth::bootstrap_create_admin),
        )
        .route(
            "/api/v1/auth/password-reset/request",
            post(handlers::password::password_reset_request),
        )
        .route(
            "/api/v1/auth/password-reset/confirm",
            post(handlers::password::password_reset_confirm),
        )
        .route(
            "/api/v1/auth/verify-email/{token}",
            post(handlers::verification::verify_email),
        );

    // Build bearer-protected routes (session JWT or API token); per-route
    // scope checks live in the handlers
    let protected_routes = Router::new()
        .route("/api/v1/auth/me", get(handlers::auth::me))
        .route("/api/v1/auth/logout", post(handlers::auth::logout))
        .route(
            "/api/v1/auth/change-password",
            post(handlers::password::change_password),
        )
        .route(
            "/api/v1/auth/resend-verification",
            post(handlers::verification::resend_verification),
        )
        .route(
            "/api/v1/auth/sessions",
            get(handlers::sessions::list_sessions),
        )
        .route(
            "/api/v1/auth/sessions/{id}",
            delete(handlers::sessions::revoke_session),
        )
        .route(
            "/api/v1/tokens",
            get(handlers::tokens::list_api_tokens).post(handlers::tokens::create_api_token),
        )
        .route("/api/v1/tokens/scopes", get(handlers::tokens::list_scopes))
        .route(
            "/api/v1/tokens/{id}",
            get(handlers::tokens::get_api_token)
                .patch(handlers::tokens::update_api_token)
                .delete(handlers::tokens::revoke_api_token),
        )
        .route(
            "/api/v1/tokens/{id}/rotate",
            post(handlers::tokens::rotate_api_token),
        )
        .route(
            "/api/v1/admin/users",
            get(handlers::admin::users::list_users).post(handlers::admin::users::create_user),
        )
        .route(
            "/api/v1/admin/users/{id}",
            patch(handlers::admin::users::update_user).delete(handlers::admin::users::delete_user),
        )
        .route(
            "/api/v1/admin/users/{id}/revoke-sessions",
            post(handlers::admin::users::revoke_user_sessions),
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
        ));

    // Compose app with shared layers (Trace/request-id/CORS) and shared state
    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(SwaggerUi::new("/api/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn(middleware::request_id::request_id))
                .layer(cors),
        )
        .with_state(state);

    // Start server
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
