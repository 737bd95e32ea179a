use axum::{
    extract::{Extension, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::AuditContext,
    middleware::request_id::RequestId,
    models::account::{
        Account, AccountResponse, AccountRole, AuthResponse, BootstrapAdminRequest, LoginRequest,
        RefreshRequest, RegisterRequest,
    },
    models::principal::Principal,
    repositories::{
        account as account_repo, audit as audit_repo, session as session_repo,
        transaction::{begin_transaction, commit_transaction},
    },
    state::AppState,
    utils::{
        email::EmailService,
        jwt::{create_access_token, create_refresh_token, verify_refresh_token},
        net,
        password::{hash_password, verify_password},
        recovery::{generate_recovery_token, hash_recovery_token},
    },
};

/// One message for every way a login can fail.
const LOGIN_FAILED: &str = "Invalid email or password";
const REFRESH_FAILED: &str = "Invalid or expired refresh token";

/// Self-service registration. Issues a session immediately and sends the
/// verification email after commit.
pub async fn register(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    payload.validate()?;

    let password_hash = hash_password(&payload.password)?;
    let mut account = Account::new(
        payload.email.trim().to_lowercase(),
        password_hash,
        AccountRole::Viewer,
    );
    account.username = payload.username;
    account.first_name = payload.first_name;
    account.last_name = payload.last_name;

    let verification_token = generate_recovery_token();
    account.email_verification_token_hash = Some(hash_recovery_token(&verification_token));
    account.email_verification_sent_at = Some(Utc::now());

    let ctx = AuditContext::new(&headers, Some(&request_id));
    let mut tx = begin_transaction(&state.pool).await?;
    let account = account_repo::create_account(&mut tx, &account).await?;

    let (access_token, refresh_token) = issue_session(
        &state,
        &mut tx,
        &account,
        &headers,
    )
    .await?;

    audit_repo::insert_audit_entry(
        &mut tx,
        &ctx.entry(
            Some(account.id),
            "user_registered",
            "account",
            Some(account.id.to_string()),
            Some(json!({ "email": account.email })),
        ),
    )
    .await?;
    commit_transaction(tx).await?;

    send_verification_email_in_background(account.email.clone(), verification_token);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new(access_token, refresh_token, account)),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();
    let mut account = account_repo::find_account_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| AppError::Unauthorized(LOGIN_FAILED.to_string()))?;

    let password_ok = verify_password(&payload.password, &account.password_hash)?;
    if !password_ok || !account.is_active {
        return Err(AppError::Unauthorized(LOGIN_FAILED.to_string()));
    }

    let ctx = AuditContext::new(&headers, Some(&request_id));
    let now = Utc::now();
    let mut tx = begin_transaction(&state.pool).await?;

    let (access_token, refresh_token) = issue_session(&state, &mut tx, &account, &headers).await?;
    account_repo::record_login(&mut tx, account.id, now).await?;

    audit_repo::insert_audit_entry(
        &mut tx,
        &ctx.entry(
            Some(account.id),
            "user_login",
            "account",
            Some(account.id.to_string()),
            None,
        ),
    )
    .await?;
    commit_transaction(tx).await?;

    account.last_login = Some(now);
    account.last_activity = Some(now);
    Ok(Json(AuthResponse::new(access_token, refresh_token, account)))
}

/// Exchanges a live refresh token for a rotated credential pair. The old
/// pair stops working the moment the row update lands; a concurrent
/// refresh with the same token loses the race and gets a 401.
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let claims = verify_refresh_token(&payload.refresh_token, &state.config.jwt_secret)
        .map_err(|_| AppError::Unauthorized(REFRESH_FAILED.to_string()))?;

    let session = session_repo::find_session_by_refresh_token_id(&state.pool, &claims.jti)
        .await?
        .ok_or_else(|| AppError::Unauthorized(REFRESH_FAILED.to_string()))?;

    let now = Utc::now();
    if !session.is_refresh_live(now) {
        return Err(AppError::Unauthorized(REFRESH_FAILED.to_string()));
    }

    let account = account_repo::find_account_by_id(&state.pool, session.account_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized(REFRESH_FAILED.to_string()))?;
    if !account.is_active {
        return Err(AppError::Unauthorized(REFRESH_FAILED.to_string()));
    }

    let access_token_id = Uuid::new_v4().to_string();
    let refresh_token_id = Uuid::new_v4().to_string();
    let access_expires_at =
        now + Duration::hours(state.config.access_token_expiration_hours as i64);
    let refresh_expires_at =
        now + Duration::days(state.config.refresh_token_expiration_days as i64);

    let access_token = create_access_token(
        account.id.to_string(),
        account.role.as_str().to_string(),
        access_token_id.clone(),
        &state.config.jwt_secret,
        state.config.access_token_expiration_hours,
    )?;
    let refresh_token = create_refresh_token(
        account.id.to_string(),
        refresh_token_id.clone(),
        &state.config.jwt_secret,
        state.config.refresh_token_expiration_days,
    )?;

    session_repo::rotate_session_tokens(
        &state.pool,
        &claims.jti,
        &access_token_id,
        &refresh_token_id,
        access_expires_at,
        refresh_expires_at,
        now,
    )
    .await?
    .ok_or_else(|| AppError::Unauthorized(REFRESH_FAILED.to_string()))?;

    Ok(Json(AuthResponse::new(access_token, refresh_token, account)))
}

/// Revokes the calling session. API-token callers have nothing to log out.
pub async fn logout(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let session_id = principal
        .session_id()
        .ok_or_else(|| AppError::BadRequest("API tokens have no session to log out".into()))?;

    let ctx = AuditContext::new(&headers, Some(&request_id));
    let mut tx = begin_transaction(&state.pool).await?;
    session_repo::revoke_session(&mut tx, session_id, Utc::now()).await?;
    audit_repo::insert_audit_entry(
        &mut tx,
        &ctx.entry(
            Some(principal.account.id),
            "user_logout",
            "session",
            Some(session_id.to_string()),
            None,
        ),
    )
    .await?;
    commit_transaction(tx).await?;

    Ok(Json(json!({ "message": "Logged out" })))
}

pub async fn me(
    Extension(principal): Extension<Principal>,
) -> Result<Json<AccountResponse>, AppError> {
    Ok(Json(AccountResponse::from(principal.account)))
}

/// Creates the first administrator. Permitted only while zero admin
/// accounts exist; the advisory lock serializes concurrent attempts so
/// exactly one can win.
pub async fn bootstrap_create_admin(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(payload): Json<BootstrapAdminRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), AppError> {
    payload.validate()?;

    let ctx = AuditContext::new(&headers, Some(&request_id));
    let mut tx = begin_transaction(&state.pool).await?;
    account_repo::lock_admin_bootstrap(&mut tx).await?;

    let admins = account_repo::count_admin_accounts(&mut tx).await?;
    if admins > 0 {
        return Err(AppError::Forbidden(
            "Bootstrap is disabled once an administrator exists".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;
    let mut account = Account::new(
        payload.email.trim().to_lowercase(),
        password_hash,
        AccountRole::Admin,
    );
    account.first_name = payload.first_name;
    account.last_name = payload.last_name;
    account.email_verified = true;

    let account = account_repo::create_account(&mut tx, &account).await?;
    audit_repo::insert_audit_entry(
        &mut tx,
        &ctx.entry(
            None,
            "bootstrap_admin_created",
            "account",
            Some(account.id.to_string()),
            Some(json!({ "email": account.email })),
        ),
    )
    .await?;
    commit_transaction(tx).await?;

    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

/// Creates the durable session row and mints the matching JWT pair inside
/// the caller's transaction.
async fn issue_session(
    state: &AppState,
    tx: &mut sqlx::postgres::PgTransaction<'_>,
    account: &Account,
    headers: &HeaderMap,
) -> Result<(String, String), AppError> {
    let now = Utc::now();
    let access_token_id = Uuid::new_v4().to_string();
    let refresh_token_id = Uuid::new_v4().to_string();
    let access_expires_at =
        now + Duration::hours(state.config.access_token_expiration_hours as i64);
    let refresh_expires_at =
        now + Duration::days(state.config.refresh_token_expiration_days as i64);

    let user_agent = net::extract_user_agent(headers);
    let ip_address = net::extract_ip(headers);
    let device_name = net::derive_device_name(headers);

    session_repo::create_session(
        tx,
        account.id,
        &access_token_id,
        &refresh_token_id,
        access_expires_at,
        refresh_expires_at,
        user_agent.as_deref(),
        ip_address.as_deref(),
        device_name.as_deref(),
    )
    .await?;

    let access_token = create_access_token(
        account.id.to_string(),
        account.role.as_str().to_string(),
        access_token_id,
        &state.config.jwt_secret,
        state.config.access_token_expiration_hours,
    )?;
    let refresh_token = create_refresh_token(
        account.id.to_string(),
        refresh_token_id,
        &state.config.jwt_secret,
        state.config.refresh_token_expiration_days,
    )?;

    Ok((access_token, refresh_token))
}

pub(crate) fn send_verification_email_in_background(email: String, token: String) {
    tokio::task::spawn_blocking(move || match EmailService::new() {
        Ok(service) => {
            if let Err(err) = service.send_verification_email(&email, &token) {
                tracing::warn!(error = ?err, "failed to send verification email");
            }
        }
        Err(err) => tracing::warn!(error = ?err, "email service unavailable"),
    });
}
