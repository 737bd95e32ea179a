use axum::{
    extract::{Extension, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::AuditContext,
    middleware::request_id::RequestId,
    models::account::{
        Account, AccountResponse, ConfirmationRequest, CreateAccountRequest, UpdateAccountRequest,
    },
    models::principal::Principal,
    repositories::{
        account as account_repo, audit as audit_repo, session as session_repo,
        transaction::{begin_transaction, commit_transaction},
    },
    scopes::{self, SCOPE_USERS_DELETE, SCOPE_USERS_READ, SCOPE_USERS_WRITE},
    state::AppState,
    utils::password::hash_password,
};

pub async fn list_users(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<AccountResponse>>, AppError> {
    scopes::authorize(&principal, SCOPE_USERS_READ)?;

    let accounts = account_repo::list_accounts(&state.pool).await?;
    Ok(Json(accounts.into_iter().map(AccountResponse::from).collect()))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(payload): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), AppError> {
    scopes::authorize(&principal, SCOPE_USERS_WRITE)?;
    payload.validate()?;

    let password_hash = hash_password(&payload.password)?;
    let mut account = Account::new(
        payload.email.trim().to_lowercase(),
        password_hash,
        payload.role,
    );
    account.username = payload.username;
    account.first_name = payload.first_name;
    account.last_name = payload.last_name;

    let ctx = AuditContext::new(&headers, Some(&request_id));
    let mut tx = begin_transaction(&state.pool).await?;
    let account = account_repo::create_account(&mut tx, &account).await?;
    audit_repo::insert_audit_entry(
        &mut tx,
        &ctx.entry(
            Some(principal.account.id),
            "user_created",
            "account",
            Some(account.id.to_string()),
            Some(json!({ "email": account.email, "role": account.role.as_str() })),
        ),
    )
    .await?;
    commit_transaction(tx).await?;

    tracing::info!(user_id = %account.id, admin_id = %principal.account.id, "user created");
    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    scopes::authorize(&principal, SCOPE_USERS_WRITE)?;

    let user_id = parse_user_id(&user_id)?;
    let ctx = AuditContext::new(&headers, Some(&request_id));

    let mut tx = begin_transaction(&state.pool).await?;
    let updated = account_repo::update_account(
        &mut tx,
        user_id,
        payload.role,
        payload.is_active,
        payload.first_name.as_deref(),
        payload.last_name.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    audit_repo::insert_audit_entry(
        &mut tx,
        &ctx.entry(
            Some(principal.account.id),
            "user_updated",
            "account",
            Some(updated.id.to_string()),
            Some(json!({
                "role": payload.role.map(|r| r.as_str()),
                "is_active": payload.is_active,
            })),
        ),
    )
    .await?;
    commit_transaction(tx).await?;

    tracing::info!(user_id = %updated.id, admin_id = %principal.account.id, "user updated");
    Ok(Json(AccountResponse::from(updated)))
}

/// Hard delete. The confirmation body must echo the target's email; a
/// mismatch fails closed without touching anything.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(payload): Json<ConfirmationRequest>,
) -> Result<Json<Value>, AppError> {
    scopes::authorize(&principal, SCOPE_USERS_DELETE)?;

    let user_id = parse_user_id(&user_id)?;
    if user_id == principal.account.id {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let target = account_repo::find_account_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    if payload.confirm != target.email {
        return Err(AppError::BadRequest(
            "Confirmation does not match the account email".to_string(),
        ));
    }

    let ctx = AuditContext::new(&headers, Some(&request_id));
    let mut tx = begin_transaction(&state.pool).await?;
    let deleted = account_repo::delete_account(&mut tx, target.id).await?;
    if !deleted {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    audit_repo::insert_audit_entry(
        &mut tx,
        &ctx.entry(
            Some(principal.account.id),
            "user_deleted",
            "account",
            Some(target.id.to_string()),
            Some(json!({ "email": target.email })),
        ),
    )
    .await?;
    commit_transaction(tx).await?;

    tracing::info!(user_id = %target.id, admin_id = %principal.account.id, "user deleted");
    Ok(Json(json!({
        "message": "User deleted",
        "user_id": target.id,
    })))
}

/// Kills every session of the target account, echo-back confirmed. API
/// tokens are unaffected; revoke those individually.
pub async fn revoke_user_sessions(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(payload): Json<ConfirmationRequest>,
) -> Result<Json<Value>, AppError> {
    scopes::authorize(&principal, SCOPE_USERS_WRITE)?;

    let user_id = parse_user_id(&user_id)?;
    let target = account_repo::find_account_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    if payload.confirm != target.email {
        return Err(AppError::BadRequest(
            "Confirmation does not match the account email".to_string(),
        ));
    }

    let ctx = AuditContext::new(&headers, Some(&request_id));
    let mut tx = begin_transaction(&state.pool).await?;
    let revoked = session_repo::revoke_sessions_for_account(&mut tx, target.id, Utc::now()).await?;
    audit_repo::insert_audit_entry(
        &mut tx,
        &ctx.entry(
            Some(principal.account.id),
            "sessions_revoked",
            "account",
            Some(target.id.to_string()),
            Some(json!({ "revoked": revoked })),
        ),
    )
    .await?;
    commit_transaction(tx).await?;

    tracing::info!(
        user_id = %target.id,
        admin_id = %principal.account.id,
        revoked,
        "sessions revoked"
    );
    Ok(Json(json!({
        "message": "Sessions revoked",
        "revoked": revoked,
    })))
}

fn parse_user_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::BadRequest("Invalid user id".to_string()))
}
