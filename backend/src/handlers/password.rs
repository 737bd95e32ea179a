use axum::{
    extract::{Extension, State},
    http::HeaderMap,
    Json,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::AuditContext,
    middleware::request_id::RequestId,
    models::account::{ChangePasswordRequest, PasswordResetConfirm, PasswordResetRequest},
    models::principal::Principal,
    repositories::{
        account as account_repo, audit as audit_repo, session as session_repo,
        transaction::{begin_transaction, commit_transaction},
    },
    state::AppState,
    utils::{
        email::EmailService,
        password::{hash_password, verify_password},
        recovery::{generate_recovery_token, hash_recovery_token},
    },
};

const RESET_REQUESTED: &str = "If the email is registered, a reset link has been sent";
const RESET_TOKEN_INVALID: &str = "Invalid or expired reset token";

/// Rotates the caller's own password. Existing sessions stay alive; only
/// the reset flow revokes them.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, AppError> {
    payload.validate()?;

    let account = &principal.account;
    let current_ok = verify_password(&payload.current_password, &account.password_hash)?;
    if !current_ok {
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }

    let new_hash = hash_password(&payload.new_password)?;
    let ctx = AuditContext::new(&headers, Some(&request_id));

    let mut tx = begin_transaction(&state.pool).await?;
    account_repo::update_password(&mut tx, account.id, &new_hash).await?;
    audit_repo::insert_audit_entry(
        &mut tx,
        &ctx.entry(
            Some(account.id),
            "password_changed",
            "account",
            Some(account.id.to_string()),
            None,
        ),
    )
    .await?;
    commit_transaction(tx).await?;

    let email = account.email.clone();
    tokio::task::spawn_blocking(move || match EmailService::new() {
        Ok(service) => {
            if let Err(err) = service.send_password_changed_notification(&email) {
                tracing::warn!(error = ?err, "failed to send password change notification");
            }
        }
        Err(err) => tracing::warn!(error = ?err, "email service unavailable"),
    });

    Ok(Json(json!({ "message": "Password changed" })))
}

/// Always answers 200 with the same message so the endpoint cannot be
/// used to probe which emails exist.
pub async fn password_reset_request(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<Json<Value>, AppError> {
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();
    let account = account_repo::find_account_by_email(&state.pool, &email).await?;

    if let Some(account) = account.filter(|a| a.is_active) {
        let token = generate_recovery_token();
        let token_hash = hash_recovery_token(&token);
        let ctx = AuditContext::new(&headers, Some(&request_id));

        let mut tx = begin_transaction(&state.pool).await?;
        account_repo::set_password_reset_token(&mut tx, account.id, &token_hash, Utc::now())
            .await?;
        audit_repo::insert_audit_entry(
            &mut tx,
            &ctx.entry(
                Some(account.id),
                "password_reset_requested",
                "account",
                Some(account.id.to_string()),
                None,
            ),
        )
        .await?;
        commit_transaction(tx).await?;

        let to = account.email.clone();
        tokio::task::spawn_blocking(move || match EmailService::new() {
            Ok(service) => {
                if let Err(err) = service.send_password_reset_email(&to, &token) {
                    tracing::warn!(error = ?err, "failed to send password reset email");
                }
            }
            Err(err) => tracing::warn!(error = ?err, "email service unavailable"),
        });
    }

    Ok(Json(json!({ "message": RESET_REQUESTED })))
}

/// Completes a reset: new password in, token cleared, and every session
/// of the account revoked in the same transaction.
pub async fn password_reset_confirm(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(payload): Json<PasswordResetConfirm>,
) -> Result<Json<Value>, AppError> {
    payload.validate()?;

    let token_hash = hash_recovery_token(&payload.token);
    let account = account_repo::find_account_by_reset_token_hash(&state.pool, &token_hash)
        .await?
        .ok_or_else(|| AppError::BadRequest(RESET_TOKEN_INVALID.into()))?;

    let now = Utc::now();
    let sent_at = account
        .password_reset_sent_at
        .ok_or_else(|| AppError::BadRequest(RESET_TOKEN_INVALID.into()))?;
    let expires_at = sent_at + Duration::hours(state.config.password_reset_expiration_hours as i64);
    if expires_at <= now {
        return Err(AppError::BadRequest(RESET_TOKEN_INVALID.into()));
    }

    let new_hash = hash_password(&payload.new_password)?;
    let ctx = AuditContext::new(&headers, Some(&request_id));

    let mut tx = begin_transaction(&state.pool).await?;
    account_repo::update_password(&mut tx, account.id, &new_hash).await?;
    let revoked = session_repo::revoke_sessions_for_account(&mut tx, account.id, now).await?;
    audit_repo::insert_audit_entry(
        &mut tx,
        &ctx.entry(
            Some(account.id),
            "password_reset_completed",
            "account",
            Some(account.id.to_string()),
            Some(json!({ "sessions_revoked": revoked })),
        ),
    )
    .await?;
    commit_transaction(tx).await?;

    Ok(Json(json!({ "message": "Password has been reset" })))
}
