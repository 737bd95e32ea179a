use axum::{
    extract::{Extension, Path, State},
    http::HeaderMap,
    Json,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use crate::{
    error::AppError,
    handlers::{auth::send_verification_email_in_background, AuditContext},
    middleware::request_id::RequestId,
    models::principal::Principal,
    repositories::{
        account as account_repo, audit as audit_repo,
        transaction::{begin_transaction, commit_transaction},
    },
    state::AppState,
    utils::recovery::{generate_recovery_token, hash_recovery_token},
};

const VERIFY_TOKEN_INVALID: &str = "Invalid or expired verification token";

/// Consumes an emailed verification token. Single use: marking the
/// address verified clears the stored hash.
pub async fn verify_email(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> Result<Json<Value>, AppError> {
    let token_hash = hash_recovery_token(&token);
    let account = account_repo::find_account_by_verification_token_hash(&state.pool, &token_hash)
        .await?
        .ok_or_else(|| AppError::BadRequest(VERIFY_TOKEN_INVALID.into()))?;

    let sent_at = account
        .email_verification_sent_at
        .ok_or_else(|| AppError::BadRequest(VERIFY_TOKEN_INVALID.into()))?;
    let expires_at =
        sent_at + Duration::days(state.config.email_verification_expiration_days as i64);
    if expires_at <= Utc::now() {
        return Err(AppError::BadRequest(VERIFY_TOKEN_INVALID.into()));
    }

    let ctx = AuditContext::new(&headers, Some(&request_id));
    let mut tx = begin_transaction(&state.pool).await?;
    account_repo::mark_email_verified(&mut tx, account.id).await?;
    audit_repo::insert_audit_entry(
        &mut tx,
        &ctx.entry(
            Some(account.id),
            "email_verified",
            "account",
            Some(account.id.to_string()),
            None,
        ),
    )
    .await?;
    commit_transaction(tx).await?;

    Ok(Json(json!({ "message": "Email verified" })))
}

pub async fn resend_verification(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let account = &principal.account;
    if account.email_verified {
        return Err(AppError::BadRequest("Email is already verified".into()));
    }

    let token = generate_recovery_token();
    let token_hash = hash_recovery_token(&token);
    let ctx = AuditContext::new(&headers, Some(&request_id));

    let mut tx = begin_transaction(&state.pool).await?;
    account_repo::set_email_verification_token(&mut tx, account.id, &token_hash, Utc::now())
        .await?;
    audit_repo::insert_audit_entry(
        &mut tx,
        &ctx.entry(
            Some(account.id),
            "verification_resent",
            "account",
            Some(account.id.to_string()),
            None,
        ),
    )
    .await?;
    commit_transaction(tx).await?;

    send_verification_email_in_background(account.email.clone(), token);

    Ok(Json(json!({ "message": "Verification email sent" })))
}
