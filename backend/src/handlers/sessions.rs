use axum::{
    extract::{Extension, Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppError,
    handlers::AuditContext,
    middleware::request_id::RequestId,
    models::principal::Principal,
    models::session::SessionResponse,
    repositories::{
        audit as audit_repo, session as session_repo,
        transaction::{begin_transaction, commit_transaction},
    },
    state::AppState,
};

pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<SessionResponse>>, AppError> {
    let sessions =
        session_repo::list_sessions_for_account(&state.pool, principal.account.id).await?;
    let current = principal.access_token_id();

    let responses = sessions
        .into_iter()
        .map(|session| SessionResponse::from_session(session, current))
        .collect();

    Ok(Json(responses))
}

pub async fn revoke_session(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let session_id = Uuid::parse_str(session_id.trim())
        .map_err(|_| AppError::BadRequest("Invalid session id".to_string()))?;

    let session = session_repo::find_session_by_id(&state.pool, session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    if session.account_id != principal.account.id {
        return Err(AppError::Forbidden(
            "Cannot revoke another account's session".to_string(),
        ));
    }
    if principal.session_id() == Some(session.id) {
        return Err(AppError::BadRequest(
            "Cannot revoke current session; use logout instead".to_string(),
        ));
    }

    let ctx = AuditContext::new(&headers, Some(&request_id));
    let mut tx = begin_transaction(&state.pool).await?;
    let revoked = session_repo::revoke_session(&mut tx, session.id, Utc::now()).await?;
    if !revoked {
        return Err(AppError::NotFound(
            "Session not found or already revoked".to_string(),
        ));
    }
    audit_repo::insert_audit_entry(
        &mut tx,
        &ctx.entry(
            Some(principal.account.id),
            "session_revoked",
            "session",
            Some(session.id.to_string()),
            Some(json!({ "reason": "user_revoke" })),
        ),
    )
    .await?;
    commit_transaction(tx).await?;

    Ok(Json(json!({
        "message": "Session revoked",
        "session_id": session.id,
    })))
}
