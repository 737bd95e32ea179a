use axum::{
    extract::{Extension, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::AuditContext,
    middleware::request_id::RequestId,
    models::api_token::{
        ApiToken, ApiTokenCreatedResponse, ApiTokenResponse, CreateApiTokenRequest,
        UpdateApiTokenRequest,
    },
    models::principal::Principal,
    repositories::{
        api_token as token_repo, audit as audit_repo,
        transaction::{begin_transaction, commit_transaction},
    },
    scopes::{self, SCOPE_TOKENS_READ, SCOPE_TOKENS_WRITE},
    state::AppState,
    utils::api_token::{generate_api_token, hash_api_token},
};

/// Catalog entry as shown to callers; admin-tier scopes are filtered out
/// for non-admin roles.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScopeInfo {
    pub name: String,
    pub description: String,
    pub admin_tier: bool,
}

pub async fn list_scopes(
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<ScopeInfo>>, AppError> {
    let catalog = scopes::catalog_for_role(principal.account.role)
        .into_iter()
        .map(|def| ScopeInfo {
            name: def.name.to_string(),
            description: def.description.to_string(),
            admin_tier: def.admin_tier,
        })
        .collect();
    Ok(Json(catalog))
}

pub async fn list_api_tokens(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<ApiTokenResponse>>, AppError> {
    scopes::authorize(&principal, SCOPE_TOKENS_READ)?;

    let tokens =
        token_repo::list_api_tokens_for_account(&state.pool, principal.account.id).await?;
    Ok(Json(tokens.into_iter().map(ApiTokenResponse::from).collect()))
}

/// Mints a new API token. The full secret appears in this response and
/// nowhere else; only its hash is stored.
pub async fn create_api_token(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(payload): Json<CreateApiTokenRequest>,
) -> Result<(StatusCode, Json<ApiTokenCreatedResponse>), AppError> {
    scopes::authorize(&principal, SCOPE_TOKENS_WRITE)?;
    payload.validate()?;

    let granted = scopes::validate_scopes(&payload.scopes, principal.account.role)?;
    let expires_at = payload
        .expires_in_days
        .map(|days| Utc::now() + Duration::days(days));

    let generated = generate_api_token(&state.config.environment);
    let token_hash = hash_api_token(&generated.value)?;
    let token = ApiToken::new(
        principal.account.id,
        payload.name.trim().to_string(),
        generated.prefix,
        token_hash,
        granted,
        expires_at,
    );

    let ctx = AuditContext::new(&headers, Some(&request_id));
    let mut tx = begin_transaction(&state.pool).await?;
    let created = token_repo::create_api_token(&mut tx, &token).await?;
    audit_repo::insert_audit_entry(
        &mut tx,
        &ctx.entry(
            Some(principal.account.id),
            "api_token_created",
            "api_token",
            Some(created.id.to_string()),
            Some(json!({ "name": created.name, "scopes": created.scopes })),
        ),
    )
    .await?;
    commit_transaction(tx).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiTokenCreatedResponse::new(generated.value, created)),
    ))
}

pub async fn get_api_token(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(token_id): Path<String>,
) -> Result<Json<ApiTokenResponse>, AppError> {
    scopes::authorize(&principal, SCOPE_TOKENS_READ)?;

    let token_id = parse_token_id(&token_id)?;
    let token = token_repo::find_api_token_by_id(&state.pool, token_id, principal.account.id)
        .await?
        .ok_or_else(|| AppError::NotFound("API token not found".to_string()))?;
    Ok(Json(token.into()))
}

/// Renames a token or narrows/extends its scopes. Deactivation rides the
/// same endpoint via `is_active: false`; reactivation is refused.
pub async fn update_api_token(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Path(token_id): Path<String>,
    Json(payload): Json<UpdateApiTokenRequest>,
) -> Result<Json<ApiTokenResponse>, AppError> {
    scopes::authorize(&principal, SCOPE_TOKENS_WRITE)?;
    payload.validate()?;

    let token_id = parse_token_id(&token_id)?;
    let mut existing = token_repo::find_api_token_by_id(&state.pool, token_id, principal.account.id)
        .await?
        .ok_or_else(|| AppError::NotFound("API token not found".to_string()))?;

    let ctx = AuditContext::new(&headers, Some(&request_id));

    if let Some(active) = payload.is_active {
        if active && !existing.is_active {
            return Err(AppError::BadRequest(
                "Revoked tokens cannot be reactivated".to_string(),
            ));
        }
        if !active {
            if payload.name.is_some() || payload.scopes.is_some() {
                return Err(AppError::BadRequest(
                    "Cannot combine deactivation with other changes".to_string(),
                ));
            }
            if !existing.is_active {
                return Err(AppError::BadRequest("Token is already revoked".to_string()));
            }

            let now = Utc::now();
            let mut tx = begin_transaction(&state.pool).await?;
            token_repo::revoke_api_token(&mut tx, token_id, principal.account.id, now).await?;
            audit_repo::insert_audit_entry(
                &mut tx,
                &ctx.entry(
                    Some(principal.account.id),
                    "api_token_revoked",
                    "api_token",
                    Some(token_id.to_string()),
                    Some(json!({ "reason": "deactivated" })),
                ),
            )
            .await?;
            commit_transaction(tx).await?;

            existing.is_active = false;
            existing.revoked_at = Some(now);
            return Ok(Json(existing.into()));
        }
    }

    let granted = match &payload.scopes {
        Some(requested) => Some(scopes::validate_scopes(requested, principal.account.role)?),
        None => None,
    };
    let name = payload.name.as_deref().map(str::trim);

    let mut tx = begin_transaction(&state.pool).await?;
    let updated = token_repo::update_api_token(
        &mut tx,
        token_id,
        principal.account.id,
        name,
        granted.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("API token not found".to_string()))?;
    audit_repo::insert_audit_entry(
        &mut tx,
        &ctx.entry(
            Some(principal.account.id),
            "api_token_updated",
            "api_token",
            Some(updated.id.to_string()),
            Some(json!({ "name": updated.name, "scopes": updated.scopes })),
        ),
    )
    .await?;
    commit_transaction(tx).await?;

    Ok(Json(updated.into()))
}

pub async fn revoke_api_token(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Path(token_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    scopes::authorize(&principal, SCOPE_TOKENS_WRITE)?;

    let token_id = parse_token_id(&token_id)?;
    let token = token_repo::find_api_token_by_id(&state.pool, token_id, principal.account.id)
        .await?
        .ok_or_else(|| AppError::NotFound("API token not found".to_string()))?;
    if !token.is_active {
        return Err(AppError::BadRequest("Token is already revoked".to_string()));
    }

    let ctx = AuditContext::new(&headers, Some(&request_id));
    let mut tx = begin_transaction(&state.pool).await?;
    let revoked =
        token_repo::revoke_api_token(&mut tx, token_id, principal.account.id, Utc::now()).await?;
    if !revoked {
        return Err(AppError::BadRequest("Token is already revoked".to_string()));
    }
    audit_repo::insert_audit_entry(
        &mut tx,
        &ctx.entry(
            Some(principal.account.id),
            "api_token_revoked",
            "api_token",
            Some(token_id.to_string()),
            Some(json!({ "name": token.name })),
        ),
    )
    .await?;
    commit_transaction(tx).await?;

    Ok(Json(json!({
        "message": "API token revoked",
        "token_id": token_id,
    })))
}

/// Replaces the secret while keeping scopes and expiry. The new token is
/// inserted and the old one revoked in a single transaction, so no
/// interleaving leaves both (or neither) usable.
pub async fn rotate_api_token(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Path(token_id): Path<String>,
) -> Result<Json<ApiTokenCreatedResponse>, AppError> {
    scopes::authorize(&principal, SCOPE_TOKENS_WRITE)?;

    let token_id = parse_token_id(&token_id)?;
    let existing = token_repo::find_api_token_by_id(&state.pool, token_id, principal.account.id)
        .await?
        .ok_or_else(|| AppError::NotFound("API token not found".to_string()))?;
    if !existing.is_active {
        return Err(AppError::BadRequest(
            "Cannot rotate a revoked token".to_string(),
        ));
    }

    let generated = generate_api_token(&state.config.environment);
    let token_hash = hash_api_token(&generated.value)?;
    let replacement = ApiToken::new(
        principal.account.id,
        format!("{} (rotated)", existing.name),
        generated.prefix,
        token_hash,
        existing.scopes.clone(),
        existing.expires_at,
    );

    let ctx = AuditContext::new(&headers, Some(&request_id));
    let mut tx = begin_transaction(&state.pool).await?;
    let created = token_repo::create_api_token(&mut tx, &replacement).await?;
    let revoked =
        token_repo::revoke_api_token(&mut tx, existing.id, principal.account.id, Utc::now())
            .await?;
    if !revoked {
        return Err(AppError::BadRequest(
            "Cannot rotate a revoked token".to_string(),
        ));
    }
    audit_repo::insert_audit_entry(
        &mut tx,
        &ctx.entry(
            Some(principal.account.id),
            "api_token_rotated",
            "api_token",
            Some(existing.id.to_string()),
            Some(json!({ "replacement_id": created.id })),
        ),
    )
    .await?;
    commit_transaction(tx).await?;

    Ok(Json(ApiTokenCreatedResponse::new(generated.value, created)))
}

fn parse_token_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::BadRequest("Invalid token id".to_string()))
}
