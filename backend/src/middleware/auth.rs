//! Bearer authentication for both credential types.
//!
//! One parsing step tags the credential: values carrying the API-token
//! literal prefix take the token arm, everything else is treated as a
//! signed session JWT. Handlers downstream receive a [`Principal`]
//! extension and never look at the raw bearer again.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::principal::Principal,
    repositories::{account as account_repo, api_token as api_token_repo, session as session_repo},
    state::AppState,
    utils::{api_token, jwt, net},
};

/// Single 401 message for every authentication failure; the caller learns
/// nothing about which check failed.
const GENERIC_AUTH_ERROR: &str = "Invalid or expired token";

pub async fn auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer_token)
        .map(|token| token.to_string())
        .ok_or_else(unauthorized)?;
    let client_ip = net::extract_ip(request.headers());

    let principal = if api_token::is_api_token(&bearer) {
        authenticate_api_token(&state, &bearer, client_ip.as_deref()).await?
    } else {
        authenticate_session(&state, &bearer).await?
    };

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

fn unauthorized() -> AppError {
    AppError::Unauthorized(GENERIC_AUTH_ERROR.to_string())
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    if let Some(rest) = header.strip_prefix("Bearer ") {
        return Some(rest);
    }
    if let Some(rest) = header.strip_prefix("bearer ") {
        return Some(rest);
    }
    if let Some(space_idx) = header.find(' ') {
        let (scheme, rest) = header.split_at(space_idx);
        if scheme.eq_ignore_ascii_case("bearer") {
            return Some(rest.trim_start());
        }
    }
    None
}

/// Session arm. The store is authoritative over the signature: a session
/// revoked before its signed expiry must fail here.
async fn authenticate_session(state: &AppState, token: &str) -> Result<Principal, AppError> {
    let claims =
        jwt::verify_access_token(token, &state.config.jwt_secret).map_err(|_| unauthorized())?;

    let session = session_repo::find_session_by_access_token_id(&state.pool, &claims.jti)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?
        .ok_or_else(unauthorized)?;

    let now = Utc::now();
    if !session.is_access_live(now) {
        return Err(unauthorized());
    }

    let account_id = Uuid::parse_str(&claims.sub).map_err(|_| unauthorized())?;
    let account = account_repo::find_account_by_id(&state.pool, account_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?
        .ok_or_else(unauthorized)?;
    if !account.is_active {
        return Err(unauthorized());
    }

    // Activity stamps are advisory and never fail the request.
    let pool = state.pool.clone();
    let jti = claims.jti.clone();
    tokio::spawn(async move {
        if let Err(err) = session_repo::touch_session_activity(&pool, &jti, now).await {
            tracing::debug!(error = ?err, "failed to touch session activity");
        }
        if let Err(err) = account_repo::touch_last_activity(&pool, account_id, now).await {
            tracing::debug!(error = ?err, "failed to touch account activity");
        }
    });

    Ok(Principal::from_session(account, session.id, claims.jti))
}

/// API-token arm. The short prefix only narrows the candidate set; the
/// argon2 comparison against each candidate decides the match.
async fn authenticate_api_token(
    state: &AppState,
    bearer: &str,
    client_ip: Option<&str>,
) -> Result<Principal, AppError> {
    let prefix = api_token::display_prefix(bearer);
    let candidates = api_token_repo::find_active_api_tokens_by_prefix(&state.pool, &prefix)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;

    let token = candidates
        .into_iter()
        .find(|candidate| {
            api_token::verify_api_token_hash(bearer, &candidate.token_hash).unwrap_or(false)
        })
        .ok_or_else(unauthorized)?;

    let now = Utc::now();
    if token.is_expired(now) {
        return Err(unauthorized());
    }

    let account = account_repo::find_account_by_id(&state.pool, token.account_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?
        .ok_or_else(unauthorized)?;
    if !account.is_active {
        return Err(unauthorized());
    }

    api_token_repo::record_api_token_use(&state.pool, token.id, now, client_ip)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;

    Ok(Principal::from_api_token(account, token.id, token.scopes))
}
