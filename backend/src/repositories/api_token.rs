//! Repository functions for API token records.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgTransaction;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::api_token::ApiToken;

/// Inserts a token row inside a transaction; rotation pairs this with the
/// revocation of the predecessor.
pub async fn create_api_token(
    tx: &mut PgTransaction<'_>,
    token: &ApiToken,
) -> Result<ApiToken, sqlx::Error> {
    sqlx::query_as::<_, ApiToken>(
        "INSERT INTO api_tokens \
         (id, account_id, name, token_prefix, token_hash, scopes, is_active, expires_at, \
         last_used_at, last_used_ip, use_count, created_at, revoked_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         RETURNING id, account_id, name, token_prefix, token_hash, scopes, is_active, \
         expires_at, last_used_at, last_used_ip, use_count, created_at, revoked_at",
    )
    .bind(token.id)
    .bind(token.account_id)
    .bind(&token.name)
    .bind(&token.token_prefix)
    .bind(&token.token_hash)
    .bind(&token.scopes)
    .bind(token.is_active)
    .bind(token.expires_at)
    .bind(token.last_used_at)
    .bind(&token.last_used_ip)
    .bind(token.use_count)
    .bind(token.created_at)
    .bind(token.revoked_at)
    .fetch_one(&mut **tx)
    .await
}

/// Lists every token owned by an account, newest first, revoked included.
pub async fn list_api_tokens_for_account(
    pool: &PgPool,
    account_id: Uuid,
) -> Result<Vec<ApiToken>, sqlx::Error> {
    sqlx::query_as::<_, ApiToken>(
        "SELECT id, account_id, name, token_prefix, token_hash, scopes, is_active, \
         expires_at, last_used_at, last_used_ip, use_count, created_at, revoked_at \
         FROM api_tokens WHERE account_id = $1 ORDER BY created_at DESC",
    )
    .bind(account_id)
    .fetch_all(pool)
    .await
}

/// Finds one token scoped to its owner.
pub async fn find_api_token_by_id(
    pool: &PgPool,
    token_id: Uuid,
    account_id: Uuid,
) -> Result<Option<ApiToken>, sqlx::Error> {
    sqlx::query_as::<_, ApiToken>(
        "SELECT id, account_id, name, token_prefix, token_hash, scopes, is_active, \
         expires_at, last_used_at, last_used_ip, use_count, created_at, revoked_at \
         FROM api_tokens WHERE id = $1 AND account_id = $2",
    )
    .bind(token_id)
    .bind(account_id)
    .fetch_optional(pool)
    .await
}

/// Verification candidates: active tokens sharing the display prefix.
/// The prefix is not unique, the caller hash-checks each candidate.
pub async fn find_active_api_tokens_by_prefix(
    pool: &PgPool,
    token_prefix: &str,
) -> Result<Vec<ApiToken>, sqlx::Error> {
    sqlx::query_as::<_, ApiToken>(
        "SELECT id, account_id, name, token_prefix, token_hash, scopes, is_active, \
         expires_at, last_used_at, last_used_ip, use_count, created_at, revoked_at \
         FROM api_tokens WHERE token_prefix = $1 AND is_active",
    )
    .bind(token_prefix)
    .fetch_all(pool)
    .await
}

/// Stamps a successful verification and bumps the use counter.
pub async fn record_api_token_use(
    pool: &PgPool,
    token_id: Uuid,
    at: DateTime<Utc>,
    ip: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE api_tokens \
         SET last_used_at = $1, last_used_ip = $2, use_count = use_count + 1 \
         WHERE id = $3",
    )
    .bind(at)
    .bind(ip)
    .bind(token_id)
    .execute(pool)
    .await
    .map(|_| ())
}

/// Applies rename and scope changes, keeping current values where the
/// caller passed nothing. Activation changes go through [`revoke_api_token`].
pub async fn update_api_token(
    tx: &mut PgTransaction<'_>,
    token_id: Uuid,
    account_id: Uuid,
    name: Option<&str>,
    scopes: Option<&[String]>,
) -> Result<Option<ApiToken>, sqlx::Error> {
    sqlx::query_as::<_, ApiToken>(
        "UPDATE api_tokens \
         SET name = COALESCE($1, name), scopes = COALESCE($2, scopes) \
         WHERE id = $3 AND account_id = $4 \
         RETURNING id, account_id, name, token_prefix, token_hash, scopes, is_active, \
         expires_at, last_used_at, last_used_ip, use_count, created_at, revoked_at",
    )
    .bind(name)
    .bind(scopes)
    .bind(token_id)
    .bind(account_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Soft delete: the row survives for audit history but never verifies again.
pub async fn revoke_api_token(
    tx: &mut PgTransaction<'_>,
    token_id: Uuid,
    account_id: Uuid,
    at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE api_tokens SET is_active = FALSE, revoked_at = $1 \
         WHERE id = $2 AND account_id = $3 AND is_active",
    )
    .bind(at)
    .bind(token_id)
    .bind(account_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() > 0)
}
