use chrono::{DateTime, Utc};
use sqlx::postgres::PgTransaction;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::session::Session;

#[allow(clippy::too_many_arguments)]
pub async fn create_session(
    tx: &mut PgTransaction<'_>,
    account_id: Uuid,
    access_token_id: &str,
    refresh_token_id: &str,
    access_expires_at: DateTime<Utc>,
    refresh_expires_at: DateTime<Utc>,
    user_agent: Option<&str>,
    ip_address: Option<&str>,
    device_name: Option<&str>,
) -> Result<Session, sqlx::Error> {
    let session_id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query_as::<_, Session>(
        r#"
        INSERT INTO sessions
            (id, account_id, access_token_id, refresh_token_id, access_expires_at,
            refresh_expires_at, user_agent, ip_address, device_name, is_active,
            last_activity, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE, $10, $10)
        RETURNING id, account_id, access_token_id, refresh_token_id, access_expires_at,
            refresh_expires_at, user_agent, ip_address, device_name, is_active,
            last_activity, created_at, revoked_at
        "#,
    )
    .bind(session_id)
    .bind(account_id)
    .bind(access_token_id)
    .bind(refresh_token_id)
    .bind(access_expires_at)
    .bind(refresh_expires_at)
    .bind(user_agent)
    .bind(ip_address)
    .bind(device_name)
    .bind(now)
    .fetch_one(&mut **tx)
    .await
}

pub async fn find_session_by_id(
    pool: &PgPool,
    session_id: Uuid,
) -> Result<Option<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(
        r#"
        SELECT id, account_id, access_token_id, refresh_token_id, access_expires_at,
            refresh_expires_at, user_agent, ip_address, device_name, is_active,
            last_activity, created_at, revoked_at
        FROM sessions
        WHERE id = $1
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_session_by_access_token_id(
    pool: &PgPool,
    access_token_id: &str,
) -> Result<Option<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(
        r#"
        SELECT id, account_id, access_token_id, refresh_token_id, access_expires_at,
            refresh_expires_at, user_agent, ip_address, device_name, is_active,
            last_activity, created_at, revoked_at
        FROM sessions
        WHERE access_token_id = $1
        "#,
    )
    .bind(access_token_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_session_by_refresh_token_id(
    pool: &PgPool,
    refresh_token_id: &str,
) -> Result<Option<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(
        r#"
        SELECT id, account_id, access_token_id, refresh_token_id, access_expires_at,
            refresh_expires_at, user_agent, ip_address, device_name, is_active,
            last_activity, created_at, revoked_at
        FROM sessions
        WHERE refresh_token_id = $1
        "#,
    )
    .bind(refresh_token_id)
    .fetch_optional(pool)
    .await
}

/// Active sessions for one account, most recently used first.
pub async fn list_sessions_for_account(
    pool: &PgPool,
    account_id: Uuid,
) -> Result<Vec<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(
        r#"
        SELECT id, account_id, access_token_id, refresh_token_id, access_expires_at,
            refresh_expires_at, user_agent, ip_address, device_name, is_active,
            last_activity, created_at, revoked_at
        FROM sessions
        WHERE account_id = $1 AND is_active
        ORDER BY last_activity DESC, created_at DESC, id DESC
        "#,
    )
    .bind(account_id)
    .fetch_all(pool)
    .await
}

/// Replaces the credential pair in place, gated on the presented refresh id
/// still being current. The row lock makes concurrent refreshes serialize;
/// the loser matches nothing and gets `None`.
#[allow(clippy::too_many_arguments)]
pub async fn rotate_session_tokens(
    pool: &PgPool,
    current_refresh_token_id: &str,
    new_access_token_id: &str,
    new_refresh_token_id: &str,
    access_expires_at: DateTime<Utc>,
    refresh_expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Option<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(
        r#"
        UPDATE sessions
        SET access_token_id = $1,
            refresh_token_id = $2,
            access_expires_at = $3,
            refresh_expires_at = $4,
            last_activity = $5
        WHERE refresh_token_id = $6 AND is_active AND refresh_expires_at > $5
        RETURNING id, account_id, access_token_id, refresh_token_id, access_expires_at,
            refresh_expires_at, user_agent, ip_address, device_name, is_active,
            last_activity, created_at, revoked_at
        "#,
    )
    .bind(new_access_token_id)
    .bind(new_refresh_token_id)
    .bind(access_expires_at)
    .bind(refresh_expires_at)
    .bind(now)
    .bind(current_refresh_token_id)
    .fetch_optional(pool)
    .await
}

pub async fn touch_session_activity(
    pool: &PgPool,
    access_token_id: &str,
    at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET last_activity = $1
        WHERE access_token_id = $2
        "#,
    )
    .bind(at)
    .bind(access_token_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Revoked sessions stay revoked: the guard on `is_active` makes repeat
/// revocations report `false` instead of moving the timestamp.
pub async fn revoke_session(
    tx: &mut PgTransaction<'_>,
    session_id: Uuid,
    at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET is_active = FALSE, revoked_at = $1
        WHERE id = $2 AND is_active
        "#,
    )
    .bind(at)
    .bind(session_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Global logout for one account; returns how many sessions were revoked.
pub async fn revoke_sessions_for_account(
    tx: &mut PgTransaction<'_>,
    account_id: Uuid,
    at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET is_active = FALSE, revoked_at = $1
        WHERE account_id = $2 AND is_active
        "#,
    )
    .bind(at)
    .bind(account_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected())
}
