//! Repository functions for account records.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgTransaction;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::account::{Account, AccountRole};

/// Inserts a new account inside a transaction so the caller can pair it
/// with its audit entry.
pub async fn create_account(
    tx: &mut PgTransaction<'_>,
    account: &Account,
) -> Result<Account, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        "INSERT INTO accounts \
         (id, email, username, password_hash, first_name, last_name, role, is_active, \
         email_verified, email_verification_token_hash, email_verification_sent_at, \
         password_reset_token_hash, password_reset_sent_at, created_at, last_login, last_activity) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
         RETURNING id, email, username, password_hash, first_name, last_name, \
         LOWER(role) as role, is_active, email_verified, email_verification_token_hash, \
         email_verification_sent_at, password_reset_token_hash, password_reset_sent_at, \
         created_at, last_login, last_activity",
    )
    .bind(account.id)
    .bind(&account.email)
    .bind(&account.username)
    .bind(&account.password_hash)
    .bind(&account.first_name)
    .bind(&account.last_name)
    .bind(account.role.as_str())
    .bind(account.is_active)
    .bind(account.email_verified)
    .bind(&account.email_verification_token_hash)
    .bind(account.email_verification_sent_at)
    .bind(&account.password_reset_token_hash)
    .bind(account.password_reset_sent_at)
    .bind(account.created_at)
    .bind(account.last_login)
    .bind(account.last_activity)
    .fetch_one(&mut **tx)
    .await
}

/// Finds an account by its id.
pub async fn find_account_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        "SELECT id, email, username, password_hash, first_name, last_name, \
         LOWER(role) as role, is_active, email_verified, email_verification_token_hash, \
         email_verification_sent_at, password_reset_token_hash, password_reset_sent_at, \
         created_at, last_login, last_activity \
         FROM accounts WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Finds an account by its email address.
pub async fn find_account_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        "SELECT id, email, username, password_hash, first_name, last_name, \
         LOWER(role) as role, is_active, email_verified, email_verification_token_hash, \
         email_verification_sent_at, password_reset_token_hash, password_reset_sent_at, \
         created_at, last_login, last_activity \
         FROM accounts WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Lists every account, newest first.
pub async fn list_accounts(pool: &PgPool) -> Result<Vec<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        "SELECT id, email, username, password_hash, first_name, last_name, \
         LOWER(role) as role, is_active, email_verified, email_verification_token_hash, \
         email_verification_sent_at, password_reset_token_hash, password_reset_sent_at, \
         created_at, last_login, last_activity \
         FROM accounts ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
}

/// Serializes concurrent first-admin bootstrap attempts for the duration
/// of the surrounding transaction.
pub async fn lock_admin_bootstrap(tx: &mut PgTransaction<'_>) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext('bootstrap_admin'))")
        .execute(&mut **tx)
        .await
        .map(|_| ())
}

/// Counts accounts holding the admin role.
pub async fn count_admin_accounts(tx: &mut PgTransaction<'_>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts WHERE LOWER(role) = $1")
        .bind(AccountRole::Admin.as_str())
        .fetch_one(&mut **tx)
        .await
}

/// Replaces the password hash and clears any outstanding reset token.
pub async fn update_password(
    tx: &mut PgTransaction<'_>,
    account_id: Uuid,
    new_password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE accounts \
         SET password_hash = $1, password_reset_token_hash = NULL, password_reset_sent_at = NULL \
         WHERE id = $2",
    )
    .bind(new_password_hash)
    .bind(account_id)
    .execute(&mut **tx)
    .await
    .map(|_| ())
}

/// Stores a new password-reset token hash, overwriting any previous one.
pub async fn set_password_reset_token(
    tx: &mut PgTransaction<'_>,
    account_id: Uuid,
    token_hash: &str,
    sent_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE accounts SET password_reset_token_hash = $1, password_reset_sent_at = $2 \
         WHERE id = $3",
    )
    .bind(token_hash)
    .bind(sent_at)
    .bind(account_id)
    .execute(&mut **tx)
    .await
    .map(|_| ())
}

/// Finds the account holding an outstanding password-reset token.
pub async fn find_account_by_reset_token_hash(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        "SELECT id, email, username, password_hash, first_name, last_name, \
         LOWER(role) as role, is_active, email_verified, email_verification_token_hash, \
         email_verification_sent_at, password_reset_token_hash, password_reset_sent_at, \
         created_at, last_login, last_activity \
         FROM accounts WHERE password_reset_token_hash = $1",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await
}

/// Stores a new email-verification token hash, overwriting any previous one.
pub async fn set_email_verification_token(
    tx: &mut PgTransaction<'_>,
    account_id: Uuid,
    token_hash: &str,
    sent_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE accounts \
         SET email_verification_token_hash = $1, email_verification_sent_at = $2 \
         WHERE id = $3",
    )
    .bind(token_hash)
    .bind(sent_at)
    .bind(account_id)
    .execute(&mut **tx)
    .await
    .map(|_| ())
}

/// Finds the account holding an outstanding email-verification token.
pub async fn find_account_by_verification_token_hash(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        "SELECT id, email, username, password_hash, first_name, last_name, \
         LOWER(role) as role, is_active, email_verified, email_verification_token_hash, \
         email_verification_sent_at, password_reset_token_hash, password_reset_sent_at, \
         created_at, last_login, last_activity \
         FROM accounts WHERE email_verification_token_hash = $1",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await
}

/// Flips the verified flag and consumes the verification token.
pub async fn mark_email_verified(
    tx: &mut PgTransaction<'_>,
    account_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE accounts \
         SET email_verified = TRUE, email_verification_token_hash = NULL, \
         email_verification_sent_at = NULL \
         WHERE id = $1",
    )
    .bind(account_id)
    .execute(&mut **tx)
    .await
    .map(|_| ())
}

/// Stamps a successful login.
pub async fn record_login(
    tx: &mut PgTransaction<'_>,
    account_id: Uuid,
    at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE accounts SET last_login = $1, last_activity = $1 WHERE id = $2")
        .bind(at)
        .bind(account_id)
        .execute(&mut **tx)
        .await
        .map(|_| ())
}

/// Bumps the activity timestamp; used best-effort by the auth middleware.
pub async fn touch_last_activity(
    pool: &PgPool,
    account_id: Uuid,
    at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE accounts SET last_activity = $1 WHERE id = $2")
        .bind(at)
        .bind(account_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Applies the admin-editable fields, keeping current values where the
/// caller passed nothing.
pub async fn update_account(
    tx: &mut PgTransaction<'_>,
    account_id: Uuid,
    role: Option<AccountRole>,
    is_active: Option<bool>,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        "UPDATE accounts \
         SET role = COALESCE($1, role), \
             is_active = COALESCE($2, is_active), \
             first_name = COALESCE($3, first_name), \
             last_name = COALESCE($4, last_name) \
         WHERE id = $5 \
         RETURNING id, email, username, password_hash, first_name, last_name, \
         LOWER(role) as role, is_active, email_verified, email_verification_token_hash, \
         email_verification_sent_at, password_reset_token_hash, password_reset_sent_at, \
         created_at, last_login, last_activity",
    )
    .bind(role.map(|r| r.as_str()))
    .bind(is_active)
    .bind(first_name)
    .bind(last_name)
    .bind(account_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Removes an account; sessions and API tokens go with it via cascade.
pub async fn delete_account(
    tx: &mut PgTransaction<'_>,
    account_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
        .bind(account_id)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected() > 0)
}
