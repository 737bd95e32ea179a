#![allow(dead_code)]
use chrono::{DateTime, Duration, Utc};
use quarterdeck_backend::{
    config::Config,
    models::account::{Account, AccountRole},
    models::api_token::ApiToken,
    models::session::Session,
    repositories::{account as account_repo, api_token as token_repo, session as session_repo},
    utils::{
        api_token::{generate_api_token, hash_api_token},
        jwt::{create_access_token, create_refresh_token},
        password::hash_password,
    },
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration as StdDuration};
use uuid::Uuid;

/// Satisfies the strength rules used by registration and reset payloads.
pub const TEST_PASSWORD: &str = "Sup3rSecretPass1";

pub fn test_config() -> Config {
    Config {
        database_url: env::var("TEST_DATABASE_URL").unwrap_or_default(),
        bind_addr: "127.0.0.1:0".into(),
        jwt_secret: "a_secure_token_that_is_long_enough_123".into(),
        access_token_expiration_hours: 1,
        refresh_token_expiration_days: 7,
        environment: "test".into(),
        password_reset_expiration_hours: 24,
        email_verification_expiration_days: 7,
        cors_allow_origins: vec!["*".into()],
    }
}

/// Connects to `TEST_DATABASE_URL` and applies migrations. Returns `None`
/// (after printing a skip notice) when the variable is unset, so the
/// DB-bound integration tests degrade to no-ops on machines without a
/// test database.
pub async fn try_test_pool() -> Option<PgPool> {
    env::set_var("SMTP_SKIP_SEND", "true");
    let Ok(database_url) = env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping DB-bound test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(StdDuration::from_secs(30))
        .connect(&database_url)
        .await
        .expect("connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");

    Some(pool)
}

/// Clears every table. Bootstrap tests need a database with zero admins.
pub async fn reset_database(pool: &PgPool) {
    sqlx::query("TRUNCATE TABLE audit_logs, sessions, api_tokens, accounts CASCADE")
        .execute(pool)
        .await
        .expect("truncate tables");
}

pub async fn seed_account(pool: &PgPool, role: AccountRole) -> Account {
    seed_account_with_password(pool, role, TEST_PASSWORD).await
}

pub async fn seed_account_with_password(
    pool: &PgPool,
    role: AccountRole,
    password: &str,
) -> Account {
    let account = Account::new(
        format!("user_{}@example.com", Uuid::new_v4()),
        hash_password(password).expect("hash password"),
        role,
    );

    let mut tx = pool.begin().await.expect("begin");
    let account = account_repo::create_account(&mut tx, &account)
        .await
        .expect("insert account");
    tx.commit().await.expect("commit");
    account
}

pub struct TestSession {
    pub session: Session,
    pub access_token: String,
    pub refresh_token: String,
}

/// Opens a real session row and mints the matching JWT pair, exactly the
/// way the login handler does.
pub async fn open_session(pool: &PgPool, config: &Config, account: &Account) -> TestSession {
    let now = Utc::now();
    let access_token_id = Uuid::new_v4().to_string();
    let refresh_token_id = Uuid::new_v4().to_string();

    let mut tx = pool.begin().await.expect("begin");
    let session = session_repo::create_session(
        &mut tx,
        account.id,
        &access_token_id,
        &refresh_token_id,
        now + Duration::hours(config.access_token_expiration_hours as i64),
        now + Duration::days(config.refresh_token_expiration_days as i64),
        Some("integration-test"),
        Some("127.0.0.1"),
        Some("Test Device"),
    )
    .await
    .expect("insert session");
    tx.commit().await.expect("commit");

    let access_token = create_access_token(
        account.id.to_string(),
        account.role.as_str().to_string(),
        access_token_id,
        &config.jwt_secret,
        config.access_token_expiration_hours,
    )
    .expect("mint access token");
    let refresh_token = create_refresh_token(
        account.id.to_string(),
        refresh_token_id,
        &config.jwt_secret,
        config.refresh_token_expiration_days,
    )
    .expect("mint refresh token");

    TestSession {
        session,
        access_token,
        refresh_token,
    }
}

/// Mints a stored API token and returns the row plus the full literal
/// value (the part a client would put in the Authorization header).
pub async fn seed_api_token(
    pool: &PgPool,
    config: &Config,
    account_id: Uuid,
    scopes: &[&str],
    expires_at: Option<DateTime<Utc>>,
) -> (ApiToken, String) {
    let generated = generate_api_token(&config.environment);
    let token_hash = hash_api_token(&generated.value).expect("hash token");
    let token = ApiToken::new(
        account_id,
        "integration token".into(),
        generated.prefix,
        token_hash,
        scopes.iter().map(|s| s.to_string()).collect(),
        expires_at,
    );

    let mut tx = pool.begin().await.expect("begin");
    let created = token_repo::create_api_token(&mut tx, &token)
        .await
        .expect("insert api token");
    tx.commit().await.expect("commit");

    (created, generated.value)
}
