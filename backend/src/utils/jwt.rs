//! Signed session credentials.
//!
//! Access and refresh tokens are HS256 JWTs carrying a `type` claim so
//! one can never stand in for the other. The `jti` of each half matches
//! the token-id pair stored on the owning session row; the row, not the
//! signature, is authoritative for liveness.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Account id.
    pub sub: String,
    pub role: String,
    /// Matches `sessions.access_token_id`.
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(rename = "type")]
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Account id.
    pub sub: String,
    /// Matches `sessions.refresh_token_id`.
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(rename = "type")]
    pub token_type: String,
}

impl AccessClaims {
    pub fn new(account_id: String, role: String, jti: String, expiration_hours: u64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(expiration_hours as i64);

        Self {
            sub: account_id,
            role,
            jti,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            token_type: TOKEN_TYPE_ACCESS.to_string(),
        }
    }
}

impl RefreshClaims {
    pub fn new(account_id: String, jti: String, expiration_days: u64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::days(expiration_days as i64);

        Self {
            sub: account_id,
            jti,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            token_type: TOKEN_TYPE_REFRESH.to_string(),
        }
    }
}

pub fn create_access_token(
    account_id: String,
    role: String,
    jti: String,
    secret: &str,
    expiration_hours: u64,
) -> anyhow::Result<String> {
    let claims = AccessClaims::new(account_id, role, jti, expiration_hours);
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;

    Ok(token)
}

pub fn create_refresh_token(
    account_id: String,
    jti: String,
    secret: &str,
    expiration_days: u64,
) -> anyhow::Result<String> {
    let claims = RefreshClaims::new(account_id, jti, expiration_days);
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;

    Ok(token)
}

pub fn verify_access_token(token: &str, secret: &str) -> anyhow::Result<AccessClaims> {
    let validation = Validation::default();
    let token_data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )?;

    if token_data.claims.token_type != TOKEN_TYPE_ACCESS {
        anyhow::bail!("Not an access token");
    }

    Ok(token_data.claims)
}

pub fn verify_refresh_token(token: &str, secret: &str) -> anyhow::Result<RefreshClaims> {
    let validation = Validation::default();
    let token_data = decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )?;

    if token_data.claims.token_type != TOKEN_TYPE_REFRESH {
        anyhow::bail!("Not a refresh token");
    }

    Ok(token_data.claims)
}
