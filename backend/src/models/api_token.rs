//! Models for long-lived API tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::utils::api_token::masked;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// Database representation of an API token.
///
/// Only the argon2 hash of the secret is stored; `token_prefix` keeps the
/// first characters of the issued value for lookup and display.
pub struct ApiToken {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub token_prefix: String,
    pub token_hash: String,
    pub scopes: Vec<String>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub last_used_ip: Option<String>,
    pub use_count: i64,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiToken {
    pub fn new(
        account_id: Uuid,
        name: String,
        token_prefix: String,
        token_hash: String,
        scopes: Vec<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            name,
            token_prefix,
            token_hash,
            scopes,
            is_active: true,
            expires_at,
            last_used_at: None,
            last_used_ip: None,
            use_count: 0,
            created_at: Utc::now(),
            revoked_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateApiTokenRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 1, message = "At least one scope is required"))]
    pub scopes: Vec<String>,
    /// Days until expiry; omit for a non-expiring token.
    #[validate(range(min = 1, max = 365, message = "Expiry must be 1-365 days"))]
    pub expires_in_days: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateApiTokenRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "At least one scope is required"))]
    pub scopes: Option<Vec<String>>,
    /// `false` deactivates the token. Revoked tokens cannot be reactivated.
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Public-facing representation of an API token. The secret is never
/// included; the prefix is masked for display.
pub struct ApiTokenResponse {
    pub id: Uuid,
    pub name: String,
    pub token_prefix: String,
    pub scopes: Vec<String>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub use_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<ApiToken> for ApiTokenResponse {
    fn from(token: ApiToken) -> Self {
        Self {
            id: token.id,
            name: token.name,
            token_prefix: masked(&token.token_prefix),
            scopes: token.scopes,
            is_active: token.is_active,
            expires_at: token.expires_at,
            last_used_at: token.last_used_at,
            use_count: token.use_count,
            created_at: token.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Returned once at creation or rotation; `token` is the only copy of the
/// full secret value the server ever emits.
pub struct ApiTokenCreatedResponse {
    pub token: String,
    pub api_token: ApiTokenResponse,
}

impl ApiTokenCreatedResponse {
    pub fn new(token: String, api_token: ApiToken) -> Self {
        Self {
            token,
            api_token: api_token.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn new_token_starts_active_and_unused() {
        let token = ApiToken::new(
            Uuid::new_v4(),
            "ci".into(),
            "qdk_dev_1234".into(),
            "$argon2id$stub".into(),
            vec!["deployments:read".into()],
            None,
        );
        assert!(token.is_active);
        assert_eq!(token.use_count, 0);
        assert!(token.last_used_at.is_none());
        assert!(!token.is_expired(Utc::now()));
    }

    #[test]
    fn expiry_is_inclusive_of_the_deadline() {
        let now = Utc::now();
        let mut token = ApiToken::new(
            Uuid::new_v4(),
            "ci".into(),
            "qdk_dev_1234".into(),
            "$argon2id$stub".into(),
            vec!["deployments:read".into()],
            Some(now),
        );
        assert!(token.is_expired(now));
        token.expires_at = Some(now + Duration::hours(1));
        assert!(!token.is_expired(now));
    }

    #[test]
    fn response_masks_the_prefix_and_omits_the_hash() {
        let token = ApiToken::new(
            Uuid::new_v4(),
            "ci".into(),
            "qdk_dev_1234".into(),
            "$argon2id$stub".into(),
            vec!["deployments:read".into()],
            None,
        );
        let response = ApiTokenResponse::from(token);
        assert_eq!(response.token_prefix, "qdk_dev_1234...");
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("token_hash").is_none());
    }
}
