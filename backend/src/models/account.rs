//! Models for accounts, authentication payloads, and role metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::validation::rules;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// Database representation of an account.
pub struct Account {
    pub id: Uuid,
    /// Login identifier, stored lowercase.
    pub email: String,
    /// Optional unique display handle.
    pub username: Option<String>,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: AccountRole,
    pub is_active: bool,
    pub email_verified: bool,
    /// SHA-256 hash of the outstanding verification token, if any.
    pub email_verification_token_hash: Option<String>,
    pub email_verification_sent_at: Option<DateTime<Utc>>,
    /// SHA-256 hash of the outstanding reset token, if any.
    pub password_reset_token_hash: Option<String>,
    pub password_reset_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema, Default)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
/// Supported account roles stored in the database.
pub enum AccountRole {
    /// Read-mostly role granted at self-service registration.
    #[default]
    Viewer,
    /// Administrator role with elevated permissions.
    Admin,
}

impl AccountRole {
    /// Returns the canonical snake_case representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Viewer => "viewer",
            AccountRole::Admin => "admin",
        }
    }
}

impl Serialize for AccountRole {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AccountRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            // primary canonical values (snake_case)
            "viewer" => Ok(AccountRole::Viewer),
            "admin" => Ok(AccountRole::Admin),
            // tolerate common legacy casings
            "Viewer" | "VIEWER" => Ok(AccountRole::Viewer),
            "Admin" | "ADMIN" => Ok(AccountRole::Admin),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &["viewer", "admin"],
            )),
        }
    }
}

impl Account {
    /// Constructs a new account with a freshly generated identifier.
    pub fn new(email: String, password_hash: String, role: AccountRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            username: None,
            password_hash,
            first_name: None,
            last_name: None,
            role,
            is_active: true,
            email_verified: false,
            email_verification_token_hash: None,
            email_verification_sent_at: None,
            password_reset_token_hash: None,
            password_reset_sent_at: None,
            created_at: Utc::now(),
            last_login: None,
            last_activity: None,
        }
    }

    /// Returns `true` when the account holds the `Admin` role.
    pub fn is_admin(&self) -> bool {
        matches!(self.role, AccountRole::Admin)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
/// Payload for self-service registration.
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(custom(function = "rules::validate_password_strength"))]
    pub password: String,
    #[serde(default)]
    #[validate(custom(function = "rules::validate_username"))]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
/// Credentials submitted by an account attempting to authenticate.
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
/// Payload carrying the signed refresh token to rotate a session.
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
/// Payload submitted when an account changes its own password.
pub struct ChangePasswordRequest {
    /// Existing password that will be verified before applying the change.
    pub current_password: String,
    /// Replacement password that will be stored if verification succeeds.
    #[validate(custom(function = "rules::validate_password_strength"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
/// Payload for requesting a password reset email.
pub struct PasswordResetRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
/// Payload for completing a password reset with an emailed token.
pub struct PasswordResetConfirm {
    #[validate(length(min = 32, message = "Invalid reset token"))]
    pub token: String,
    #[validate(custom(function = "rules::validate_password_strength"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
/// Payload for creating the first administrator while none exists.
pub struct BootstrapAdminRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(custom(function = "rules::validate_password_strength"))]
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
/// Payload for creating an account through the admin surface.
pub struct CreateAccountRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(custom(function = "rules::validate_password_strength"))]
    pub password: String,
    #[serde(default)]
    pub role: AccountRole,
    #[serde(default)]
    #[validate(custom(function = "rules::validate_username"))]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
/// Payload for updating portions of an account through the admin surface.
pub struct UpdateAccountRequest {
    pub role: Option<AccountRole>,
    pub is_active: Option<bool>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
/// Echo-back confirmation required by destructive admin operations.
pub struct ConfirmationRequest {
    /// Must match the target account's email exactly.
    pub confirm: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
/// Public-facing representation of an account returned by the API.
pub struct AccountResponse {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        AccountResponse {
            id: account.id,
            email: account.email,
            username: account.username,
            first_name: account.first_name,
            last_name: account.last_name,
            role: account.role.as_str().to_string(),
            is_active: account.is_active,
            email_verified: account.email_verified,
            created_at: account.created_at,
            last_login: account.last_login,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
/// Credential pair returned after login, registration, and refresh.
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub user: AccountResponse,
}

impl AuthResponse {
    pub fn new(access_token: String, refresh_token: String, account: Account) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            user: AccountResponse::from(account),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn account_role_serde_accepts_and_emits_snake_case() {
        let v: AccountRole = serde_json::from_str("\"viewer\"").unwrap();
        let a: AccountRole = serde_json::from_str("\"admin\"").unwrap();
        assert!(matches!(v, AccountRole::Viewer));
        assert!(matches!(a, AccountRole::Admin));

        // Tolerate legacy casings
        let v2: AccountRole = serde_json::from_str("\"Viewer\"").unwrap();
        let a2: AccountRole = serde_json::from_str("\"ADMIN\"").unwrap();
        assert!(matches!(v2, AccountRole::Viewer));
        assert!(matches!(a2, AccountRole::Admin));

        let sv = serde_json::to_value(AccountRole::Viewer).unwrap();
        let sa = serde_json::to_value(AccountRole::Admin).unwrap();
        assert_eq!(sv, Value::String("viewer".into()));
        assert_eq!(sa, Value::String("admin".into()));
    }

    #[test]
    fn account_response_never_exposes_secrets() {
        let account = Account::new(
            "alice@example.com".to_string(),
            "hash".to_string(),
            AccountRole::Admin,
        );
        let json = serde_json::to_value(AccountResponse::from(account)).unwrap();
        assert_eq!(json["role"], "admin");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password_reset_token_hash").is_none());
        assert!(json.get("email_verification_token_hash").is_none());
    }

    #[test]
    fn register_request_enforces_password_strength() {
        let weak = RegisterRequest {
            email: "new@example.com".into(),
            password: "short".into(),
            username: None,
            first_name: None,
            last_name: None,
        };
        assert!(weak.validate().is_err());

        let strong = RegisterRequest {
            email: "new@example.com".into(),
            password: "Sturdy1Password".into(),
            username: Some("new_user".into()),
            first_name: None,
            last_name: None,
        };
        assert!(strong.validate().is_ok());
    }

    #[test]
    fn auth_response_uses_bearer_token_type() {
        let account = Account::new(
            "bob@example.com".to_string(),
            "hash".to_string(),
            AccountRole::Viewer,
        );
        let response = AuthResponse::new("acc".into(), "ref".into(), account);
        assert_eq!(response.token_type, "bearer");
        assert_eq!(response.user.email, "bob@example.com");
    }
}
