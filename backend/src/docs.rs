#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use crate::{
    handlers::{
        admin::audit_logs::{
            AuditEntryResponse, AuditLogExportQuery, AuditLogListQuery, AuditLogListResponse,
        },
        tokens::ScopeInfo,
    },
    models::{
        account::{
            AccountResponse, AuthResponse, BootstrapAdminRequest, ChangePasswordRequest,
            ConfirmationRequest, CreateAccountRequest, LoginRequest, PasswordResetConfirm,
            PasswordResetRequest, RefreshRequest, RegisterRequest, UpdateAccountRequest,
        },
        api_token::{
            ApiTokenCreatedResponse, ApiTokenResponse, CreateApiTokenRequest,
            UpdateApiTokenRequest,
        },
        session::SessionResponse,
    },
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        register_doc,
        login_doc,
        refresh_doc,
        logout_doc,
        me_doc,
        bootstrap_create_admin_doc,
        change_password_doc,
        password_reset_request_doc,
        password_reset_confirm_doc,
        verify_email_doc,
        resend_verification_doc,
        list_sessions_doc,
        revoke_session_doc,
        list_scopes_doc,
        list_api_tokens_doc,
        create_api_token_doc,
        get_api_token_doc,
        update_api_token_doc,
        revoke_api_token_doc,
        rotate_api_token_doc,
        admin_list_users_doc,
        admin_create_user_doc,
        admin_update_user_doc,
        admin_delete_user_doc,
        admin_revoke_user_sessions_doc,
        admin_list_audit_logs_doc,
        admin_export_audit_logs_doc,
        healthz_doc
    ),
    components(
        schemas(
            // auth
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            AuthResponse,
            AccountResponse,
            BootstrapAdminRequest,
            // recovery
            ChangePasswordRequest,
            PasswordResetRequest,
            PasswordResetConfirm,
            // sessions
            SessionResponse,
            // api tokens
            CreateApiTokenRequest,
            UpdateApiTokenRequest,
            ApiTokenResponse,
            ApiTokenCreatedResponse,
            ScopeInfo,
            // admin
            CreateAccountRequest,
            UpdateAccountRequest,
            ConfirmationRequest,
            AuditEntryResponse,
            AuditLogListResponse
        )
    ),
    modifiers(&SecuritySchemes),
    tags(
        (name = "Auth", description = "Registration, login, token refresh, bootstrap"),
        (name = "Recovery", description = "Password change, password reset, email verification"),
        (name = "Sessions", description = "Own-session listing and revocation"),
        (name = "Tokens", description = "API token lifecycle and the scope catalog"),
        (name = "Admin", description = "Account administration and the audit trail")
    ),
    security(("BearerAuth" = []))
)]
pub struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();

        let mut bearer = Http::new(HttpAuthScheme::Bearer);
        bearer.bearer_format = Some("JWT or qdk_ API token".to_string());

        components.add_security_scheme("BearerAuth", SecurityScheme::Http(bearer));
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, session issued", body = AuthResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email or username already taken")
    ),
    tag = "Auth",
    security(())
)]
fn register_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login succeeded", body = AuthResponse),
        (status = 401, description = "Invalid email or password")
    ),
    tag = "Auth",
    security(())
)]
fn login_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Rotated credential pair", body = AuthResponse),
        (status = 401, description = "Refresh token invalid, expired, or already used")
    ),
    tag = "Auth",
    security(())
)]
fn refresh_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Calling session revoked", body = serde_json::Value),
        (status = 400, description = "Caller is an API token")
    ),
    tag = "Auth"
)]
fn logout_doc() {}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses((status = 200, description = "Authenticated account", body = AccountResponse)),
    tag = "Auth"
)]
fn me_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/auth/bootstrap/create-admin",
    request_body = BootstrapAdminRequest,
    responses(
        (status = 201, description = "First administrator created", body = AccountResponse),
        (status = 403, description = "An administrator already exists")
    ),
    tag = "Auth",
    security(())
)]
fn bootstrap_create_admin_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed; sessions stay alive", body = serde_json::Value),
        (status = 400, description = "Current password incorrect or new password too weak")
    ),
    tag = "Recovery"
)]
fn change_password_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/auth/password-reset/request",
    request_body = PasswordResetRequest,
    responses(
        (status = 200, description = "Generic acknowledgement, sent whether or not the email exists", body = serde_json::Value)
    ),
    tag = "Recovery",
    security(())
)]
fn password_reset_request_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/auth/password-reset/confirm",
    request_body = PasswordResetConfirm,
    responses(
        (status = 200, description = "Password replaced, every session revoked", body = serde_json::Value),
        (status = 400, description = "Token invalid or expired")
    ),
    tag = "Recovery",
    security(())
)]
fn password_reset_confirm_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/auth/verify-email/{token}",
    params(("token" = String, Path, description = "Verification token from the email link")),
    responses(
        (status = 200, description = "Email verified", body = serde_json::Value),
        (status = 400, description = "Token invalid or expired")
    ),
    tag = "Recovery",
    security(())
)]
fn verify_email_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/auth/resend-verification",
    responses(
        (status = 200, description = "Verification email sent", body = serde_json::Value),
        (status = 400, description = "Email already verified")
    ),
    tag = "Recovery"
)]
fn resend_verification_doc() {}

#[utoipa::path(
    get,
    path = "/api/v1/auth/sessions",
    responses((status = 200, description = "Active sessions of the caller", body = [SessionResponse])),
    tag = "Sessions"
)]
fn list_sessions_doc() {}

#[utoipa::path(
    delete,
    path = "/api/v1/auth/sessions/{id}",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session revoked", body = serde_json::Value),
        (status = 400, description = "Cannot revoke the current session"),
        (status = 403, description = "Session belongs to another account"),
        (status = 404, description = "Session not found")
    ),
    tag = "Sessions"
)]
fn revoke_session_doc() {}

#[utoipa::path(
    get,
    path = "/api/v1/tokens/scopes",
    responses((status = 200, description = "Scopes grantable by the caller", body = [ScopeInfo])),
    tag = "Tokens"
)]
fn list_scopes_doc() {}

#[utoipa::path(
    get,
    path = "/api/v1/tokens",
    responses((status = 200, description = "API tokens owned by the caller", body = [ApiTokenResponse])),
    tag = "Tokens"
)]
fn list_api_tokens_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/tokens",
    request_body = CreateApiTokenRequest,
    responses(
        (status = 201, description = "Token minted; the secret appears only here", body = ApiTokenCreatedResponse),
        (status = 400, description = "Unknown scope"),
        (status = 403, description = "Admin-tier scope requested by a non-admin")
    ),
    tag = "Tokens"
)]
fn create_api_token_doc() {}

#[utoipa::path(
    get,
    path = "/api/v1/tokens/{id}",
    params(("id" = String, Path, description = "Token id")),
    responses(
        (status = 200, body = ApiTokenResponse),
        (status = 404, description = "Token not found")
    ),
    tag = "Tokens"
)]
fn get_api_token_doc() {}

#[utoipa::path(
    patch,
    path = "/api/v1/tokens/{id}",
    params(("id" = String, Path, description = "Token id")),
    request_body = UpdateApiTokenRequest,
    responses(
        (status = 200, body = ApiTokenResponse),
        (status = 400, description = "Reactivation attempt or invalid scopes"),
        (status = 404, description = "Token not found")
    ),
    tag = "Tokens"
)]
fn update_api_token_doc() {}

#[utoipa::path(
    delete,
    path = "/api/v1/tokens/{id}",
    params(("id" = String, Path, description = "Token id")),
    responses(
        (status = 200, description = "Token revoked", body = serde_json::Value),
        (status = 400, description = "Token already revoked"),
        (status = 404, description = "Token not found")
    ),
    tag = "Tokens"
)]
fn revoke_api_token_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/tokens/{id}/rotate",
    params(("id" = String, Path, description = "Token id")),
    responses(
        (status = 200, description = "Replacement token with the same scopes and expiry", body = ApiTokenCreatedResponse),
        (status = 400, description = "Token already revoked"),
        (status = 404, description = "Token not found")
    ),
    tag = "Tokens"
)]
fn rotate_api_token_doc() {}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    responses((status = 200, body = [AccountResponse])),
    tag = "Admin"
)]
fn admin_list_users_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, body = AccountResponse),
        (status = 409, description = "Email or username already taken")
    ),
    tag = "Admin"
)]
fn admin_create_user_doc() {}

#[utoipa::path(
    patch,
    path = "/api/v1/admin/users/{id}",
    params(("id" = String, Path, description = "Account id")),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, body = AccountResponse),
        (status = 404, description = "User not found")
    ),
    tag = "Admin"
)]
fn admin_update_user_doc() {}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    params(("id" = String, Path, description = "Account id")),
    request_body = ConfirmationRequest,
    responses(
        (status = 200, description = "Account and its sessions deleted", body = serde_json::Value),
        (status = 400, description = "Confirmation mismatch or self-deletion"),
        (status = 404, description = "User not found")
    ),
    tag = "Admin"
)]
fn admin_delete_user_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/revoke-sessions",
    params(("id" = String, Path, description = "Account id")),
    request_body = ConfirmationRequest,
    responses(
        (status = 200, description = "All sessions of the account revoked", body = serde_json::Value),
        (status = 400, description = "Confirmation mismatch"),
        (status = 404, description = "User not found")
    ),
    tag = "Admin"
)]
fn admin_revoke_user_sessions_doc() {}

#[utoipa::path(
    get,
    path = "/api/v1/admin/audit-logs",
    params(AuditLogListQuery),
    responses((status = 200, body = AuditLogListResponse)),
    tag = "Admin"
)]
fn admin_list_audit_logs_doc() {}

#[utoipa::path(
    get,
    path = "/api/v1/admin/audit-logs/export",
    params(AuditLogExportQuery),
    responses((status = 200, description = "CSV attachment", content_type = "text/csv")),
    tag = "Admin"
)]
fn admin_export_audit_logs_doc() {}

#[utoipa::path(
    get,
    path = "/healthz",
    responses((status = 200, description = "Service is up", body = serde_json::Value)),
    tag = "Auth",
    security(())
)]
fn healthz_doc() {}
