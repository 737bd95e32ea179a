//! Scope catalog and the authorization gate.
//!
//! The catalog is a fixed table: scope validation is a pure lookup with no
//! shared mutable state. API tokens are checked against their literal scope
//! set; session credentials fall back to the account role, where only
//! admin-tier scopes are restricted.

use std::collections::HashMap;
use std::sync::OnceLock;

use thiserror::Error;

use crate::error::AppError;
use crate::models::account::AccountRole;
use crate::models::principal::Principal;

/// Full-access scope. A token holding it passes every scope check.
pub const SCOPE_ADMIN: &str = "admin";

pub const SCOPE_TOKENS_READ: &str = "tokens:read";
pub const SCOPE_TOKENS_WRITE: &str = "tokens:write";
pub const SCOPE_USERS_READ: &str = "users:read";
pub const SCOPE_USERS_WRITE: &str = "users:write";
pub const SCOPE_USERS_DELETE: &str = "users:delete";

#[derive(Debug, Clone, Copy)]
pub struct ScopeDef {
    pub name: &'static str,
    pub description: &'static str,
    /// Restricted to admin-role accounts: non-admins can neither mint
    /// tokens carrying it nor reach it through the session fallback.
    pub admin_tier: bool,
}

pub const CATALOG: &[ScopeDef] = &[
    ScopeDef {
        name: "customers:read",
        description: "Read customer records",
        admin_tier: false,
    },
    ScopeDef {
        name: "customers:write",
        description: "Create and update customer records",
        admin_tier: false,
    },
    ScopeDef {
        name: "customers:delete",
        description: "Delete customer records",
        admin_tier: false,
    },
    ScopeDef {
        name: "deployments:read",
        description: "Read deployments and their status",
        admin_tier: false,
    },
    ScopeDef {
        name: "deployments:write",
        description: "Create, update and trigger deployments",
        admin_tier: false,
    },
    ScopeDef {
        name: "deployments:delete",
        description: "Delete deployments",
        admin_tier: false,
    },
    ScopeDef {
        name: "secrets:read",
        description: "Read secret metadata",
        admin_tier: false,
    },
    ScopeDef {
        name: "secrets:write",
        description: "Create and update secrets",
        admin_tier: false,
    },
    ScopeDef {
        name: "secrets:delete",
        description: "Delete secrets",
        admin_tier: false,
    },
    ScopeDef {
        name: SCOPE_USERS_READ,
        description: "Read user accounts",
        admin_tier: true,
    },
    ScopeDef {
        name: SCOPE_USERS_WRITE,
        description: "Create and update user accounts",
        admin_tier: true,
    },
    ScopeDef {
        name: SCOPE_USERS_DELETE,
        description: "Delete user accounts",
        admin_tier: true,
    },
    ScopeDef {
        name: "groups:read",
        description: "Read groups and memberships",
        admin_tier: false,
    },
    ScopeDef {
        name: "groups:write",
        description: "Create and update groups and memberships",
        admin_tier: true,
    },
    ScopeDef {
        name: SCOPE_TOKENS_READ,
        description: "List and inspect own API tokens",
        admin_tier: false,
    },
    ScopeDef {
        name: SCOPE_TOKENS_WRITE,
        description: "Create, update, rotate and revoke own API tokens",
        admin_tier: false,
    },
    ScopeDef {
        name: SCOPE_ADMIN,
        description: "Full access to every operation",
        admin_tier: true,
    },
];

fn index() -> &'static HashMap<&'static str, &'static ScopeDef> {
    static INDEX: OnceLock<HashMap<&'static str, &'static ScopeDef>> = OnceLock::new();
    INDEX.get_or_init(|| CATALOG.iter().map(|def| (def.name, def)).collect())
}

pub fn lookup(name: &str) -> Option<&'static ScopeDef> {
    index().get(name).copied()
}

pub fn is_admin_tier(name: &str) -> bool {
    lookup(name).map(|def| def.admin_tier).unwrap_or(false)
}

/// Catalog entries the given role may request on a token.
pub fn catalog_for_role(role: AccountRole) -> Vec<&'static ScopeDef> {
    CATALOG
        .iter()
        .filter(|def| !def.admin_tier || role == AccountRole::Admin)
        .collect()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeError {
    #[error("Unknown scope: {0}")]
    Unknown(String),
    #[error("Scope `{0}` requires the admin role")]
    AdminOnly(String),
}

impl From<ScopeError> for AppError {
    fn from(err: ScopeError) -> Self {
        match err {
            ScopeError::Unknown(_) => AppError::BadRequest(err.to_string()),
            ScopeError::AdminOnly(_) => AppError::Forbidden(err.to_string()),
        }
    }
}

/// Validates a requested scope set for token creation or update.
///
/// Unknown names are rejected, admin-tier names require the admin role,
/// duplicates are dropped with the first occurrence kept in place.
pub fn validate_scopes(requested: &[String], role: AccountRole) -> Result<Vec<String>, ScopeError> {
    let mut accepted: Vec<String> = Vec::with_capacity(requested.len());
    for scope in requested {
        let def = lookup(scope).ok_or_else(|| ScopeError::Unknown(scope.clone()))?;
        if def.admin_tier && role != AccountRole::Admin {
            return Err(ScopeError::AdminOnly(scope.clone()));
        }
        if !accepted.iter().any(|seen| seen == scope) {
            accepted.push(scope.clone());
        }
    }
    Ok(accepted)
}

/// The per-operation permission check.
///
/// API-token principals need the literal scope (or the full-access scope);
/// session principals pass unless the scope is admin-tier and the account
/// is not an admin.
pub fn authorize(principal: &Principal, required: &str) -> Result<(), AppError> {
    match &principal.token_scopes {
        Some(scopes) => {
            if scopes.iter().any(|s| s == SCOPE_ADMIN || s == required) {
                Ok(())
            } else {
                Err(AppError::Forbidden(format!(
                    "Missing required scope: {required}"
                )))
            }
        }
        None => {
            if is_admin_tier(required) && !principal.account.is_admin() {
                Err(AppError::Forbidden("Admin access required".to_string()))
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::Account;
    use uuid::Uuid;

    fn principal_with_role(role: AccountRole) -> Principal {
        let account = Account::new("ops@example.com".into(), "hash".into(), role);
        Principal::from_session(account, Uuid::new_v4(), "jti".into())
    }

    fn token_principal(scopes: &[&str]) -> Principal {
        let account = Account::new(
            "ops@example.com".into(),
            "hash".into(),
            AccountRole::Viewer,
        );
        Principal::from_api_token(
            account,
            Uuid::new_v4(),
            scopes.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn catalog_names_are_unique() {
        assert_eq!(index().len(), CATALOG.len());
    }

    #[test]
    fn unknown_scope_is_rejected() {
        let err = validate_scopes(&["nonsense:read".into()], AccountRole::Admin).unwrap_err();
        assert_eq!(err, ScopeError::Unknown("nonsense:read".into()));
    }

    #[test]
    fn admin_tier_scope_requires_admin_role() {
        let requested = vec!["users:write".to_string()];
        let err = validate_scopes(&requested, AccountRole::Viewer).unwrap_err();
        assert_eq!(err, ScopeError::AdminOnly("users:write".into()));
        assert!(validate_scopes(&requested, AccountRole::Admin).is_ok());
    }

    #[test]
    fn duplicates_are_dropped_in_order() {
        let requested = vec![
            "deployments:read".to_string(),
            "customers:read".to_string(),
            "deployments:read".to_string(),
        ];
        let accepted = validate_scopes(&requested, AccountRole::Viewer).unwrap();
        assert_eq!(accepted, vec!["deployments:read", "customers:read"]);
    }

    #[test]
    fn token_needs_the_literal_scope() {
        let principal = token_principal(&["customers:read"]);
        assert!(authorize(&principal, "customers:read").is_ok());
        assert!(matches!(
            authorize(&principal, "customers:write"),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn full_access_scope_short_circuits() {
        let principal = token_principal(&[SCOPE_ADMIN]);
        assert!(authorize(&principal, "secrets:delete").is_ok());
        assert!(authorize(&principal, "users:write").is_ok());
    }

    #[test]
    fn session_fallback_is_role_based() {
        let viewer = principal_with_role(AccountRole::Viewer);
        assert!(authorize(&viewer, "deployments:write").is_ok());
        assert!(matches!(
            authorize(&viewer, "users:write"),
            Err(AppError::Forbidden(_))
        ));

        let admin = principal_with_role(AccountRole::Admin);
        assert!(authorize(&admin, "users:write").is_ok());
    }

    #[test]
    fn viewer_catalog_hides_admin_tier_scopes() {
        let visible = catalog_for_role(AccountRole::Viewer);
        assert!(visible.iter().all(|def| !def.admin_tier));
        let full = catalog_for_role(AccountRole::Admin);
        assert_eq!(full.len(), CATALOG.len());
    }
}
