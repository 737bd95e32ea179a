//! The authenticated caller as seen by handlers after the auth middleware.

use uuid::Uuid;

use crate::models::account::Account;

/// Which credential authenticated the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialKind {
    Session {
        session_id: Uuid,
        /// `jti` of the presented access token.
        access_token_id: String,
    },
    ApiToken {
        token_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct Principal {
    pub account: Account,
    /// Scopes granted to the presenting API token; `None` for sessions,
    /// which carry the account's full authority instead.
    pub token_scopes: Option<Vec<String>>,
    pub kind: CredentialKind,
}

impl Principal {
    pub fn from_session(account: Account, session_id: Uuid, access_token_id: String) -> Self {
        Self {
            account,
            token_scopes: None,
            kind: CredentialKind::Session {
                session_id,
                access_token_id,
            },
        }
    }

    pub fn from_api_token(account: Account, token_id: Uuid, scopes: Vec<String>) -> Self {
        Self {
            account,
            token_scopes: Some(scopes),
            kind: CredentialKind::ApiToken { token_id },
        }
    }

    /// `jti` of the access token behind this request, if it is a session.
    pub fn access_token_id(&self) -> Option<&str> {
        match &self.kind {
            CredentialKind::Session {
                access_token_id, ..
            } => Some(access_token_id),
            CredentialKind::ApiToken { .. } => None,
        }
    }

    pub fn session_id(&self) -> Option<Uuid> {
        match &self.kind {
            CredentialKind::Session { session_id, .. } => Some(*session_id),
            CredentialKind::ApiToken { .. } => None,
        }
    }
}
