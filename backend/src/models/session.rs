//! Models for browser sessions and their credential pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// Database representation of a session.
///
/// The (access, refresh) token-id pair is rotated in place; the row is
/// live only while `is_active` and the relevant expiry is in the future.
pub struct Session {
    pub id: Uuid,
    pub account_id: Uuid,
    /// `jti` of the current access token.
    pub access_token_id: String,
    /// `jti` of the current refresh token.
    pub refresh_token_id: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub device_name: Option<String>,
    pub is_active: bool,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_access_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now < self.access_expires_at
    }

    pub fn is_refresh_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now < self.refresh_expires_at
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Public-facing representation of a session.
pub struct SessionResponse {
    pub id: Uuid,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub device_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub is_current: bool,
}

impl SessionResponse {
    pub fn from_session(session: Session, current_access_id: Option<&str>) -> Self {
        let is_current = current_access_id
            .map(|jti| jti == session.access_token_id)
            .unwrap_or(false);
        Self {
            id: session.id,
            user_agent: session.user_agent,
            ip_address: session.ip_address,
            device_name: session.device_name,
            created_at: session.created_at,
            last_activity: session.last_activity,
            access_expires_at: session.access_expires_at,
            refresh_expires_at: session.refresh_expires_at,
            is_current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_session() -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            access_token_id: "access-jti".into(),
            refresh_token_id: "refresh-jti".into(),
            access_expires_at: now + Duration::hours(3),
            refresh_expires_at: now + Duration::days(7),
            user_agent: None,
            ip_address: None,
            device_name: None,
            is_active: true,
            last_activity: now,
            created_at: now,
            revoked_at: None,
        }
    }

    #[test]
    fn liveness_tracks_is_active_and_expiry() {
        let now = Utc::now();
        let mut session = sample_session();
        assert!(session.is_access_live(now));
        assert!(session.is_refresh_live(now));

        session.is_active = false;
        assert!(!session.is_access_live(now));
        assert!(!session.is_refresh_live(now));

        let mut expired = sample_session();
        expired.access_expires_at = now - Duration::minutes(1);
        assert!(!expired.is_access_live(now));
        assert!(expired.is_refresh_live(now));
    }

    #[test]
    fn is_current_compares_access_token_id() {
        let session = sample_session();
        let id = session.access_token_id.clone();
        let current = SessionResponse::from_session(sample_session(), Some("other"));
        assert!(!current.is_current);
        let current = SessionResponse::from_session(session, Some(&id));
        assert!(current.is_current);
    }
}
