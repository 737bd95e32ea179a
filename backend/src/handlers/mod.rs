pub mod admin;
pub mod auth;
pub mod password;
pub mod sessions;
pub mod tokens;
pub mod verification;

use axum::{http::HeaderMap, Json};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::middleware::request_id::RequestId;
use crate::models::audit_log::NewAuditEntry;
use crate::utils::net;

pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Request-scoped fields stamped onto every audit entry a handler writes.
#[derive(Debug, Clone)]
pub struct AuditContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
}

impl AuditContext {
    pub fn new(headers: &HeaderMap, request_id: Option<&RequestId>) -> Self {
        Self {
            ip: net::extract_ip(headers),
            user_agent: net::extract_user_agent(headers),
            request_id: request_id.map(|id| id.0.clone()),
        }
    }

    pub fn entry(
        &self,
        actor_id: Option<Uuid>,
        action: &'static str,
        resource_type: &'static str,
        resource_id: Option<String>,
        details: Option<Value>,
    ) -> NewAuditEntry {
        NewAuditEntry {
            actor_id,
            action: action.to_string(),
            resource_type: resource_type.to_string(),
            resource_id,
            details,
            ip: self.ip.clone(),
            user_agent: self.user_agent.clone(),
            request_id: self.request_id.clone(),
        }
    }
}
