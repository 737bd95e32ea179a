use axum::{
    extract::{Extension, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::audit_log::AuditEntry,
    models::principal::Principal,
    repositories::audit::{self as audit_repo, AuditFilters},
    scopes::{self, SCOPE_ADMIN},
    state::AppState,
    utils::csv::csv_document,
};

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_PER_PAGE: i64 = 25;
const MAX_PER_PAGE: i64 = 100;
const MAX_PAGE: i64 = 1_000;
const MAX_EXPORT_DAYS: i64 = 31;
const MAX_EXPORT_ROWS: i64 = 10_000;

#[derive(Debug, Deserialize, IntoParams)]
pub struct AuditLogListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub actor_id: Option<String>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AuditLogExportQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub actor_id: Option<String>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditEntryResponse {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub details: Option<Value>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditEntry> for AuditEntryResponse {
    fn from(entry: AuditEntry) -> Self {
        Self {
            id: entry.id,
            actor_id: entry.actor_id,
            action: entry.action,
            resource_type: entry.resource_type,
            resource_id: entry.resource_id,
            details: entry.details.map(|d| d.0),
            ip: entry.ip,
            user_agent: entry.user_agent,
            request_id: entry.request_id,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogListResponse {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub items: Vec<AuditEntryResponse>,
}

pub async fn list_audit_logs(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<AuditLogListQuery>,
) -> Result<Json<AuditLogListResponse>, AppError> {
    scopes::authorize(&principal, SCOPE_ADMIN)?;

    let page = query.page.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);
    let per_page = query
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);

    let filters = build_filters(
        query.from.as_deref(),
        query.to.as_deref(),
        query.actor_id.as_deref(),
        query.action,
        query.resource_type,
        query.resource_id,
    )?;

    let offset = (page - 1) * per_page;
    let (entries, total) =
        audit_repo::list_audit_entries(&state.pool, &filters, per_page, offset).await?;

    Ok(Json(AuditLogListResponse {
        page,
        per_page,
        total,
        items: entries.into_iter().map(AuditEntryResponse::from).collect(),
    }))
}

/// CSV export over the same filters as the list endpoint. The window is
/// capped at [`MAX_EXPORT_DAYS`] and the row count at [`MAX_EXPORT_ROWS`].
pub async fn export_audit_logs(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<AuditLogExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    scopes::authorize(&principal, SCOPE_ADMIN)?;

    let mut filters = build_filters(
        query.from.as_deref(),
        query.to.as_deref(),
        query.actor_id.as_deref(),
        query.action,
        query.resource_type,
        query.resource_id,
    )?;

    let to = filters.to.unwrap_or_else(Utc::now);
    let from = filters
        .from
        .unwrap_or_else(|| to - Duration::days(MAX_EXPORT_DAYS));
    if to - from > Duration::days(MAX_EXPORT_DAYS) {
        return Err(AppError::BadRequest(format!(
            "Export window cannot exceed {MAX_EXPORT_DAYS} days"
        )));
    }
    filters.from = Some(from);
    filters.to = Some(to);

    let entries = audit_repo::export_audit_entries(&state.pool, &filters, MAX_EXPORT_ROWS).await?;

    let header_row = [
        "id",
        "created_at",
        "actor_id",
        "action",
        "resource_type",
        "resource_id",
        "ip",
        "user_agent",
        "request_id",
        "details",
    ];
    let rows: Vec<Vec<String>> = entries
        .into_iter()
        .map(|entry| {
            vec![
                entry.id.to_string(),
                entry.created_at.to_rfc3339(),
                entry
                    .actor_id
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                entry.action,
                entry.resource_type,
                entry.resource_id.unwrap_or_default(),
                entry.ip.unwrap_or_default(),
                entry.user_agent.unwrap_or_default(),
                entry.request_id.unwrap_or_default(),
                entry.details.map(|d| d.0.to_string()).unwrap_or_default(),
            ]
        })
        .collect();
    let csv = csv_document(&header_row, &rows);

    let filename = format!("audit_logs_{}.csv", Utc::now().format("%Y%m%d%H%M%S"));
    Ok((
        [
            (
                header::CONTENT_TYPE,
                "text/csv; charset=utf-8".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    ))
}

fn build_filters(
    from: Option<&str>,
    to: Option<&str>,
    actor_id: Option<&str>,
    action: Option<String>,
    resource_type: Option<String>,
    resource_id: Option<String>,
) -> Result<AuditFilters, AppError> {
    let from = from
        .map(|value| parse_datetime_value(value, true))
        .transpose()?;
    let to = to
        .map(|value| parse_datetime_value(value, false))
        .transpose()?;
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(AppError::BadRequest(
                "`from` must not be after `to`".to_string(),
            ));
        }
    }

    let actor_id = actor_id
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            Uuid::parse_str(value)
                .map_err(|_| AppError::BadRequest("Invalid actor id".to_string()))
        })
        .transpose()?;

    Ok(AuditFilters {
        from,
        to,
        actor_id,
        action: normalize_filter(action),
        resource_type: normalize_filter(resource_type),
        resource_id: normalize_filter(resource_id),
    })
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS`, or a
/// bare date. Bare dates expand to the start or end of that day.
fn parse_datetime_value(value: &str, is_start: bool) -> Result<DateTime<Utc>, AppError> {
    let trimmed = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(parsed.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let time = if is_start {
            date.and_hms_opt(0, 0, 0)
        } else {
            date.and_hms_opt(23, 59, 59)
        };
        if let Some(datetime) = time {
            return Ok(datetime.and_utc());
        }
    }

    Err(AppError::BadRequest(format!(
        "Invalid datetime value: {trimmed}"
    )))
}

fn normalize_filter(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
