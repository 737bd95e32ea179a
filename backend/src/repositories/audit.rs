use chrono::{DateTime, Utc};
use sqlx::postgres::PgTransaction;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::audit_log::{AuditEntry, NewAuditEntry};

#[derive(Debug, Clone, Default)]
pub struct AuditFilters {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub actor_id: Option<Uuid>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
}

/// Appends one audit row. Runs inside the mutation's transaction, so an
/// insert failure rolls the mutation back with it.
pub async fn insert_audit_entry(
    tx: &mut PgTransaction<'_>,
    entry: &NewAuditEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_logs \
         (id, actor_id, action, resource_type, resource_id, details, ip, user_agent, \
         request_id, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(Uuid::new_v4())
    .bind(entry.actor_id)
    .bind(&entry.action)
    .bind(&entry.resource_type)
    .bind(&entry.resource_id)
    .bind(entry.details.as_ref().map(Json))
    .bind(&entry.ip)
    .bind(&entry.user_agent)
    .bind(&entry.request_id)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await
    .map(|_| ())
}

pub async fn list_audit_entries(
    pool: &PgPool,
    filters: &AuditFilters,
    per_page: i64,
    offset: i64,
) -> Result<(Vec<AuditEntry>, i64), sqlx::Error> {
    let items = query_audit_entries(pool, filters, Some((per_page, offset)), None).await?;

    let mut count_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM audit_logs");
    let mut count_has_clause = false;
    apply_audit_filters(&mut count_builder, &mut count_has_clause, filters);
    let total = count_builder
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;

    Ok((items, total))
}

pub async fn export_audit_entries(
    pool: &PgPool,
    filters: &AuditFilters,
    max_rows: i64,
) -> Result<Vec<AuditEntry>, sqlx::Error> {
    query_audit_entries(pool, filters, None, Some(max_rows)).await
}

async fn query_audit_entries(
    pool: &PgPool,
    filters: &AuditFilters,
    pagination: Option<(i64, i64)>,
    limit: Option<i64>,
) -> Result<Vec<AuditEntry>, sqlx::Error> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT id, actor_id, action, resource_type, resource_id, details, ip, user_agent, \
         request_id, created_at FROM audit_logs",
    );
    let mut has_clause = false;
    apply_audit_filters(&mut builder, &mut has_clause, filters);
    builder.push(" ORDER BY created_at DESC, id DESC");

    if let Some((per_page, offset)) = pagination {
        builder
            .push(" LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind(offset);
    } else if let Some(limit) = limit {
        builder.push(" LIMIT ").push_bind(limit);
    }

    builder.build_query_as::<AuditEntry>().fetch_all(pool).await
}

fn apply_audit_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    has_clause: &mut bool,
    filters: &AuditFilters,
) {
    if let Some(from) = filters.from.as_ref() {
        push_clause(builder, has_clause);
        builder.push("created_at >= ").push_bind(from.to_owned());
    }
    if let Some(to) = filters.to.as_ref() {
        push_clause(builder, has_clause);
        builder.push("created_at <= ").push_bind(to.to_owned());
    }
    if let Some(actor_id) = filters.actor_id.as_ref() {
        push_clause(builder, has_clause);
        builder.push("actor_id = ").push_bind(actor_id.to_owned());
    }
    if let Some(action) = filters.action.as_ref() {
        push_clause(builder, has_clause);
        builder.push("action = ").push_bind(action.to_string());
    }
    if let Some(resource_type) = filters.resource_type.as_ref() {
        push_clause(builder, has_clause);
        builder
            .push("resource_type = ")
            .push_bind(resource_type.to_string());
    }
    if let Some(resource_id) = filters.resource_id.as_ref() {
        push_clause(builder, has_clause);
        builder
            .push("resource_id = ")
            .push_bind(resource_id.to_string());
    }
}

fn push_clause(builder: &mut QueryBuilder<'_, Postgres>, has_clause: &mut bool) {
    if *has_clause {
        builder.push(" AND ");
    } else {
        builder.push(" WHERE ");
        *has_clause = true;
    }
}
