//! Database query functions for the `planning_audits` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{AuditRow, NewAudit};

/// Append one audit record.
pub async fn insert_audit(pool: &PgPool, audit: &NewAudit) -> Result<AuditRow> {
    let row = sqlx::query_as::<_, AuditRow>(
        "INSERT INTO planning_audits \
         (request_id, hub_id, profile_id, state, passes_used, calls_made, \
          initial_total, final_total, prompt_sha256, document, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING *",
    )
    .bind(audit.request_id)
    .bind(&audit.hub_id)
    .bind(&audit.profile_id)
    .bind(audit.state)
    .bind(audit.passes_used)
    .bind(audit.calls_made)
    .bind(audit.initial_total)
    .bind(audit.final_total)
    .bind(&audit.prompt_sha256)
    .bind(&audit.document)
    .bind(audit.created_at)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert audit for request {}", audit.request_id))?;

    Ok(row)
}

pub async fn get_audit(pool: &PgPool, request_id: Uuid) -> Result<Option<AuditRow>> {
    let row = sqlx::query_as::<_, AuditRow>("SELECT * FROM planning_audits WHERE request_id = $1")
        .bind(request_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch audit")?;

    Ok(row)
}

/// Most recent audits first, optionally restricted to one hub.
pub async fn list_audits(pool: &PgPool, hub_id: Option<&str>, limit: i64) -> Result<Vec<AuditRow>> {
    let rows = sqlx::query_as::<_, AuditRow>(
        "SELECT * FROM planning_audits \
         WHERE $1::text IS NULL OR hub_id = $1 \
         ORDER BY created_at DESC \
         LIMIT $2",
    )
    .bind(hub_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("failed to list audits")?;

    Ok(rows)
}
