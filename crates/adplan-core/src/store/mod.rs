//! PostgreSQL-backed collaborators: catalog source and audit store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::warn;

use adplan_db::models::{AuditState, NewAudit, PublicationRow};
use adplan_db::queries::{audits, publications};

use crate::audit::{AuditDocument, AuditError, AuditStore};
use crate::catalog::{CatalogSource, RawPublication};
use crate::pruning::PassState;

/// Reads publication documents from the `publications` table.
#[derive(Debug, Clone)]
pub struct PgCatalogSource {
    pool: PgPool,
}

impl PgCatalogSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogSource for PgCatalogSource {
    async fn publications_for_hub(&self, hub_id: &str) -> Result<Vec<RawPublication>> {
        let rows = publications::publications_for_hub(&self.pool, hub_id).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            match decode_publication(&row) {
                Ok(publication) => out.push(publication),
                Err(e) => warn!(publication_id = row.id, error = %e, "skipping unreadable publication document"),
            }
        }
        Ok(out)
    }
}

/// Decode a stored document. The row's id and name fill in when the
/// document omits them.
fn decode_publication(row: &PublicationRow) -> Result<RawPublication> {
    let mut document = row.document.clone();
    if let Some(obj) = document.as_object_mut() {
        obj.entry("publicationId")
            .or_insert_with(|| serde_json::Value::from(row.id));
        if !obj.contains_key("name") && !obj.contains_key("publicationName") {
            obj.insert("name".to_string(), serde_json::Value::from(row.name.clone()));
        }
    }
    serde_json::from_value(document)
        .with_context(|| format!("publication {} has an invalid document", row.id))
}

/// Writes audit documents to the `planning_audits` table.
#[derive(Debug, Clone)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn record(&self, document: &AuditDocument) -> Result<(), AuditError> {
        let audit = new_audit(document)?;
        audits::insert_audit(&self.pool, &audit).await?;
        Ok(())
    }
}

fn new_audit(document: &AuditDocument) -> Result<NewAudit, AuditError> {
    let state = match document.state {
        PassState::Accepted => AuditState::Accepted,
        PassState::Exhausted => AuditState::Exhausted,
        other => {
            return Err(AuditError::Backend(anyhow::anyhow!(
                "cannot record a request in non-terminal state {other}"
            )));
        }
    };

    Ok(NewAudit {
        request_id: document.request_id,
        hub_id: document.hub_id.clone(),
        profile_id: document.profile_id.clone(),
        state,
        passes_used: i16::from(document.passes_used),
        calls_made: i16::from(document.calls_made),
        initial_total: Some(document.before.line_item_total),
        final_total: Some(document.after.line_item_total),
        prompt_sha256: document.prompt_sha256.clone(),
        document: serde_json::to_value(document)?,
        created_at: document.created_at,
    })
}
