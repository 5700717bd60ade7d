//! Audit recorder: one append-only document per completed request.
//!
//! The document captures the plan before and after pruning and a diff
//! between the two. Persisting it is best effort; the planner logs an
//! [`AuditError`] and carries on.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::plan::CandidatePlan;
use crate::pruning::{PassRecord, PassState, PruningOutcome};
use crate::validate::Violation;

/// How many allocation deltas a diff keeps.
pub const MAX_DELTAS: usize = 5;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit document could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("audit backend failed: {0:#}")]
    Backend(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationAllocation {
    pub publication_id: i64,
    pub publication_name: String,
    pub total: f64,
}

/// Totals of one plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSnapshot {
    /// Declared by the collaborator.
    pub total_cost: Option<f64>,
    /// Sum of the line items as billed.
    pub line_item_total: f64,
    pub publications: Vec<PublicationAllocation>,
}

impl PlanSnapshot {
    /// Snapshot `plan`, pricing lines at `catalog` rates when given.
    pub fn of(plan: &CandidatePlan, catalog: Option<&Catalog>) -> Self {
        Self {
            total_cost: plan.total_cost,
            line_item_total: plan.billed_total(catalog),
            publications: plan
                .selected_publications
                .iter()
                .map(|p| PublicationAllocation {
                    publication_id: p.publication_id,
                    publication_name: p.publication_name.clone(),
                    total: p.billed_total(catalog),
                })
                .collect(),
        }
    }

    fn totals(&self) -> BTreeMap<i64, (&str, f64)> {
        let mut map = BTreeMap::new();
        for p in &self.publications {
            let entry = map.entry(p.publication_id).or_insert((p.publication_name.as_str(), 0.0));
            entry.1 += p.total;
        }
        map
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationDelta {
    pub publication_id: i64,
    pub publication_name: String,
    pub before: f64,
    pub after: f64,
    pub delta: f64,
}

/// What pruning changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDiff {
    pub removed_publications: Vec<i64>,
    pub added_publications: Vec<i64>,
    /// Largest changes by magnitude, at most [`MAX_DELTAS`].
    pub largest_deltas: Vec<AllocationDelta>,
}

impl PlanDiff {
    pub fn between(before: &PlanSnapshot, after: &PlanSnapshot) -> Self {
        let old = before.totals();
        let new = after.totals();

        let removed_publications = old.keys().filter(|id| !new.contains_key(id)).copied().collect();
        let added_publications = new.keys().filter(|id| !old.contains_key(id)).copied().collect();

        let mut ids: Vec<i64> = old.keys().chain(new.keys()).copied().collect();
        ids.sort_unstable();
        ids.dedup();

        let mut deltas: Vec<AllocationDelta> = ids
            .into_iter()
            .filter_map(|id| {
                let (name_before, before) = old.get(&id).copied().unwrap_or(("", 0.0));
                let (name_after, after) = new.get(&id).copied().unwrap_or(("", 0.0));
                let delta = after - before;
                if delta.abs() < f64::EPSILON {
                    return None;
                }
                let name = if name_after.is_empty() { name_before } else { name_after };
                Some(AllocationDelta {
                    publication_id: id,
                    publication_name: name.to_string(),
                    before,
                    after,
                    delta,
                })
            })
            .collect();
        deltas.sort_by(|a, b| {
            b.delta
                .abs()
                .total_cmp(&a.delta.abs())
                .then(a.publication_id.cmp(&b.publication_id))
        });
        deltas.truncate(MAX_DELTAS);

        Self {
            removed_publications,
            added_publications,
            largest_deltas: deltas,
        }
    }
}

/// The persisted record of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditDocument {
    pub request_id: Uuid,
    pub hub_id: String,
    pub profile_id: String,
    pub budget: f64,
    pub state: PassState,
    pub passes_used: u8,
    pub calls_made: u8,
    /// Hex SHA-256 of the initial task description.
    pub prompt_sha256: String,
    pub before: PlanSnapshot,
    pub after: PlanSnapshot,
    pub diff: PlanDiff,
    pub violations: Vec<Violation>,
    pub warnings: Vec<String>,
    pub history: Vec<PassRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub early_stop: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditDocument {
    pub fn from_outcome(
        request_id: Uuid,
        hub_id: &str,
        profile_id: &str,
        budget: f64,
        outcome: &PruningOutcome,
        catalog: Option<&Catalog>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let before = PlanSnapshot::of(&outcome.initial_plan, catalog);
        let after = PlanSnapshot::of(&outcome.plan, catalog);
        let diff = PlanDiff::between(&before, &after);

        Self {
            request_id,
            hub_id: hub_id.to_string(),
            profile_id: profile_id.to_string(),
            budget,
            state: outcome.state,
            passes_used: outcome.passes_used,
            calls_made: outcome.calls_made,
            prompt_sha256: hex::encode(Sha256::digest(outcome.task.as_bytes())),
            before,
            after,
            diff,
            violations: outcome.verdict.violations.clone(),
            warnings: outcome.verdict.warnings.clone(),
            history: outcome.history.clone(),
            early_stop: outcome.early_stop.clone(),
            created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Append-only sink for audit documents.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn record(&self, document: &AuditDocument) -> Result<(), AuditError>;
}

/// Discards every document.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditStore;

#[async_trait]
impl AuditStore for NoopAuditStore {
    async fn record(&self, _document: &AuditDocument) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Keeps documents in memory.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    documents: StdMutex<Vec<AuditDocument>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> Vec<AuditDocument> {
        self.documents
            .lock()
            .map(|docs| docs.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn record(&self, document: &AuditDocument) -> Result<(), AuditError> {
        let mut docs = self
            .documents
            .lock()
            .map_err(|_| anyhow::anyhow!("audit buffer lock poisoned"))?;
        docs.push(document.clone());
        Ok(())
    }
}

/// Appends one JSON document per line to a file.
#[derive(Debug)]
pub struct JsonlAuditStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlAuditStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every document back, oldest first. A missing file is empty.
    pub async fn read_all(&self) -> Result<Vec<AuditDocument>, AuditError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(AuditError::from))
            .collect()
    }
}

#[async_trait]
impl AuditStore for JsonlAuditStore {
    async fn record(&self, document: &AuditDocument) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(document)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
