//! `adplan plan` command: run one campaign request through the engine.
//!
//! With `--catalog` the request runs offline against a JSON file of
//! publication documents and audits go to an optional JSONL file. Otherwise
//! publications are read from, and audits written to, the database.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use adplan_core::audit::{AuditStore, JsonlAuditStore, NoopAuditStore};
use adplan_core::catalog::{CatalogSource, StaticCatalogSource};
use adplan_core::store::{PgAuditStore, PgCatalogSource};
use adplan_core::{CampaignRequest, Planner, PlanningResult};
use adplan_db::pool;

use crate::config::AdplanConfig;
use crate::profiles_cmd::load_registry;

#[derive(Debug)]
pub struct PlanArgs {
    pub request: PathBuf,
    pub profile_file: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub audit_log: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

pub fn read_request(path: &Path) -> Result<CampaignRequest> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse request file {}", path.display()))
}

pub async fn run_plan(config: &AdplanConfig, args: &PlanArgs) -> Result<()> {
    let request = read_request(&args.request)?;
    let profiles = load_registry(args.profile_file.as_deref())?;
    let client = config.generator.build_client()?;

    let mut db_pool = None;
    let (catalog_source, audit): (Arc<dyn CatalogSource>, Arc<dyn AuditStore>) =
        match &args.catalog {
            Some(path) => {
                let source = StaticCatalogSource::from_json_file(path)?;
                let audit: Arc<dyn AuditStore> = match &args.audit_log {
                    Some(log) => Arc::new(JsonlAuditStore::new(log.clone())),
                    None => Arc::new(NoopAuditStore),
                };
                (Arc::new(source), audit)
            }
            None => {
                let p = pool::create_pool(&config.db_config).await?;
                let stores = (
                    Arc::new(PgCatalogSource::new(p.clone())) as Arc<dyn CatalogSource>,
                    Arc::new(PgAuditStore::new(p.clone())) as Arc<dyn AuditStore>,
                );
                db_pool = Some(p);
                stores
            }
        };

    let planner = Planner::new(profiles, catalog_source, client)
        .with_audit_store(audit)
        .with_config(config.engine.clone());

    let result = planner.plan(&request).await;
    if let Some(p) = db_pool {
        p.close().await;
    }
    let result = result?;

    let rendered = serde_json::to_string_pretty(&result).context("failed to serialize result")?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{rendered}\n"))
                .with_context(|| format!("failed to write result to {}", path.display()))?;
            eprintln!("Result written to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    eprint!("{}", summary(&result));

    Ok(())
}

/// Short human-readable summary printed alongside the JSON result.
fn summary(result: &PlanningResult) -> String {
    let p = &result.pricing;
    let mut out = format!(
        "{} publications, total {:.2} {} ({:.2} remaining)\n",
        result.selected_inventory.len(),
        p.total,
        p.currency,
        p.remaining_budget
    );
    if !result.warnings.is_empty() {
        out.push_str("Warnings:\n");
        for w in &result.warnings {
            out.push_str(&format!("  - {w}\n"));
        }
    }
    out
}
