//! `adplan audit` commands: read planning audit records.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use adplan_db::models::AuditRow;
use adplan_db::queries::audits;

use crate::AuditCommands;

pub async fn run_audit_command(command: AuditCommands, pool: &PgPool) -> Result<()> {
    match command {
        AuditCommands::Show { request_id } => cmd_show(pool, &request_id).await,
        AuditCommands::List { hub, limit } => cmd_list(pool, hub.as_deref(), limit).await,
    }
}

async fn cmd_show(pool: &PgPool, request_id_str: &str) -> Result<()> {
    let request_id = Uuid::parse_str(request_id_str)
        .with_context(|| format!("invalid request ID: {request_id_str}"))?;

    let row = audits::get_audit(pool, request_id)
        .await?
        .with_context(|| format!("no audit recorded for request {request_id}"))?;

    print!("{}", render_detail(&row)?);
    Ok(())
}

async fn cmd_list(pool: &PgPool, hub: Option<&str>, limit: i64) -> Result<()> {
    let rows = audits::list_audits(pool, hub, limit).await?;
    if rows.is_empty() {
        println!("No audit records found.");
        return Ok(());
    }
    print!("{}", render_table(&rows));
    Ok(())
}

fn amount(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string())
}

fn render_detail(row: &AuditRow) -> Result<String> {
    let mut out = String::new();
    out.push_str(&format!("Request: {}\n", row.request_id));
    out.push_str(&format!("Hub: {}\n", row.hub_id));
    out.push_str(&format!("Profile: {}\n", row.profile_id));
    out.push_str(&format!("State: {}\n", row.state));
    out.push_str(&format!(
        "Passes: {} ({} calls)\n",
        row.passes_used, row.calls_made
    ));
    out.push_str(&format!(
        "Total: {} -> {}\n",
        amount(row.initial_total),
        amount(row.final_total)
    ));
    out.push_str(&format!("Prompt SHA-256: {}\n", row.prompt_sha256));
    out.push_str(&format!(
        "Recorded: {}\n\n",
        row.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    let document =
        serde_json::to_string_pretty(&row.document).context("failed to render audit document")?;
    out.push_str(&document);
    out.push('\n');
    Ok(out)
}

fn render_table(rows: &[AuditRow]) -> String {
    let mut out = format!(
        "{:<38} {:<16} {:<18} {:<10} {:>6} {:>12} {:>12}\n",
        "REQUEST", "HUB", "PROFILE", "STATE", "PASSES", "INITIAL", "FINAL"
    );
    out.push_str(&format!("{}\n", "-".repeat(118)));
    for row in rows {
        out.push_str(&format!(
            "{:<38} {:<16} {:<18} {:<10} {:>6} {:>12} {:>12}\n",
            row.request_id,
            row.hub_id,
            row.profile_id,
            row.state,
            row.passes_used,
            amount(row.initial_total),
            amount(row.final_total)
        ));
    }
    out
}
