//! Database query functions for the `publications` table.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::PublicationRow;

/// Insert or replace a publication document.
pub async fn upsert_publication(
    pool: &PgPool,
    id: i64,
    name: &str,
    hub_ids: &[String],
    document: &serde_json::Value,
) -> Result<PublicationRow> {
    let row = sqlx::query_as::<_, PublicationRow>(
        "INSERT INTO publications (id, name, hub_ids, document) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (id) DO UPDATE \
         SET name = EXCLUDED.name, hub_ids = EXCLUDED.hub_ids, \
             document = EXCLUDED.document, updated_at = now() \
         RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(hub_ids)
    .bind(document)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to upsert publication {id}"))?;

    Ok(row)
}

pub async fn get_publication(pool: &PgPool, id: i64) -> Result<Option<PublicationRow>> {
    let row = sqlx::query_as::<_, PublicationRow>("SELECT * FROM publications WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch publication")?;

    Ok(row)
}

/// Publications whose pricing programs include `hub_id`, ordered by id.
pub async fn publications_for_hub(pool: &PgPool, hub_id: &str) -> Result<Vec<PublicationRow>> {
    let rows = sqlx::query_as::<_, PublicationRow>(
        "SELECT * FROM publications WHERE $1 = ANY(hub_ids) ORDER BY id",
    )
    .bind(hub_id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to list publications for hub {hub_id}"))?;

    Ok(rows)
}

/// Delete a publication. Returns whether a row was removed.
pub async fn delete_publication(pool: &PgPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM publications WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete publication")?;

    Ok(result.rows_affected() > 0)
}
