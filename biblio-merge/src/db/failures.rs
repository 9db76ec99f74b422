//! Per-cluster failure log
//!
//! Rows are written by [`super::FinalizedWriter::record_failure`] in the same
//! transaction as the batch they belong to. Kept apart from audit trails: a
//! failure here means the cluster produced no finalized row at all.

use biblio_common::Result;
use sqlx::SqlitePool;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct FailureRow {
    pub run_id: String,
    pub cluster_id: i64,
    pub stage: String,
    pub actor: Option<String>,
    pub message: String,
}

/// Load failures, optionally restricted to one run
pub async fn load_failures(pool: &SqlitePool, run_id: Option<&str>) -> Result<Vec<FailureRow>> {
    let rows = sqlx::query_as::<_, FailureRow>(
        r#"
        SELECT run_id, cluster_id, stage, actor, message
        FROM merge_failures
        WHERE (?1 IS NULL OR run_id = ?1)
        ORDER BY id
        "#,
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
