//! Converted records and cluster assignments
//!
//! Both tables are filled upstream (conversion and deduplication). These
//! helpers are what that tooling, and the tests, use to populate a store.

use crate::models::Document;
use biblio_common::Result;
use sqlx::SqlitePool;

/// Store one converted record, returning its row id
pub async fn insert_converted(pool: &SqlitePool, source_id: &str, body: &Document) -> Result<i64> {
    let data = serde_json::to_string(body)?;

    let id = sqlx::query("INSERT INTO converted (source_id, data) VALUES (?, ?)")
        .bind(source_id)
        .bind(data)
        .execute(pool)
        .await?
        .last_insert_rowid();

    Ok(id)
}

/// Assign a converted record to a cluster
pub async fn assign_cluster(pool: &SqlitePool, cluster_id: i64, converted_id: i64) -> Result<()> {
    sqlx::query("INSERT INTO cluster (cluster_id, converted_id) VALUES (?, ?)")
        .bind(cluster_id)
        .bind(converted_id)
        .execute(pool)
        .await?;

    Ok(())
}
