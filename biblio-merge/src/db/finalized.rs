//! Finalized table access
//!
//! [`FinalizedWriter`] is the only code path that writes merge output. It owns
//! the one-connection writer pool, opens a transaction lazily on the first
//! row of a batch and commits it as a unit.

use crate::models::{AuditTrail, UnionRecord};
use crate::types::ClusterFailure;
use crate::utils::{begin_monitored, MonitoredTransaction};
use biblio_common::{Error, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

/// Write capability over `finalized` and `merge_failures`
pub struct FinalizedWriter {
    pool: SqlitePool,
    run_id: String,
    tx: Option<MonitoredTransaction>,
    pending_rows: usize,
}

impl FinalizedWriter {
    pub fn new(pool: SqlitePool, run_id: &str) -> Self {
        Self {
            pool,
            run_id: run_id.to_string(),
            tx: None,
            pending_rows: 0,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Rows written since the last commit or rollback
    pub fn pending_rows(&self) -> usize {
        self.pending_rows
    }

    async fn transaction(&mut self) -> Result<&mut Transaction<'static, Sqlite>> {
        if self.tx.is_none() {
            self.tx = Some(begin_monitored(&self.pool, "FinalizedWriter").await?);
        }
        match self.tx.as_mut() {
            Some(tx) => tx.inner_mut(),
            None => Err(Error::Internal("writer transaction missing".to_string())),
        }
    }

    /// Stage one finalized row for `cluster_id`
    pub async fn write_finalized(
        &mut self,
        cluster_id: i64,
        record: &UnionRecord,
        trail: &AuditTrail,
    ) -> Result<()> {
        let data = serde_json::to_string(record)?;
        let audit_events = serde_json::to_string(trail)?;
        let run_id = self.run_id.clone();

        let tx = self.transaction().await?;
        sqlx::query(
            "INSERT INTO finalized (cluster_id, data, audit_events, run_id) VALUES (?, ?, ?, ?)",
        )
        .bind(cluster_id)
        .bind(data)
        .bind(audit_events)
        .bind(run_id)
        .execute(&mut **tx)
        .await?;

        self.pending_rows += 1;
        Ok(())
    }

    /// Stage one per-cluster failure
    pub async fn record_failure(&mut self, failure: &ClusterFailure) -> Result<()> {
        let run_id = self.run_id.clone();

        let tx = self.transaction().await?;
        sqlx::query(
            "INSERT INTO merge_failures (run_id, cluster_id, stage, actor, message) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(run_id)
        .bind(failure.cluster_id)
        .bind(failure.stage.as_str())
        .bind(failure.actor.as_deref())
        .bind(&failure.message)
        .execute(&mut **tx)
        .await?;

        self.pending_rows += 1;
        Ok(())
    }

    /// Commit staged rows, returning how many were made durable
    pub async fn commit(&mut self) -> Result<usize> {
        let rows = std::mem::take(&mut self.pending_rows);
        match self.tx.take() {
            Some(tx) => {
                tx.commit().await?;
                debug!(rows, "Committed finalized batch");
                Ok(rows)
            }
            None => Ok(0),
        }
    }

    /// Discard staged rows
    pub async fn rollback(&mut self) -> Result<()> {
        self.pending_rows = 0;
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }

    /// Remove prior finalized rows for `cluster_ids` before a re-run
    pub async fn clear_finalized(&mut self, cluster_ids: &[i64]) -> Result<u64> {
        self.ensure_idle("clear_finalized")?;
        if cluster_ids.is_empty() {
            return Ok(0);
        }

        let mut tx = begin_monitored(&self.pool, "clear_finalized").await?;
        let mut removed = 0;
        for cluster_id in cluster_ids {
            removed += sqlx::query("DELETE FROM finalized WHERE cluster_id = ?")
                .bind(cluster_id)
                .execute(&mut **tx.inner_mut()?)
                .await?
                .rows_affected();
        }
        tx.commit().await?;

        info!(clusters = cluster_ids.len(), removed, "Cleared finalized rows");
        Ok(removed)
    }

    /// Remove every finalized row
    pub async fn clear_all_finalized(&mut self) -> Result<u64> {
        self.ensure_idle("clear_all_finalized")?;

        let removed = sqlx::query("DELETE FROM finalized")
            .execute(&self.pool)
            .await?
            .rows_affected();

        info!(removed, "Cleared all finalized rows");
        Ok(removed)
    }

    fn ensure_idle(&self, op: &str) -> Result<()> {
        if self.tx.is_some() {
            return Err(Error::Internal(format!(
                "{}: uncommitted batch still open",
                op
            )));
        }
        Ok(())
    }
}

/// One stored finalized row
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedRow {
    pub cluster_id: i64,
    pub record: UnionRecord,
    pub trail: AuditTrail,
    pub run_id: String,
}

/// Load all finalized rows ordered by cluster id
pub async fn load_finalized(pool: &SqlitePool) -> Result<Vec<FinalizedRow>> {
    let rows: Vec<(i64, String, String, String)> = sqlx::query_as(
        "SELECT cluster_id, data, audit_events, run_id FROM finalized ORDER BY cluster_id, id",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(cluster_id, data, audit_events, run_id)| -> Result<FinalizedRow> {
            Ok(FinalizedRow {
                cluster_id,
                record: serde_json::from_str(&data)?,
                trail: serde_json::from_str(&audit_events)?,
                run_id,
            })
        })
        .collect()
}

pub async fn count_finalized(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM finalized")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
