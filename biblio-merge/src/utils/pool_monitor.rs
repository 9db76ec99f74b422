//! Write transaction monitoring
//!
//! Wraps the writer's SQLite transaction and logs how long the single write
//! connection was held, so slow batch flushes show up in the logs.

use biblio_common::{Error, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::time::Instant;

/// Monitored transaction wrapper that logs acquisition and release timing
pub struct MonitoredTransaction {
    tx: Option<Transaction<'static, Sqlite>>,
    caller: &'static str,
    acquired_at: Instant,
}

impl MonitoredTransaction {
    /// Commit the transaction and log release timing
    pub async fn commit(mut self) -> Result<()> {
        let tx = self.take("commit")?;
        tx.commit().await.map_err(Error::Database)?;
        self.log_release("commit");
        Ok(())
    }

    /// Roll back the transaction and log release timing
    pub async fn rollback(mut self) -> Result<()> {
        let tx = self.take("rollback")?;
        tx.rollback().await.map_err(Error::Database)?;
        self.log_release("rollback");
        Ok(())
    }

    /// Mutable access to the open transaction
    pub fn inner_mut(&mut self) -> Result<&mut Transaction<'static, Sqlite>> {
        let caller = self.caller;
        self.tx
            .as_mut()
            .ok_or_else(|| Error::Internal(format!("{}: transaction already consumed", caller)))
    }

    fn take(&mut self, op: &str) -> Result<Transaction<'static, Sqlite>> {
        self.tx.take().ok_or_else(|| {
            Error::Internal(format!("{}: {} on consumed transaction", self.caller, op))
        })
    }

    fn log_release(&self, how: &'static str) {
        let held_ms = self.acquired_at.elapsed().as_millis();
        if held_ms > 2000 {
            tracing::warn!(
                caller = self.caller,
                held_ms = held_ms,
                how,
                "LONG TRANSACTION - write connection held for extended period"
            );
        } else if held_ms > 1000 {
            tracing::info!(
                caller = self.caller,
                held_ms = held_ms,
                how,
                "Transaction held longer than expected (>1s)"
            );
        } else {
            tracing::debug!(
                caller = self.caller,
                held_ms = held_ms,
                how,
                "Write connection released"
            );
        }
    }
}

impl Drop for MonitoredTransaction {
    fn drop(&mut self) {
        if self.tx.is_some() {
            // sqlx rolls back on drop; this is the error path
            let held_ms = self.acquired_at.elapsed().as_millis();
            tracing::warn!(
                caller = self.caller,
                held_ms = held_ms,
                "Transaction dropped without commit, pending writes rolled back"
            );
        }
    }
}

/// Begin a monitored transaction on `pool`
///
/// Logs slow connection acquisition: with a one-connection writer pool a long
/// wait means some other holder of the write path is still busy.
pub async fn begin_monitored(
    pool: &SqlitePool,
    caller: &'static str,
) -> Result<MonitoredTransaction> {
    let start = Instant::now();

    tracing::debug!(caller = caller, "Write connection requested");

    let tx = pool.begin().await.map_err(Error::Database)?;

    let wait_ms = start.elapsed().as_millis();
    if wait_ms > 1000 {
        tracing::warn!(
            caller = caller,
            wait_ms = wait_ms,
            "SLOW WRITE CONNECTION ACQUISITION - writer busy"
        );
    } else {
        tracing::debug!(caller = caller, wait_ms = wait_ms, "Write connection acquired");
    }

    Ok(MonitoredTransaction {
        tx: Some(tx),
        caller,
        acquired_at: Instant::now(),
    })
}
