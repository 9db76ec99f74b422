//! Result Committer
//!
//! The sole holder of the Record Store write capability. Each drained batch
//! is written in one transaction: every finalized row and every per-cluster
//! failure of the batch become durable together, or not at all.

use crate::db::FinalizedWriter;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{BatchOutcome, CommitSummary, ResultSink};
use tracing::{debug, error};

pub struct ResultCommitter {
    writer: FinalizedWriter,
    committed_batches: usize,
}

impl ResultCommitter {
    pub fn new(writer: FinalizedWriter) -> Self {
        Self {
            writer,
            committed_batches: 0,
        }
    }

    pub fn committed_batches(&self) -> usize {
        self.committed_batches
    }

    async fn write_batch(&mut self, outcome: &BatchOutcome) -> PipelineResult<CommitSummary> {
        for merged in &outcome.merged {
            self.writer
                .write_finalized(merged.cluster_id, &merged.record, &merged.trail)
                .await?;
        }
        for failure in &outcome.failures {
            self.writer.record_failure(failure).await?;
        }
        self.writer.commit().await?;

        Ok(CommitSummary {
            finalized: outcome.merged.len(),
            failures: outcome.failures.len(),
        })
    }
}

#[async_trait::async_trait]
impl ResultSink for ResultCommitter {
    async fn commit_batch(&mut self, outcome: BatchOutcome) -> PipelineResult<CommitSummary> {
        match self.write_batch(&outcome).await {
            Ok(summary) => {
                self.committed_batches += 1;
                debug!(
                    batch = outcome.batch_index,
                    finalized = summary.finalized,
                    failures = summary.failures,
                    "Batch committed"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(batch = outcome.batch_index, error = %e, "Batch commit failed, rolling back");
                if let Err(rollback_err) = self.writer.rollback().await {
                    error!(error = %rollback_err, "Rollback failed");
                }
                Err(match e {
                    PipelineError::StorageUnavailable(_) => e,
                    other => PipelineError::StorageUnavailable(biblio_common::Error::Internal(
                        other.to_string(),
                    )),
                })
            }
        }
    }
}
