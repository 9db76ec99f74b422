//! Merge Worker
//!
//! Processes one batch: merge each cluster, run the Auditor Set over the
//! union record, and collect the results. A cluster whose merge or audit
//! fails is recorded as a [`ClusterFailure`] and skipped; the rest of the
//! batch carries on.
//!
//! Runs synchronously on the blocking pool and never touches the store.

use crate::auditors::AuditorSet;
use crate::models::Cluster;
use crate::types::{BatchOutcome, ClusterFailure, MergeFunction, MergedCluster};
use std::sync::Arc;
use tracing::{debug, warn};

/// Shareable merge + audit step
#[derive(Clone)]
pub struct MergeWorker {
    merge_fn: Arc<dyn MergeFunction>,
    auditors: Arc<AuditorSet>,
}

impl MergeWorker {
    pub fn new(merge_fn: Arc<dyn MergeFunction>, auditors: Arc<AuditorSet>) -> Self {
        Self { merge_fn, auditors }
    }

    pub fn auditors(&self) -> &AuditorSet {
        &self.auditors
    }

    /// Merge and audit every cluster of a batch
    pub fn process_batch(&self, batch_index: usize, clusters: Vec<Cluster>) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            batch_index,
            merged: Vec::with_capacity(clusters.len()),
            failures: Vec::new(),
        };

        for cluster in clusters {
            match self.process_cluster(cluster) {
                Ok(merged) => outcome.merged.push(merged),
                Err(failure) => {
                    warn!(
                        cluster_id = failure.cluster_id,
                        batch = batch_index,
                        stage = failure.stage.as_str(),
                        actor = failure.actor.as_deref().unwrap_or(""),
                        error = %failure.message,
                        "Cluster skipped"
                    );
                    outcome.failures.push(failure);
                }
            }
        }

        debug!(
            batch = batch_index,
            merged = outcome.merged.len(),
            failed = outcome.failures.len(),
            "Batch processed"
        );

        outcome
    }

    fn process_cluster(&self, cluster: Cluster) -> Result<MergedCluster, ClusterFailure> {
        let cluster_id = cluster.cluster_id;

        let union = self
            .merge_fn
            .merge(cluster_id, &cluster.records)
            .map_err(|e| ClusterFailure::merge(cluster_id, self.merge_fn.name(), &e))?;

        let (record, trail) = self
            .auditors
            .run(union)
            .map_err(|f| ClusterFailure::audit(cluster_id, &f.auditor, &f.error))?;

        Ok(MergedCluster {
            cluster_id,
            record,
            trail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merging::DocumentMerger;
    use crate::models::{Document, Record};
    use crate::types::FailureStage;
    use serde_json::json;

    fn cluster(cluster_id: i64, body: serde_json::Value) -> Cluster {
        Cluster::new(
            cluster_id,
            vec![Record::new(
                format!("rec-{}", cluster_id),
                Document::from_value(body).unwrap(),
            )],
        )
    }

    fn worker() -> MergeWorker {
        MergeWorker::new(Arc::new(DocumentMerger::new()), Arc::new(AuditorSet::default()))
    }

    #[test]
    fn test_trail_per_cluster_in_auditor_order() {
        let outcome = worker().process_batch(
            0,
            vec![cluster(1, json!({"instanceOf": {}})), cluster(2, json!({}))],
        );

        assert_eq!(outcome.merged.len(), 2);
        assert!(outcome.failures.is_empty());
        for merged in &outcome.merged {
            assert_eq!(merged.trail.actor_sequence(), worker().auditors().names());
        }
    }

    #[test]
    fn test_failures_do_not_abort_batch() {
        let outcome = worker().process_batch(
            3,
            vec![
                cluster(1, json!({})),
                cluster(2, json!({"instanceOf": 7})),
                Cluster::new(3, vec![]),
                cluster(4, json!({"partOf": "oops"})),
                cluster(5, json!({})),
            ],
        );

        assert_eq!(outcome.batch_index, 3);
        assert_eq!(
            outcome.merged.iter().map(|m| m.cluster_id).collect::<Vec<_>>(),
            vec![1, 5]
        );

        let failures: Vec<(i64, FailureStage)> = outcome
            .failures
            .iter()
            .map(|f| (f.cluster_id, f.stage))
            .collect();
        assert_eq!(
            failures,
            vec![
                (2, FailureStage::Merge),
                (3, FailureStage::Merge),
                (4, FailureStage::Audit)
            ]
        );
        assert_eq!(outcome.failures[2].actor.as_deref(), Some("IssnAuditor"));
    }
}
