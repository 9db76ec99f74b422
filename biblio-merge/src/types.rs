//! Core Types and Trait Definitions for biblio-merge
//!
//! Defines the seams of the cluster-merge pipeline:
//! - **MergeFunction**: reduces a cluster's records into one union record
//! - **Auditor**: one ordered check over `(record, trail)`
//! - **ClusterSource**: lazy, paged supply of clusters (read side of the store)
//! - **ResultSink**: the single writer that finalizes completed batches
//!
//! Merge functions and auditors are synchronous. They run on the blocking
//! thread pool, receive owned inputs, and never touch the Record Store.

use crate::error::PipelineResult;
use crate::models::{AuditTrail, Cluster, Record, UnionRecord};
use thiserror::Error;

// ============================================================================
// Merge Function
// ============================================================================

/// Reduces the ordered records of one cluster into a union record
///
/// Must be deterministic for identical ordered input.
pub trait MergeFunction: Send + Sync {
    /// Name for logging and failure records
    fn name(&self) -> &str;

    /// Merge `records` (in stored order) into the union record for `cluster_id`
    fn merge(&self, cluster_id: i64, records: &[Record]) -> Result<UnionRecord, MergeError>;
}

/// Per-cluster merge failure
#[derive(Debug, Error)]
pub enum MergeError {
    /// Cluster had no records to merge
    #[error("Cluster has no records")]
    EmptyCluster,

    /// A constituent record lacks structure the merge requires
    #[error("Invalid record {record_id}: {message}")]
    InvalidRecord { record_id: String, message: String },

    /// Field values could not be reconciled
    #[error("Conflict resolution failed: {0}")]
    Conflict(String),

    /// Internal processing error
    #[error("Internal error: {0}")]
    Internal(String),
}

// ============================================================================
// Auditor
// ============================================================================

/// One ordered check in the Auditor Set
///
/// Takes the record and trail by value and returns them. An auditor may only
/// append its own events to the trail.
pub trait Auditor: Send + Sync {
    /// Actor name written into every event this auditor appends
    fn name(&self) -> &str;

    fn audit(
        &self,
        record: UnionRecord,
        trail: AuditTrail,
    ) -> Result<(UnionRecord, AuditTrail), AuditorError>;
}

/// Per-auditor-step failure
///
/// Distinct from a `false` result in the trail: this means the check itself
/// could not be carried out.
#[derive(Debug, Error)]
pub enum AuditorError {
    /// Field required by the check is malformed
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// Check could not be evaluated
    #[error("Check failed: {0}")]
    CheckFailed(String),

    /// Internal processing error
    #[error("Internal error: {0}")]
    Internal(String),
}

// ============================================================================
// Batch results
// ============================================================================

/// Which stage rejected a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Merge,
    Audit,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Merge => "merge",
            FailureStage::Audit => "audit",
        }
    }
}

/// A cluster that was skipped because merge or audit failed
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterFailure {
    pub cluster_id: i64,
    pub stage: FailureStage,
    /// Merge function or auditor name
    pub actor: Option<String>,
    pub message: String,
}

impl ClusterFailure {
    pub fn merge(cluster_id: i64, merger: &str, err: &MergeError) -> Self {
        Self {
            cluster_id,
            stage: FailureStage::Merge,
            actor: Some(merger.to_string()),
            message: err.to_string(),
        }
    }

    pub fn audit(cluster_id: i64, auditor: &str, err: &AuditorError) -> Self {
        Self {
            cluster_id,
            stage: FailureStage::Audit,
            actor: Some(auditor.to_string()),
            message: err.to_string(),
        }
    }
}

/// One successfully merged and audited cluster
#[derive(Debug, Clone, PartialEq)]
pub struct MergedCluster {
    pub cluster_id: i64,
    pub record: UnionRecord,
    pub trail: AuditTrail,
}

/// Everything a worker produced for one batch
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Submission index of the batch (0-based)
    pub batch_index: usize,
    pub merged: Vec<MergedCluster>,
    pub failures: Vec<ClusterFailure>,
}

/// Rows written by one committed batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub finalized: usize,
    pub failures: usize,
}

// ============================================================================
// Record Store seams
// ============================================================================

/// Read side of the Record Store: clusters in pages
#[async_trait::async_trait]
pub trait ClusterSource: Send {
    /// Next page of clusters, `None` once exhausted
    ///
    /// # Errors
    /// `StorageUnavailable` when the store cannot be read. No internal retry.
    async fn next_page(&mut self) -> PipelineResult<Option<Vec<Cluster>>>;
}

/// Write side of the Record Store, held by exactly one component
#[async_trait::async_trait]
pub trait ResultSink: Send {
    /// Write every row of a drained batch and commit once
    async fn commit_batch(&mut self, outcome: BatchOutcome) -> PipelineResult<CommitSummary>;
}
