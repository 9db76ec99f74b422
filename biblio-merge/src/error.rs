//! Run-level error types for biblio-merge
//!
//! Per-cluster failures (`MergeError`, `AuditorError`) never abort a run and
//! live in [`crate::types`]. The errors here stop the dispatcher.

use thiserror::Error;

/// Fatal pipeline error
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The Record Store could not be read or written; aborts the run
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[source] biblio_common::Error),

    /// A worker died while processing a batch; that batch is lost
    #[error("Worker crashed on batch {}: {message}", display_batch(.batch))]
    WorkerCrash {
        batch: Option<usize>,
        message: String,
    },

    /// Invalid pipeline configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

fn display_batch(batch: &Option<usize>) -> String {
    batch.map_or_else(|| "?".to_string(), |b| b.to_string())
}

impl PipelineError {
    pub fn is_storage(&self) -> bool {
        matches!(self, PipelineError::StorageUnavailable(_))
    }
}

impl From<biblio_common::Error> for PipelineError {
    fn from(err: biblio_common::Error) -> Self {
        match err {
            biblio_common::Error::Config(msg) => PipelineError::Config(msg),
            other => PipelineError::StorageUnavailable(other),
        }
    }
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        PipelineError::StorageUnavailable(biblio_common::Error::Database(err))
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
