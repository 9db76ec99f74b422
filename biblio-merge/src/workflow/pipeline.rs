//! Pipeline entry point
//!
//! # Example
//! ```rust,ignore
//! let store = RecordStore::open(Path::new("records.sqlite3")).await?;
//! let report = MergePipeline::new(Arc::new(DocumentMerger::new()), AuditorSet::default())
//!     .run(&store, &config, &CancellationToken::new())
//!     .await?;
//! ```

use crate::auditors::AuditorSet;
use crate::config::MergeConfig;
use crate::db::RecordStore;
use crate::error::PipelineResult;
use crate::services::{BatchDispatcher, MergeWorker, ResultCommitter, RunReport};
use crate::types::MergeFunction;
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

/// One merge function plus an ordered Auditor Set
pub struct MergePipeline {
    merge_fn: Arc<dyn MergeFunction>,
    auditors: Arc<AuditorSet>,
}

impl MergePipeline {
    pub fn new(merge_fn: Arc<dyn MergeFunction>, auditors: AuditorSet) -> Self {
        Self {
            merge_fn,
            auditors: Arc::new(auditors),
        }
    }

    /// Run one full merge pass over `store`
    ///
    /// Claims the store's writer, so a store handle supports one run.
    /// With `config.clear` set, prior finalized rows are removed first.
    pub async fn run(
        &self,
        store: &RecordStore,
        config: &MergeConfig,
        cancel: &CancellationToken,
    ) -> PipelineResult<RunReport> {
        config.validate()?;

        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!(
            run_id = %run_id,
            database = %store.path().display(),
            merge_fn = self.merge_fn.name(),
            auditors = ?self.auditors.names(),
            started_at = %started_at.to_rfc3339(),
            "Merge pipeline starting"
        );

        let mut writer = store.writer(&run_id).await?;
        if config.clear {
            writer.clear_all_finalized().await?;
        }

        let mut reader = store.reader(config.page_size);
        let mut committer = ResultCommitter::new(writer);
        let worker = MergeWorker::new(Arc::clone(&self.merge_fn), Arc::clone(&self.auditors));
        let dispatcher = BatchDispatcher::new(config.dispatch(), worker, run_id.as_str());

        let report = dispatcher.run(&mut reader, &mut committer, cancel).await?;

        info!(
            run_id = %report.run_id,
            elapsed_ms = (Utc::now() - started_at).num_milliseconds(),
            last_cluster_id = ?reader.last_cluster_id(),
            "Merge pipeline finished"
        );

        Ok(report)
    }
}
