//! Record Store access for biblio-merge
//!
//! The store is an embedded SQLite file. Reads and upstream seeding go through
//! a small shared pool; merge output goes through a one-connection pool handed
//! out exactly once per [`RecordStore`] handle, so a run has a single writer.

pub mod clusters;
pub mod failures;
pub mod finalized;
pub mod records;

pub use clusters::ClusterReader;
pub use failures::{load_failures, FailureRow};
pub use finalized::{count_finalized, load_finalized, FinalizedRow, FinalizedWriter};
pub use records::{assign_cluster, insert_converted};

use crate::error::{PipelineError, PipelineResult};
use crate::models::Cluster;
use futures::Stream;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Connections in the read pool
const READ_POOL_SIZE: u32 = 4;

/// Explicit handle on one Record Store file
pub struct RecordStore {
    path: PathBuf,
    read_pool: SqlitePool,
    writer_claimed: AtomicBool,
}

impl RecordStore {
    /// Open (creating if needed) the store at `path` and ensure its schema
    pub async fn open(path: &Path) -> PipelineResult<Self> {
        let read_pool = biblio_common::db::init_database(path, READ_POOL_SIZE)
            .await
            .map_err(PipelineError::StorageUnavailable)?;

        Ok(Self {
            path: path.to_path_buf(),
            read_pool,
            writer_claimed: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Shared pool for reads and upstream seeding
    ///
    /// The connections are writable so conversion tooling can fill
    /// `converted` and `cluster`. Merge output never goes through here: only
    /// the [`FinalizedWriter`] from [`RecordStore::writer`] writes `finalized`
    /// and `merge_failures`.
    pub fn pool(&self) -> &SqlitePool {
        &self.read_pool
    }

    /// Paged reader over all clusters, from the beginning
    pub fn reader(&self, page_size: usize) -> ClusterReader {
        ClusterReader::new(self.read_pool.clone(), page_size)
    }

    /// Lazy sequence of `(cluster_id, ordered records)`
    pub fn clusters_grouped(
        &self,
        page_size: usize,
    ) -> impl Stream<Item = PipelineResult<Cluster>> + Send {
        self.reader(page_size).into_stream()
    }

    /// Claim the write capability for a run
    ///
    /// # Errors
    /// `Config` if the writer was already claimed from this handle.
    pub async fn writer(&self, run_id: &str) -> PipelineResult<FinalizedWriter> {
        if self.writer_claimed.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::Config(format!(
                "writer for {} already claimed",
                self.path.display()
            )));
        }

        let pool = match biblio_common::db::open_writer_pool(&self.path).await {
            Ok(pool) => pool,
            Err(e) => {
                self.writer_claimed.store(false, Ordering::SeqCst);
                return Err(PipelineError::StorageUnavailable(e));
            }
        };

        Ok(FinalizedWriter::new(pool, run_id))
    }

    pub async fn close(self) {
        self.read_pool.close().await;
    }
}
