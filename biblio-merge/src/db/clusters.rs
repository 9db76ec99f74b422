//! Cluster Reader
//!
//! Groups stored records by cluster id and hands them out in pages ordered by
//! `cluster_id`. Each page is a fresh keyset query (`cluster_id > last seen`),
//! so no read cursor stays open while the writer commits, and a reader can be
//! restarted from any position with [`ClusterReader::resume_after`].
//!
//! Storage errors surface as `StorageUnavailable`; there is no retry here.

use crate::error::{PipelineError, PipelineResult};
use crate::models::{Cluster, Document, Record};
use crate::types::ClusterSource;
use futures::Stream;
use sqlx::SqlitePool;
use tracing::{debug, warn};

/// Paged, restartable reader over `cluster` joined with `converted`
pub struct ClusterReader {
    pool: SqlitePool,
    page_size: usize,
    last_cluster_id: Option<i64>,
    exhausted: bool,
}

impl ClusterReader {
    pub fn new(pool: SqlitePool, page_size: usize) -> Self {
        Self {
            pool,
            page_size: page_size.max(1),
            last_cluster_id: None,
            exhausted: false,
        }
    }

    /// Continue after `cluster_id` instead of from the beginning
    pub fn resume_after(mut self, cluster_id: i64) -> Self {
        self.last_cluster_id = Some(cluster_id);
        self.exhausted = false;
        self
    }

    /// Highest cluster id handed out so far
    pub fn last_cluster_id(&self) -> Option<i64> {
        self.last_cluster_id
    }

    /// Fetch the next page of clusters, `None` once exhausted
    pub async fn next_page(&mut self) -> PipelineResult<Option<Vec<Cluster>>> {
        if self.exhausted {
            return Ok(None);
        }

        // LEFT JOIN keeps a row for every selected cluster id, so an empty
        // result means no clusters remain, not that a page had no records
        let rows: Vec<(i64, Option<String>, Option<String>)> = sqlx::query_as(
            r#"
            SELECT c.cluster_id, v.source_id, v.data
            FROM cluster c
            LEFT JOIN converted v ON v.id = c.converted_id
            WHERE c.cluster_id IN (
                SELECT DISTINCT cluster_id FROM cluster
                WHERE (?1 IS NULL OR cluster_id > ?1)
                ORDER BY cluster_id
                LIMIT ?2
            )
            ORDER BY c.cluster_id, v.id
            "#,
        )
        .bind(self.last_cluster_id)
        .bind(self.page_size as i64)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }

        let mut page: Vec<Cluster> = Vec::new();
        for (cluster_id, source_id, data) in rows {
            if page.last().map(|c| c.cluster_id) != Some(cluster_id) {
                page.push(Cluster::new(cluster_id, Vec::new()));
            }

            // Dangling assignment: the cluster is still handed out, and one
            // with no resolvable records fails downstream as an empty cluster
            let (Some(source_id), Some(data)) = (source_id, data) else {
                warn!(cluster_id, "Cluster assignment without a converted record");
                continue;
            };

            let body: Document = serde_json::from_str(&data).map_err(|e| {
                PipelineError::StorageUnavailable(biblio_common::Error::Serialization(e))
            })?;
            if let Some(cluster) = page.last_mut() {
                cluster.records.push(Record::new(source_id, body));
            }
        }

        self.last_cluster_id = page.last().map(|c| c.cluster_id);

        debug!(
            clusters = page.len(),
            last_cluster_id = ?self.last_cluster_id,
            "Read cluster page"
        );

        Ok(Some(page))
    }

    /// Flatten the pages into a lazy stream of clusters
    pub fn into_stream(mut self) -> impl Stream<Item = PipelineResult<Cluster>> + Send {
        async_stream::try_stream! {
            while let Some(page) = self.next_page().await? {
                for cluster in page {
                    yield cluster;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl ClusterSource for ClusterReader {
    async fn next_page(&mut self) -> PipelineResult<Option<Vec<Cluster>>> {
        ClusterReader::next_page(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{assign_cluster, insert_converted, RecordStore};
    use futures::TryStreamExt;
    use serde_json::json;
    use tempfile::TempDir;

    async fn seeded_store(temp_dir: &TempDir, clusters: &[(i64, &[&str])]) -> RecordStore {
        let store = RecordStore::open(&temp_dir.path().join("records.sqlite3"))
            .await
            .unwrap();
        for (cluster_id, ids) in clusters {
            for id in *ids {
                let body = Document::from_value(json!({"@id": id})).unwrap();
                let row = insert_converted(store.pool(), id, &body).await.unwrap();
                assign_cluster(store.pool(), *cluster_id, row).await.unwrap();
            }
        }
        store
    }

    #[tokio::test]
    async fn test_pages_group_records_by_cluster() {
        let temp_dir = TempDir::new().unwrap();
        let store = seeded_store(
            &temp_dir,
            &[(3, &["c"]), (1, &["a1", "a2"]), (2, &["b"]), (4, &["d1", "d2", "d3"])],
        )
        .await;

        let mut reader = store.reader(2);

        let first = reader.next_page().await.unwrap().unwrap();
        assert_eq!(first.iter().map(|c| c.cluster_id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(
            first[0].records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["a1", "a2"]
        );

        let second = reader.next_page().await.unwrap().unwrap();
        assert_eq!(second.iter().map(|c| c.cluster_id).collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(second[1].len(), 3);

        assert!(reader.next_page().await.unwrap().is_none());
        assert!(reader.next_page().await.unwrap().is_none());
        assert_eq!(reader.last_cluster_id(), Some(4));
    }

    #[tokio::test]
    async fn test_resume_after_position() {
        let temp_dir = TempDir::new().unwrap();
        let store = seeded_store(&temp_dir, &[(10, &["x"]), (20, &["y"]), (30, &["z"])]).await;

        let clusters: Vec<Cluster> = store
            .reader(10)
            .resume_after(10)
            .into_stream()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(clusters.iter().map(|c| c.cluster_id).collect::<Vec<_>>(), vec![20, 30]);
    }

    #[tokio::test]
    async fn test_stream_includes_singletons_and_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = seeded_store(&temp_dir, &[]).await;
        let clusters: Vec<Cluster> = store.clusters_grouped(4).try_collect().await.unwrap();
        assert!(clusters.is_empty());

        let temp_dir = TempDir::new().unwrap();
        let store = seeded_store(&temp_dir, &[(5, &["only"])]).await;
        let clusters: Vec<Cluster> = store.clusters_grouped(4).try_collect().await.unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].records[0].id, "only");
    }

    #[tokio::test]
    async fn test_dangling_assignment_does_not_end_reading() {
        let temp_dir = TempDir::new().unwrap();
        let store = seeded_store(&temp_dir, &[]).await;

        // Upstream writers may run with foreign keys off
        let mut conn = store.pool().acquire().await.unwrap();
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await
            .unwrap();
        sqlx::query("INSERT INTO cluster (cluster_id, converted_id) VALUES (1, 999)")
            .execute(&mut *conn)
            .await
            .unwrap();
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&mut *conn)
            .await
            .unwrap();
        drop(conn);

        for (cluster_id, id) in [(2, "b"), (3, "c"), (4, "d")] {
            let body = Document::from_value(json!({"@id": id})).unwrap();
            let row = insert_converted(store.pool(), id, &body).await.unwrap();
            assign_cluster(store.pool(), cluster_id, row).await.unwrap();
        }

        for page_size in [1, 2, 10] {
            let clusters: Vec<Cluster> = store.clusters_grouped(page_size).try_collect().await.unwrap();
            assert_eq!(
                clusters.iter().map(|c| c.cluster_id).collect::<Vec<_>>(),
                vec![1, 2, 3, 4],
                "page_size {}",
                page_size
            );
            assert!(clusters[0].is_empty());
            assert_eq!(clusters[1].records[0].id, "b");
        }
    }

    #[tokio::test]
    async fn test_corrupt_record_is_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = seeded_store(&temp_dir, &[]).await;
        let row = sqlx::query("INSERT INTO converted (source_id, data) VALUES ('bad', '{not json')")
            .execute(store.pool())
            .await
            .unwrap()
            .last_insert_rowid();
        assign_cluster(store.pool(), 1, row).await.unwrap();

        let result = store.reader(4).next_page().await;
        assert!(matches!(result, Err(PipelineError::StorageUnavailable(_))));
    }

    #[tokio::test]
    async fn test_closed_pool_is_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = seeded_store(&temp_dir, &[(1, &["a"])]).await;
        let mut reader = store.reader(4);
        store.pool().close().await;

        let result = reader.next_page().await;
        assert!(matches!(result, Err(PipelineError::StorageUnavailable(_))));
    }
}
