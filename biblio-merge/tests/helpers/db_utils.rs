//! Record Store fixtures

use biblio_merge::db::{assign_cluster, insert_converted, RecordStore};
use biblio_merge::models::Document;
use serde_json::{json, Value};
use tempfile::TempDir;

/// Open a fresh store in `temp_dir`
pub async fn create_test_store(temp_dir: &TempDir) -> RecordStore {
    RecordStore::open(&temp_dir.path().join("records.sqlite3"))
        .await
        .expect("Failed to open test store")
}

/// Small record body with a summary and one contributor
pub fn simple_record_body(id: &str, summary: &str) -> Value {
    json!({
        "@id": id,
        "instanceOf": {
            "summary": [{"@type": "Summary", "label": summary}],
            "hasNote": [{"@type": "CreatorCount", "label": "1"}],
            "contribution": [{"agent": {"@type": "Person", "name": "Author"}}]
        }
    })
}

/// Seed clusters `1..=count`, each with `records_per_cluster` records
pub async fn seed_clusters(store: &RecordStore, count: i64, records_per_cluster: usize) {
    for cluster_id in 1..=count {
        for n in 0..records_per_cluster {
            let id = format!("oai:test:{}-{}", cluster_id, n);
            let body = Document::from_value(simple_record_body(&id, &"x".repeat(n + 1)))
                .expect("record body is an object");
            let row = insert_converted(store.pool(), &id, &body)
                .await
                .expect("Failed to insert record");
            assign_cluster(store.pool(), cluster_id, row)
                .await
                .expect("Failed to assign cluster");
        }
    }
}

/// Insert one cluster with explicit bodies
pub async fn seed_cluster(store: &RecordStore, cluster_id: i64, bodies: &[Value]) {
    for (n, body) in bodies.iter().enumerate() {
        let id = format!("oai:test:{}-{}", cluster_id, n);
        let doc = Document::from_value(body.clone()).expect("record body is an object");
        let row = insert_converted(store.pool(), &id, &doc)
            .await
            .expect("Failed to insert record");
        assign_cluster(store.pool(), cluster_id, row)
            .await
            .expect("Failed to assign cluster");
    }
}

/// Assign `cluster_id` to a converted row that does not exist
///
/// Foreign keys are switched off on one connection, as an upstream writer
/// without them would.
pub async fn seed_dangling_assignment(store: &RecordStore, cluster_id: i64) {
    let mut conn = store.pool().acquire().await.expect("Failed to acquire connection");
    sqlx::query("PRAGMA foreign_keys = OFF")
        .execute(&mut *conn)
        .await
        .expect("Failed to disable foreign keys");
    sqlx::query("INSERT INTO cluster (cluster_id, converted_id) VALUES (?, -1)")
        .bind(cluster_id)
        .execute(&mut *conn)
        .await
        .expect("Failed to insert dangling assignment");
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await
        .expect("Failed to enable foreign keys");
}
