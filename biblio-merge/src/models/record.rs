//! Records, clusters and union records

use super::Document;
use serde::{Deserialize, Serialize};

/// One converted, harvested description
///
/// Owned by the Record Store and immutable once converted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Per-source identifier (e.g. the OAI identifier)
    pub id: String,
    pub body: Document,
}

impl Record {
    pub fn new(id: impl Into<String>, body: Document) -> Self {
        Self {
            id: id.into(),
            body,
        }
    }
}

/// Records believed to describe the same work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub cluster_id: i64,
    /// Constituent records in stored order (never empty when read from a store)
    pub records: Vec<Record>,
}

impl Cluster {
    pub fn new(cluster_id: i64, records: Vec<Record>) -> Self {
        Self {
            cluster_id,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The consolidated record produced from one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionRecord {
    pub cluster_id: i64,
    /// Ids of the records merged into this one, in input order
    pub source_ids: Vec<String>,
    pub body: Document,
}

impl UnionRecord {
    pub fn new(cluster_id: i64, source_ids: Vec<String>, body: Document) -> Self {
        Self {
            cluster_id,
            source_ids,
            body,
        }
    }
}
