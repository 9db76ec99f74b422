//! Merge function and auditor test doubles

use biblio_merge::merging::DocumentMerger;
use biblio_merge::models::{AuditTrail, Record, UnionRecord};
use biblio_merge::types::{Auditor, AuditorError, MergeError, MergeFunction};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Fails for the listed clusters, otherwise delegates to [`DocumentMerger`]
pub struct FailingMerger {
    pub fail_for: Vec<i64>,
    inner: DocumentMerger,
}

impl FailingMerger {
    pub fn new(fail_for: Vec<i64>) -> Self {
        Self {
            fail_for,
            inner: DocumentMerger::new(),
        }
    }
}

impl MergeFunction for FailingMerger {
    fn name(&self) -> &str {
        "FailingMerger"
    }

    fn merge(&self, cluster_id: i64, records: &[Record]) -> Result<UnionRecord, MergeError> {
        if self.fail_for.contains(&cluster_id) {
            return Err(MergeError::Conflict(format!("irreconcilable cluster {}", cluster_id)));
        }
        self.inner.merge(cluster_id, records)
    }
}

/// Panics while merging one cluster
pub struct PanickingMerger {
    pub panic_on: i64,
}

impl MergeFunction for PanickingMerger {
    fn name(&self) -> &str {
        "PanickingMerger"
    }

    fn merge(&self, cluster_id: i64, records: &[Record]) -> Result<UnionRecord, MergeError> {
        if cluster_id == self.panic_on {
            panic!("merge blew up on cluster {}", cluster_id);
        }
        DocumentMerger::new().merge(cluster_id, records)
    }
}

/// Sleeps before every merge
pub struct SlowMerger {
    pub delay: Duration,
    pub merged: Arc<AtomicUsize>,
}

impl SlowMerger {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            merged: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MergeFunction for SlowMerger {
    fn name(&self) -> &str {
        "SlowMerger"
    }

    fn merge(&self, cluster_id: i64, records: &[Record]) -> Result<UnionRecord, MergeError> {
        std::thread::sleep(self.delay);
        self.merged.fetch_add(1, Ordering::SeqCst);
        DocumentMerger::new().merge(cluster_id, records)
    }
}

/// Appends one event and counts invocations
pub struct CountingAuditor {
    pub name: String,
    pub calls: Arc<AtomicUsize>,
}

impl CountingAuditor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Auditor for CountingAuditor {
    fn name(&self) -> &str {
        &self.name
    }

    fn audit(
        &self,
        record: UnionRecord,
        trail: AuditTrail,
    ) -> Result<(UnionRecord, AuditTrail), AuditorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let trail = trail.record(&self.name, "counted", true);
        Ok((record, trail))
    }
}
