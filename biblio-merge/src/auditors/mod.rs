//! Auditor Set
//!
//! An ordered list of [`Auditor`]s folded over `(record, empty trail)`. The
//! configured order is the order of events in every resulting trail.
//!
//! # Auditors
//! 1. **creator_count** - CreatorCount note present and plausible
//! 2. **contributor** - duplicate person contributions
//! 3. **issn** - published articles lacking an ISSN
//! 4. **ssif** - only top-level subject classification

pub mod contributor;
pub mod creator_count;
pub mod issn;
pub mod ssif;

pub use contributor::ContributorAuditor;
pub use creator_count::CreatorCountAuditor;
pub use issn::IssnAuditor;
pub use ssif::SsifAuditor;

use crate::error::{PipelineError, PipelineResult};
use crate::models::{AuditTrail, UnionRecord};
use crate::types::{Auditor, AuditorError};
use std::fmt;
use std::sync::Arc;

/// Auditor names in default order
pub const DEFAULT_AUDITORS: &[&str] = &[
    CreatorCountAuditor::NAME,
    ContributorAuditor::NAME,
    IssnAuditor::NAME,
    SsifAuditor::NAME,
];

/// An auditor step that could not be carried out
#[derive(Debug)]
pub struct AuditFailure {
    pub auditor: String,
    pub error: AuditorError,
}

/// Ordered, shareable set of auditors
#[derive(Clone)]
pub struct AuditorSet {
    auditors: Vec<Arc<dyn Auditor>>,
}

impl AuditorSet {
    pub fn new(auditors: Vec<Arc<dyn Auditor>>) -> Self {
        Self { auditors }
    }

    /// Build from configured names, in the given order
    ///
    /// # Errors
    /// `Config` for an unknown auditor name.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> PipelineResult<Self> {
        let auditors = names
            .iter()
            .map(|name| auditor_by_name(name.as_ref()))
            .collect::<PipelineResult<Vec<_>>>()?;
        Ok(Self::new(auditors))
    }

    /// Configured names, in run order
    pub fn names(&self) -> Vec<&str> {
        self.auditors.iter().map(|a| a.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.auditors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.auditors.is_empty()
    }

    /// Run every auditor in order over `record` with a fresh trail
    ///
    /// Stops at the first auditor that fails.
    pub fn run(&self, record: UnionRecord) -> Result<(UnionRecord, AuditTrail), AuditFailure> {
        self.auditors
            .iter()
            .try_fold((record, AuditTrail::new()), |(record, trail), auditor| {
                auditor.audit(record, trail).map_err(|error| AuditFailure {
                    auditor: auditor.name().to_string(),
                    error,
                })
            })
    }
}

impl fmt::Debug for AuditorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

fn auditor_by_name(name: &str) -> PipelineResult<Arc<dyn Auditor>> {
    let auditor: Arc<dyn Auditor> = match name {
        CreatorCountAuditor::NAME => Arc::new(CreatorCountAuditor::new()),
        ContributorAuditor::NAME => Arc::new(ContributorAuditor::new()),
        IssnAuditor::NAME => Arc::new(IssnAuditor::new()),
        SsifAuditor::NAME => Arc::new(SsifAuditor::new()),
        other => {
            return Err(PipelineError::Config(format!(
                "unknown auditor '{}' (known: {})",
                other,
                DEFAULT_AUDITORS.join(", ")
            )))
        }
    };
    Ok(auditor)
}

impl Default for AuditorSet {
    fn default() -> Self {
        Self::new(vec![
            Arc::new(CreatorCountAuditor::new()),
            Arc::new(ContributorAuditor::new()),
            Arc::new(IssnAuditor::new()),
            Arc::new(SsifAuditor::new()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;
    use serde_json::json;

    fn record() -> UnionRecord {
        let body = Document::from_value(json!({
            "instanceOf": {
                "hasNote": [{"@type": "CreatorCount", "label": "1"}],
                "contribution": [{"agent": {"@type": "Person", "name": "A"}}],
                "classification": [{"code": "102"}]
            }
        }))
        .unwrap();
        UnionRecord::new(42, vec!["a".into()], body)
    }

    #[test]
    fn test_trail_follows_configured_order() {
        let set = AuditorSet::from_names(&["SsifAuditor", "CreatorCountAuditor"]).unwrap();
        assert_eq!(set.names(), vec!["SsifAuditor", "CreatorCountAuditor"]);

        let (out, trail) = set.run(record()).unwrap();
        assert_eq!(out, record());
        assert_eq!(trail.actor_sequence(), vec!["SsifAuditor", "CreatorCountAuditor"]);
        assert_eq!(trail.len(), 3);
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let set = AuditorSet::default();
        let (_, first) = set.run(record()).unwrap();
        let (_, second) = set.run(record()).unwrap();
        assert_eq!(first, second);
        assert_eq!(set.names(), DEFAULT_AUDITORS.to_vec());
    }

    #[test]
    fn test_unknown_auditor_name() {
        let err = AuditorSet::from_names(&["NoSuchAuditor"]).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_failure_names_auditor() {
        let body = Document::from_value(json!({"partOf": 5})).unwrap();
        let failure = AuditorSet::default()
            .run(UnionRecord::new(1, vec![], body))
            .unwrap_err();
        assert_eq!(failure.auditor, "IssnAuditor");
    }
}
