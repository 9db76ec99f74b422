//! Duplicate contributor check

use crate::models::fields::{self, CONTRIBUTIONS};
use crate::models::{AuditTrail, UnionRecord};
use crate::types::{Auditor, AuditorError};
use std::collections::HashSet;
use tracing::debug;

/// Flags records where two person contributions carry the same name
pub struct ContributorAuditor;

impl ContributorAuditor {
    pub const NAME: &'static str = "ContributorAuditor";

    pub fn new() -> Self {
        Self
    }
}

impl Default for ContributorAuditor {
    fn default() -> Self {
        Self::new()
    }
}

impl Auditor for ContributorAuditor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn audit(
        &self,
        record: UnionRecord,
        trail: AuditTrail,
    ) -> Result<(UnionRecord, AuditTrail), AuditorError> {
        let mut seen = HashSet::new();
        let duplicate = record
            .body
            .list_at(CONTRIBUTIONS)
            .iter()
            .filter(|c| fields::is_person(c))
            .filter_map(fields::agent_name)
            .any(|name| !seen.insert(name.to_lowercase()));

        if duplicate {
            debug!(cluster_id = record.cluster_id, "Duplicate contributor persons");
        }

        let trail = trail.record(Self::NAME, "contributor_duplicate_check", duplicate);
        Ok((record, trail))
    }
}
