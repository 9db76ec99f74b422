//! Missing ISSN check for published articles

use crate::models::fields::{self, IDENTIFIERS, PART_OF, PUBLISHED_STATUS};
use crate::models::{AuditTrail, UnionRecord};
use crate::types::{Auditor, AuditorError};
use serde_json::Value;

/// Appends `ISSN_missing_check`
///
/// True when the record is an article, published (or without status), and
/// has no usable ISSN under `partOf[].identifiedBy`. An `ISSN` entry with an
/// empty value counts as missing.
pub struct IssnAuditor;

impl IssnAuditor {
    pub const NAME: &'static str = "IssnAuditor";

    pub fn new() -> Self {
        Self
    }

    fn missing_issn(part_of: &[Value]) -> bool {
        let mut found = false;
        for part in part_of {
            let ids = part
                .get(IDENTIFIERS)
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let issns: Vec<&Value> = fields::typed(ids, "ISSN").collect();
            if issns
                .iter()
                .any(|id| id.get("value").and_then(Value::as_str).map_or(true, str::is_empty))
            {
                return true;
            }
            found |= !issns.is_empty();
        }
        !found
    }
}

impl Default for IssnAuditor {
    fn default() -> Self {
        Self::new()
    }
}

impl Auditor for IssnAuditor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn audit(
        &self,
        record: UnionRecord,
        trail: AuditTrail,
    ) -> Result<(UnionRecord, AuditTrail), AuditorError> {
        let part_of = match record.body.get(PART_OF) {
            None => &[][..],
            Some(Value::Array(parts)) => parts.as_slice(),
            Some(_) => return Err(AuditorError::CheckFailed("partOf is not a list".into())),
        };

        let mut result = false;
        if fields::is_article(&record.body) && Self::missing_issn(part_of) {
            let statuses = fields::publication_statuses(&record.body);
            result = statuses.is_empty() || statuses.contains(&PUBLISHED_STATUS);
        }

        let trail = trail.record(Self::NAME, "ISSN_missing_check", result);
        Ok((record, trail))
    }
}
