//! CreatorCount note checks
//!
//! Appends `creator_count_note_exists` followed by `creator_count_check`.
//! The count check passes only when a positive CreatorCount note exists and
//! is at least the number of contributions that name an agent.

use crate::models::fields::{self, CONTRIBUTIONS, NOTES};
use crate::models::{AuditTrail, Document, UnionRecord};
use crate::types::{Auditor, AuditorError};
use serde_json::Value;

pub struct CreatorCountAuditor;

impl CreatorCountAuditor {
    pub const NAME: &'static str = "CreatorCountAuditor";

    pub fn new() -> Self {
        Self
    }

    /// Declared creator count, `None` when no CreatorCount note exists
    fn declared_count(body: &Document) -> Result<Option<u64>, AuditorError> {
        let Some(note) = fields::typed(body.list_at(NOTES), "CreatorCount").next() else {
            return Ok(None);
        };

        let invalid = |message: String| AuditorError::InvalidValue {
            field: "CreatorCount".to_string(),
            message,
        };

        match note.get("label") {
            Some(Value::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| invalid(format!("not a count: {}", n))),
            Some(Value::String(s)) => s
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|e| invalid(format!("'{}': {}", s, e))),
            // A note without a usable label still counts as present
            _ => Ok(Some(0)),
        }
    }

    fn counted_creators(body: &Document) -> u64 {
        body.list_at(CONTRIBUTIONS)
            .iter()
            .filter(|c| c.get("agent").is_some())
            .count() as u64
    }
}

impl Default for CreatorCountAuditor {
    fn default() -> Self {
        Self::new()
    }
}

impl Auditor for CreatorCountAuditor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn audit(
        &self,
        record: UnionRecord,
        trail: AuditTrail,
    ) -> Result<(UnionRecord, AuditTrail), AuditorError> {
        let declared = Self::declared_count(&record.body)?;
        let trail = trail.record(Self::NAME, "creator_count_note_exists", declared.is_some());

        let valid = match declared {
            Some(count) if count > 0 => Self::counted_creators(&record.body) <= count,
            _ => false,
        };
        let trail = trail.record(Self::NAME, "creator_count_check", valid);

        Ok((record, trail))
    }
}
