//! Comprehensive classification check

use crate::models::fields;
use crate::models::{AuditTrail, UnionRecord};
use crate::types::{Auditor, AuditorError};

/// Appends `SSIF_comprehensive_check`: true when no 3 or 5 digit code exists
pub struct SsifAuditor;

impl SsifAuditor {
    pub const NAME: &'static str = "SsifAuditor";

    pub fn new() -> Self {
        Self
    }
}

impl Default for SsifAuditor {
    fn default() -> Self {
        Self::new()
    }
}

fn is_three_or_five_digits(code: &str) -> bool {
    matches!(code.len(), 3 | 5) && code.bytes().all(|b| b.is_ascii_digit())
}

impl Auditor for SsifAuditor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn audit(
        &self,
        record: UnionRecord,
        trail: AuditTrail,
    ) -> Result<(UnionRecord, AuditTrail), AuditorError> {
        let comprehensive = !fields::classification_codes(&record.body)
            .into_iter()
            .any(is_three_or_five_digits);

        let trail = trail.record(Self::NAME, "SSIF_comprehensive_check", comprehensive);
        Ok((record, trail))
    }
}
