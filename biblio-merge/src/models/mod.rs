//! Data model: record documents, clusters, union records and audit trails

pub mod audit;
pub mod document;
pub mod fields;
pub mod record;

pub use audit::{AuditEvent, AuditTrail};
pub use document::Document;
pub use record::{Cluster, Record, UnionRecord};
