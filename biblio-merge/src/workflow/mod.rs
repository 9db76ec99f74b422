//! Merge run orchestration
//!
//! Wires a [`crate::db::RecordStore`] to the dispatcher for one pass:
//! reader → dispatcher → worker pool → committer → finalized table.

pub mod pipeline;

pub use pipeline::MergePipeline;
