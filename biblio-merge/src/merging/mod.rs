//! Merge functions
//!
//! [`DocumentMerger`] is the bundled [`crate::types::MergeFunction`]. Other
//! strategies plug in through the same trait.

pub mod document_merger;

pub use document_merger::DocumentMerger;
