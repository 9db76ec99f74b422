//! biblio-merge library interface
//!
//! Cluster-merge pipeline: reads clusters of converted bibliographic records,
//! merges each into a union record, runs the ordered Auditor Set to build its
//! audit trail, and commits the results through a single writer.

pub mod auditors;
pub mod config;
pub mod db;
pub mod error;
pub mod merging;
pub mod models;
pub mod services;
pub mod types;
pub mod utils;
pub mod workflow;

pub use crate::error::{PipelineError, PipelineResult};
