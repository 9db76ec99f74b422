//! Test Helper Utilities
//!
//! Shared utilities for testing biblio-merge

#![allow(dead_code)]

pub mod db_utils;
pub mod doubles;

pub use db_utils::{
    create_test_store, seed_clusters, seed_dangling_assignment, simple_record_body,
};
pub use doubles::{CountingAuditor, FailingMerger, PanickingMerger, SlowMerger};
