//! # Biblio Common Library
//!
//! Shared code for the bibliographic curation tools:
//! - Error and result types
//! - TOML bootstrap configuration
//! - Record Store database initialization and settings access

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
