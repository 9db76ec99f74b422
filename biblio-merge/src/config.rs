//! Merge pipeline configuration
//!
//! Each knob resolves independently, highest priority first:
//! 1. Command line (and its environment fallbacks)
//! 2. TOML `[merge]` section
//! 3. Database `settings` table
//! 4. Built-in defaults

use crate::auditors::DEFAULT_AUDITORS;
use crate::error::{PipelineError, PipelineResult};
use crate::services::DispatchConfig;
use biblio_common::config::MergeToml;
use biblio_common::db::get_setting;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tracing::debug;

pub const DEFAULT_BATCH_SIZE: usize = 64;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 32;
pub const DEFAULT_WORKER_COUNT: usize = 16;
pub const DEFAULT_PAGE_SIZE: usize = 256;

/// Values given on the command line; `None` falls through
#[derive(Debug, Clone, Default)]
pub struct MergeOverrides {
    pub batch_size: Option<usize>,
    pub max_in_flight: Option<usize>,
    pub worker_count: Option<usize>,
    pub page_size: Option<usize>,
    pub auditors: Option<Vec<String>>,
}

/// Fully resolved configuration for one merge run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConfig {
    pub database_path: PathBuf,
    pub batch_size: usize,
    pub max_in_flight: usize,
    pub worker_count: usize,
    /// Clusters per Cluster Reader page
    pub page_size: usize,
    /// Auditor names in execution order
    pub auditors: Vec<String>,
    /// Remove prior finalized rows before running
    pub clear: bool,
}

impl MergeConfig {
    /// Built-in defaults for `database_path`
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            database_path,
            batch_size: DEFAULT_BATCH_SIZE,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            worker_count: DEFAULT_WORKER_COUNT,
            page_size: DEFAULT_PAGE_SIZE,
            auditors: DEFAULT_AUDITORS.iter().map(|s| s.to_string()).collect(),
            clear: false,
        }
    }

    /// Resolve every knob across CLI, TOML, database and defaults
    pub async fn resolve(
        database_path: PathBuf,
        cli: &MergeOverrides,
        toml: &MergeToml,
        db: &SqlitePool,
    ) -> PipelineResult<Self> {
        let config = Self {
            batch_size: resolve_knob(
                "merge_batch_size",
                cli.batch_size,
                toml.batch_size,
                db,
                DEFAULT_BATCH_SIZE,
            )
            .await?,
            max_in_flight: resolve_knob(
                "merge_max_in_flight",
                cli.max_in_flight,
                toml.max_in_flight,
                db,
                DEFAULT_MAX_IN_FLIGHT,
            )
            .await?,
            worker_count: resolve_knob(
                "merge_worker_count",
                cli.worker_count,
                toml.worker_count,
                db,
                DEFAULT_WORKER_COUNT,
            )
            .await?,
            page_size: resolve_knob(
                "merge_page_size",
                cli.page_size,
                toml.page_size,
                db,
                DEFAULT_PAGE_SIZE,
            )
            .await?,
            auditors: cli
                .auditors
                .clone()
                .or_else(|| toml.auditors.clone())
                .unwrap_or_else(|| DEFAULT_AUDITORS.iter().map(|s| s.to_string()).collect()),
            ..Self::new(database_path)
        };

        config.validate()?;
        Ok(config)
    }

    /// All numeric knobs must be at least 1
    pub fn validate(&self) -> PipelineResult<()> {
        self.dispatch().validate()?;
        if self.page_size < 1 {
            return Err(PipelineError::Config("page_size must be at least 1".into()));
        }
        Ok(())
    }

    pub fn dispatch(&self) -> DispatchConfig {
        DispatchConfig {
            batch_size: self.batch_size,
            max_in_flight: self.max_in_flight,
            worker_count: self.worker_count,
        }
    }
}

async fn resolve_knob(
    key: &str,
    cli: Option<usize>,
    toml: Option<usize>,
    db: &SqlitePool,
    default: usize,
) -> PipelineResult<usize> {
    if let Some(value) = cli {
        debug!(key, value, "Setting from command line");
        return Ok(value);
    }
    if let Some(value) = toml {
        debug!(key, value, "Setting from TOML");
        return Ok(value);
    }
    if let Some(value) = get_setting::<usize>(db, key).await? {
        debug!(key, value, "Setting from database");
        return Ok(value);
    }
    Ok(default)
}
