//! Bootstrap configuration loading
//!
//! The TOML file carries bootstrap concerns only: where the Record Store lives,
//! logging, and optional overrides for the merge pipeline knobs.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (and their environment fallbacks)
//! 2. TOML configuration file
//! 3. Database settings table
//! 4. Built-in defaults (code constants)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Path to the SQLite Record Store
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Merge pipeline overrides (optional)
    #[serde(default)]
    pub merge: MergeToml,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// `[merge]` section; every key is optional and falls through to the
/// database settings table when absent
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MergeToml {
    pub batch_size: Option<usize>,
    pub max_in_flight: Option<usize>,
    pub worker_count: Option<usize>,
    pub page_size: Option<usize>,
    /// Auditor names in execution order
    pub auditors: Option<Vec<String>>,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Parse a TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML {} failed: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))
}

/// Platform config location: `<config_dir>/biblio/<file_name>`
pub fn default_config_path(file_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("biblio").join(file_name))
}

/// Resolve the TOML configuration
///
/// An explicitly given path must exist. Without one, the platform default
/// location is used when present; otherwise built-in defaults apply.
pub fn resolve_toml_config(explicit: Option<&Path>, file_name: &str) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        info!("Loading configuration from {}", path.display());
        return load_toml_config(path);
    }

    match default_config_path(file_name) {
        Some(path) if path.exists() => {
            info!("Loading configuration from {}", path.display());
            load_toml_config(&path)
        }
        _ => {
            debug!("No config file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}
