//! Converter configuration.
//!
//! Handles loading, validating, and merging `config.toml` files. Stock
//! defaults are overridden by a `config.toml` in the directory that holds
//! the exports, which is in turn overridden by one inside the export:
//!
//! ```text
//! logseq-export/
//! ├── config.toml              # Base config (overrides stock defaults)
//! ├── work-notes/
//! │   ├── config.toml          # Export config (overrides base)
//! │   ├── pages/
//! │   └── journals/
//! └── personal/
//!     └── pages/
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! locale = "zh"             # "zh" or "en": date titles, headers, placeholders
//! with_ids = false          # Append a random identifier to output filenames
//! toc_page = "contents"     # Page folded into the database landing page
//!
//! [database]
//! team_name = ""            # Empty = locale default
//! created_by = ""           # Empty = locale default
//! status = "Not started"
//! summary_length = 150      # Characters kept in the summary column
//!
//! [processing]
//! max_processes = 4         # Max parallel rewrite workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::locale::Locale;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up in the base and export directories.
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Converter configuration loaded from `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    /// Output locale for journal titles, table headers and placeholders.
    pub locale: Locale,
    /// Append a random identifier to every output filename.
    pub with_ids: bool,
    /// Key of the table-of-contents page.
    pub toc_page: String,
    /// Tabular (database) output settings.
    pub database: DatabaseConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            with_ids: false,
            toc_page: "contents".to_string(),
            database: DatabaseConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl ConvertConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.toc_page.trim().is_empty() {
            return Err(ConfigError::Validation("toc_page must not be empty".into()));
        }
        if self.database.summary_length == 0 {
            return Err(ConfigError::Validation(
                "database.summary_length must be greater than 0".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Team name, falling back to the locale default.
    pub fn team_name(&self) -> &str {
        non_empty_or(&self.database.team_name, self.locale.labels().default_team_name)
    }

    /// Created-by column value, falling back to the locale default.
    pub fn created_by(&self) -> &str {
        non_empty_or(
            &self.database.created_by,
            self.locale.labels().default_created_by,
        )
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Tabular output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Name of the landing page; the database is named after it.
    pub team_name: String,
    /// Value of the created-by column on every row.
    pub created_by: String,
    /// Value of the status column on every row.
    pub status: String,
    /// Maximum summary length in characters (an ellipsis is appended when cut).
    pub summary_length: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            team_name: String::new(),
            created_by: String::new(),
            status: "Not started".to_string(),
            summary_length: 150,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel rewrite workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ConvertConfig::default())
        .map_err(|e| ConfigError::Validation(format!("stock defaults do not serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge overlays onto a base value in order, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<ConvertConfig, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_toml);
    let config: ConvertConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the layered config for an export: stock → `base_dir` → `export_dir`.
///
/// When the export is the base directory itself its file is read once.
pub fn load_config(base_dir: &Path, export_dir: &Path) -> Result<ConvertConfig, ConfigError> {
    let mut overlays = Vec::new();
    if let Some(v) = load_raw_config(base_dir)? {
        overlays.push(v);
    }
    if export_dir != base_dir {
        if let Some(v) = load_raw_config(export_dir)? {
            overlays.push(v);
        }
    }
    resolve_config(stock_defaults_value()?, overlays)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Converter Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Config files can be placed at two levels:
#   logseq-export/config.toml            -> base (overrides stock defaults)
#   logseq-export/work-notes/config.toml -> export (overrides base)
#
# Each level only needs the keys it wants to override.
# Unknown keys will cause an error.

# Output locale: "zh" or "en".
# Controls journal titles (2025年01月01日 vs 2025-01-01), table headers,
# page-type labels and the placeholders for block references and queries.
locale = "zh"

# Append a 32-character random identifier to every output filename.
with_ids = false

# Page folded into the landing page of the database output.
toc_page = "contents"

# ---------------------------------------------------------------------------
# Database output (the `database` command)
# ---------------------------------------------------------------------------
[database]
# Landing page name. Empty = locale default.
team_name = ""

# Value of the "Created by" column. Empty = locale default.
created_by = ""

# Value of the status column.
status = "Not started"

# Characters kept in the summary column.
summary_length = 150

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel rewrite workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
