//! Run log and the JSON run report.
//!
//! Every user-visible event of a run goes through [`RunLog`], which keeps
//! the events in order for the report and mirrors each one to `tracing`.
//! At the end of a run the pipeline writes `conversion_report.json`:
//!
//! ```json
//! {
//!   "conversion_time": "2025-01-01T12:00:00+08:00",
//!   "source_name": "work-notes",
//!   "variant": "database",
//!   "total_pages": 3,
//!   "written_pages": 3,
//!   "failed_pages": 0,
//!   "copied_assets": 1,
//!   "failed_assets": 0,
//!   "page_mapping": { "pages": { "Project A": { "filename": "Project A.md" } }, "journals": {} },
//!   "asset_mapping": { "2025/chart.png": "assets/chart.png" },
//!   "database": { "name": "...", "total_entries": 2, "journal_entries": 1, "article_entries": 1 },
//!   "conversion_log": [ { "timestamp": "...", "level": "info", "message": "..." } ]
//! }
//! ```

use crate::registry::Registry;
use crate::types::Collection;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const REPORT_FILE: &str = "conversion_report.json";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: Level,
    pub message: String,
}

/// Ordered events of one run.
#[derive(Debug, Default)]
pub struct RunLog {
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{message}");
        self.push(Level::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.push(Level::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{message}");
        self.push(Level::Error, message);
    }

    fn push(&mut self, level: Level, message: String) {
        self.entries.push(LogEntry {
            timestamp: Local::now(),
            level,
            message,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn count(&self, level: Level) -> usize {
        self.entries.iter().filter(|e| e.level == level).count()
    }
}

/// Output identity of one logical key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingEntry {
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Logical key → output identity, per collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageMapping {
    pub pages: BTreeMap<String, MappingEntry>,
    pub journals: BTreeMap<String, MappingEntry>,
}

impl PageMapping {
    pub fn from_registry(registry: &Registry) -> Self {
        let collect = |collection: Collection| -> BTreeMap<String, MappingEntry> {
            registry
                .records(collection)
                .map(|r| {
                    (
                        r.key.clone(),
                        MappingEntry {
                            filename: r.filename.clone(),
                            id: r.id.clone(),
                        },
                    )
                })
                .collect()
        };
        Self {
            pages: collect(Collection::Page),
            journals: collect(Collection::Journal),
        }
    }
}

/// Row counts of the tabular output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseStats {
    pub name: String,
    pub total_entries: usize,
    pub journal_entries: usize,
    pub article_entries: usize,
}

#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub conversion_time: DateTime<Local>,
    pub source_name: &'a str,
    pub variant: &'a str,
    pub total_pages: usize,
    pub written_pages: usize,
    pub failed_pages: usize,
    pub copied_assets: usize,
    pub failed_assets: usize,
    pub page_mapping: PageMapping,
    pub asset_mapping: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<&'a DatabaseStats>,
    pub conversion_log: &'a [LogEntry],
}

/// Write the report as pretty JSON into `dir`.
pub fn write_report(dir: &Path, report: &RunReport) -> Result<PathBuf, ReportError> {
    let path = dir.join(REPORT_FILE);
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&path, json)?;
    Ok(path)
}
