//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## List
//!
//! ```text
//! Exports in logseq-export
//! 001 personal
//! 002 work-notes
//! ```
//!
//! ## Convert / Database
//!
//! ```text
//! work-notes (database) → notion-import/work-notes-team-20250101-120000/notion-import
//!     Pages: 12 of 13 written, 1 failed
//!     Assets: 4 copied
//!     Database: Team Database (13 rows: 5 journal, 8 article)
//!     Log: 2 warnings, 1 error
//!     Report: conversion_report.json
//! ```
//!
//! ## Check
//!
//! ```text
//! 12 pages, 5 journals
//! Unresolved links
//! 001 [[Ghost]]
//!     In: page Project A
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::pipeline::{CheckReport, RunSummary};
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 warning`, `2 warnings`.
fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// List
// ============================================================================

pub fn format_export_list(base: &Path, names: &[String]) -> Vec<String> {
    if names.is_empty() {
        return vec![format!("No exports in {}", base.display())];
    }
    let mut lines = vec![format!("Exports in {}", base.display())];
    lines.extend(
        names
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{} {}", format_index(i + 1), name)),
    );
    lines
}

pub fn print_export_list(base: &Path, names: &[String]) {
    for line in format_export_list(base, names) {
        println!("{}", line);
    }
}

// ============================================================================
// Convert
// ============================================================================

pub fn format_run_summary(summary: &RunSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({}) → {}",
        summary.export_name,
        summary.variant,
        summary.out_dir.display()
    )];
    let mut pages = format!(
        "{}Pages: {} of {} written",
        indent(1),
        summary.written_pages,
        summary.total_pages
    );
    if summary.failed_pages > 0 {
        pages.push_str(&format!(", {} failed", summary.failed_pages));
    }
    lines.push(pages);
    let mut assets = format!("{}Assets: {} copied", indent(1), summary.assets_copied);
    if summary.assets_failed > 0 {
        assets.push_str(&format!(", {} failed", summary.assets_failed));
    }
    lines.push(assets);
    if let Some(db) = &summary.database {
        lines.push(format!(
            "{}Database: {} ({} rows: {} journal, {} article)",
            indent(1),
            db.name,
            db.total_entries,
            db.journal_entries,
            db.article_entries
        ));
    }
    if summary.warnings > 0 || summary.errors > 0 {
        lines.push(format!(
            "{}Log: {}, {}",
            indent(1),
            plural(summary.warnings, "warning"),
            plural(summary.errors, "error")
        ));
    }
    if let Some(report) = &summary.report {
        let name = report
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        lines.push(format!("{}Report: {}", indent(1), name));
    }
    lines
}

pub fn print_run_summary(summary: &RunSummary) {
    for line in format_run_summary(summary) {
        println!("{}", line);
    }
}

/// One line per export of a batch run.
pub fn format_batch_result(name: &str, result: &Result<RunSummary, String>) -> String {
    match result {
        Ok(s) => format!("{}ok      {} ({} pages)", indent(1), name, s.written_pages),
        Err(e) => format!("{}failed  {}: {}", indent(1), name, e),
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check(report: &CheckReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{}, {}",
        plural(report.pages, "page"),
        plural(report.journals, "journal")
    )];
    if !report.unreadable.is_empty() {
        lines.push("Unreadable files".to_string());
        for (i, path) in report.unreadable.iter().enumerate() {
            lines.push(format!("{} {}", format_index(i + 1), path.display()));
        }
    }
    if !report.unresolved.is_empty() {
        lines.push("Unresolved links".to_string());
        for (i, u) in report.unresolved.iter().enumerate() {
            lines.push(format!("{} [[{}]]", format_index(i + 1), u.name));
            lines.push(format!("{}In: {} {}", indent(1), u.collection, u.key));
        }
    }
    lines
}

pub fn print_check(report: &CheckReport) {
    for line in format_check(report) {
        println!("{}", line);
    }
}
