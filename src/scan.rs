//! Reading an export into memory.
//!
//! ## Directory Structure
//!
//! ```text
//! my-notes/                        # Export root
//! ├── config.toml                  # Converter config (optional)
//! ├── pages/
//! │   ├── contents.md              # Table of contents (folded into landing page)
//! │   ├── Project A.md             # Page, key "Project A"
//! │   └── Project B.md
//! ├── journals/
//! │   ├── 2025_01_01.md            # Journal, key "2025_01_01"
//! │   └── 2025_01_02.md
//! └── assets/                      # Copied by the assets module
//!     └── image_1700000000.png
//! ```
//!
//! Only `*.md` files directly inside `pages/` and `journals/` are documents.
//! Hidden files are skipped. Files are read in sorted order so a run is
//! reproducible.
//!
//! A file that cannot be read does not fail the scan; it is reported in
//! [`ScanResult::failures`] and left out of the document set. So is a
//! directory entry that cannot be listed, under the directory's path.
//! Failing to open a collection directory that exists is fatal.

use crate::locate::Export;
use crate::types::{Collection, SourceDocument};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot list {}: {source}", path.display())]
    ListDir { path: PathBuf, source: io::Error },
}

/// A document or directory entry that could not be read.
#[derive(Debug)]
pub struct ReadFailure {
    pub path: PathBuf,
    pub error: io::Error,
}

/// Documents of one export, pages first, each collection sorted by path.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub documents: Vec<SourceDocument>,
    pub failures: Vec<ReadFailure>,
}

impl ScanResult {
    pub fn count(&self, collection: Collection) -> usize {
        self.documents
            .iter()
            .filter(|d| d.collection == collection)
            .count()
    }
}

pub fn scan(export: &Export) -> Result<ScanResult, ScanError> {
    let mut result = ScanResult::default();
    for collection in Collection::ALL {
        let dir = export.collection_dir(collection);
        if !dir.is_dir() {
            continue;
        }
        let (files, unlisted) = markdown_files(&dir)?;
        result.failures.extend(unlisted);
        for path in files {
            let key = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            match fs::read_to_string(&path) {
                Ok(text) => result.documents.push(SourceDocument {
                    key,
                    collection,
                    text,
                    path,
                }),
                Err(error) => result.failures.push(ReadFailure { path, error }),
            }
        }
    }
    Ok(result)
}

fn markdown_files(dir: &Path) -> Result<(Vec<PathBuf>, Vec<ReadFailure>), ScanError> {
    let entries = fs::read_dir(dir).map_err(|source| ScanError::ListDir {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(select_markdown(dir, entries.map(|e| e.map(|e| e.path()))))
}

/// Sorted visible `*.md` files among `entries`, plus one failure per entry
/// that could not be listed.
fn select_markdown(
    dir: &Path,
    entries: impl IntoIterator<Item = io::Result<PathBuf>>,
) -> (Vec<PathBuf>, Vec<ReadFailure>) {
    let mut files = Vec::new();
    let mut failures = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if is_markdown(&path) => files.push(path),
            Ok(_) => {}
            Err(error) => failures.push(ReadFailure {
                path: dir.to_path_buf(),
                error,
            }),
        }
    }
    files.sort();
    (files, failures)
}

fn is_markdown(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(true);
    !hidden
        && path.is_file()
        && path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("md"))
            .unwrap_or(false)
}
