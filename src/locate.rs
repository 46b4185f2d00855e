//! Finding the export to convert.
//!
//! An *export* is a directory with a `pages/` or `journals/` subdirectory.
//! The user may point at the export itself or at a parent holding several
//! exports; in the second case a name has to be given and the error lists
//! what is available.

use crate::types::Collection;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocateError {
    #[error("export '{name}' does not exist in {}{}", .base.display(), alternatives(.available))]
    NotFound {
        name: String,
        base: PathBuf,
        available: Vec<String>,
    },
    #[error("{} is not an export (no pages/ or journals/ directory)", .0.display())]
    NotAnExport(PathBuf),
    #[error("no exports found in {}; expected a layout like {}/my-notes/pages/", .0.display(), .0.display())]
    NoExports(PathBuf),
    #[error("{} holds several exports, choose one with --export{}", .base.display(), alternatives(.available))]
    Ambiguous {
        base: PathBuf,
        available: Vec<String>,
    },
}

fn alternatives(available: &[String]) -> String {
    if available.is_empty() {
        String::new()
    } else {
        format!(" (available: {})", available.join(", "))
    }
}

/// A selected export directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    /// Directory name, used to label output.
    pub name: String,
    pub root: PathBuf,
}

impl Export {
    pub fn collection_dir(&self, collection: Collection) -> PathBuf {
        self.root.join(collection.dir_name())
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }
}

/// True if `dir` contains `pages/` or `journals/`.
pub fn is_export(dir: &Path) -> bool {
    Collection::ALL
        .iter()
        .any(|c| dir.join(c.dir_name()).is_dir())
}

/// Names of the immediate subdirectories of `base` that are exports, sorted.
///
/// A missing `base` yields an empty list. An unreadable `base`, or an
/// entry that cannot be listed, is logged and skipped.
pub fn list_exports(base: &Path) -> Vec<String> {
    match fs::read_dir(base) {
        Ok(entries) => export_names(base, entries.map(|e| e.map(|e| e.path()))),
        Err(e) => {
            if base.exists() {
                tracing::warn!("cannot list {}: {e}", base.display());
            }
            Vec::new()
        }
    }
}

fn export_names(
    base: &Path,
    entries: impl IntoIterator<Item = std::io::Result<PathBuf>>,
) -> Vec<String> {
    let mut names: Vec<String> = entries
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("skipping unreadable entry in {}: {e}", base.display());
                None
            }
        })
        .filter(|p| p.is_dir() && is_export(p))
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names
}

/// Select the export to convert.
///
/// - With a name: `base/name` must exist and be an export.
/// - Without: `base` itself if it is an export, otherwise an error that lists
///   the sub-exports (or says there are none).
pub fn locate(base: &Path, name: Option<&str>) -> Result<Export, LocateError> {
    match name {
        Some(name) => {
            let root = base.join(name);
            if !root.is_dir() {
                return Err(LocateError::NotFound {
                    name: name.to_string(),
                    base: base.to_path_buf(),
                    available: list_exports(base),
                });
            }
            if !is_export(&root) {
                return Err(LocateError::NotAnExport(root));
            }
            Ok(Export {
                name: name.to_string(),
                root,
            })
        }
        None => {
            if is_export(base) {
                return Ok(Export {
                    name: dir_label(base),
                    root: base.to_path_buf(),
                });
            }
            let available = list_exports(base);
            if available.is_empty() {
                Err(LocateError::NoExports(base.to_path_buf()))
            } else {
                Err(LocateError::Ambiguous {
                    base: base.to_path_buf(),
                    available,
                })
            }
        }
    }
}

/// Last path component, falling back to the canonical path for `.`/`..`.
fn dir_label(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            dir.canonicalize()
                .ok()?
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "export".to_string())
}
