//! Copying the `assets/` tree.
//!
//! Files are flattened: `assets/2025/chart.png` lands at
//! `<dest>/chart.png`, matching the basename-only image references the
//! transformer produces. Two files with the same basename collide; the
//! later one in walk order wins and a warning is logged.

use crate::report::RunLog;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("cannot create asset directory {}: {source}", .path.display())]
    CreateDir {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Default)]
pub struct AssetCopy {
    /// Path relative to the source `assets/` → path relative to the page
    /// directory (`assets/<basename>`).
    pub mapping: BTreeMap<String, String>,
    pub copied: usize,
    pub failed: usize,
}

/// Copy every file under `src` into `dest`.
///
/// A missing `src` is not an error. Per-file failures are logged and
/// counted; only failing to create `dest` aborts.
pub fn copy_assets(src: &Path, dest: &Path, log: &mut RunLog) -> Result<AssetCopy, AssetError> {
    let mut result = AssetCopy::default();
    if !src.is_dir() {
        log.info("no assets directory, skipping");
        return Ok(result);
    }
    fs::create_dir_all(dest).map_err(|source| AssetError::CreateDir {
        path: dest.to_path_buf(),
        source,
    })?;

    let dest_label = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "assets".to_string());
    let mut seen: HashSet<String> = HashSet::new();

    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log.error(format!("cannot read asset entry: {e}"));
                result.failed += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let rel = path
            .strip_prefix(src)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        let basename = entry.file_name().to_string_lossy().into_owned();

        if !seen.insert(basename.clone()) {
            log.warn(format!("asset {rel} overwrites an earlier {basename}"));
        }
        match fs::copy(path, dest.join(&basename)) {
            Ok(_) => {
                tracing::debug!(asset = %rel, "copied");
                result.mapping.insert(rel, format!("{dest_label}/{basename}"));
                result.copied += 1;
            }
            Err(e) => {
                log.error(format!("failed to copy asset {rel}: {e}"));
                result.failed += 1;
            }
        }
    }
    log.info(format!("copied {} asset files", result.copied));
    Ok(result)
}
