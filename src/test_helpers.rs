//! Shared test utilities.
//!
//! Provides in-memory document constructors and an on-disk export fixture
//! backed by a temp directory.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let fx = ExportFixture::new()
//!     .page("Project A", "See [[Project B]]")
//!     .page("Project B", "")
//!     .journal("2025_01_01", "- TODO plan");
//! let result = scan(&fx.export()).unwrap();
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::locate::Export;
use crate::registry::{PageRecord, Registry};
use crate::types::{Collection, SourceDocument};

// =========================================================================
// In-memory documents
// =========================================================================

pub fn page(key: &str, text: &str) -> SourceDocument {
    SourceDocument::new(Collection::Page, key, text)
}

pub fn journal(key: &str, text: &str) -> SourceDocument {
    SourceDocument::new(Collection::Journal, key, text)
}

// =========================================================================
// On-disk export
// =========================================================================

/// A temp directory laid out as an export named `notes`.
pub struct ExportFixture {
    tmp: TempDir,
}

impl ExportFixture {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("notes")).unwrap();
        Self { tmp }
    }

    pub fn root(&self) -> std::path::PathBuf {
        self.tmp.path().join("notes")
    }

    /// Parent directory of the export, usable as an output base.
    pub fn base(&self) -> &Path {
        self.tmp.path()
    }

    fn write(self, rel: &str, contents: &[u8]) -> Self {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
        self
    }

    pub fn page(self, key: &str, text: &str) -> Self {
        self.write(&format!("pages/{key}.md"), text.as_bytes())
    }

    pub fn journal(self, key: &str, text: &str) -> Self {
        self.write(&format!("journals/{key}.md"), text.as_bytes())
    }

    pub fn asset(self, rel: &str, bytes: &[u8]) -> Self {
        self.write(&format!("assets/{rel}"), bytes)
    }

    pub fn config(self, toml: &str) -> Self {
        self.write("config.toml", toml.as_bytes())
    }

    pub fn export(&self) -> Export {
        Export {
            name: "notes".to_string(),
            root: self.root(),
        }
    }
}

// =========================================================================
// Registry lookups: panic with a clear message on miss
// =========================================================================

/// Find a record by key in either collection. Panics if not found.
pub fn find_record<'a>(registry: &'a Registry, key: &str) -> &'a PageRecord {
    registry.resolve(key).unwrap_or_else(|| {
        let keys: Vec<&str> = registry.iter().map(|r| r.key.as_str()).collect();
        panic!("record '{key}' not found. Available: {keys:?}")
    })
}
