//! Shared types passed between pipeline stages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which collection of an export a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Standalone pages under `pages/`.
    Page,
    /// Date-keyed entries under `journals/`.
    Journal,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Page, Collection::Journal];

    /// Directory name of the collection inside an export.
    pub fn dir_name(self) -> &'static str {
        match self {
            Collection::Page => "pages",
            Collection::Journal => "journals",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Collection::Page => "page",
            Collection::Journal => "journal",
        })
    }
}

/// One input file, read once and never mutated.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Logical key: the filename stem, unique within its collection.
    pub key: String,
    pub collection: Collection,
    pub text: String,
    /// Where the document was read from.
    pub path: PathBuf,
}

impl SourceDocument {
    pub fn new(collection: Collection, key: impl Into<String>, text: impl Into<String>) -> Self {
        let key = key.into();
        let path = PathBuf::from(collection.dir_name()).join(format!("{key}.md"));
        Self {
            key,
            collection,
            text: text.into(),
            path,
        }
    }
}
