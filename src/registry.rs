//! Page registry: Phase 1 of the conversion.
//!
//! Every document may link to every other document, in any scan order, so
//! the complete mapping from logical key to output identity has to exist
//! before a single body is rewritten. [`Registry::build`] computes that
//! mapping in one pass and returns an immutable value; Phase 2 only ever
//! sees `&Registry`.
//!
//! ## Naming
//!
//! | Collection | Key | Display name | Filename |
//! |---|---|---|---|
//! | page | `Project A` | `Project A` | `Project A.md` |
//! | journal | `2025_01_01` | `2025年01月01日` (zh) | `2025年01月01日.md` |
//! | journal | `inbox` | `inbox` | `inbox.md` |
//!
//! With identifier generation on, a 32-character random token is inserted
//! before the extension: `Project A 3f2a…9c.md`.
//!
//! ## Collisions
//!
//! Pages and journals are stored in separate maps, so a page and a journal
//! with the same key get independent records. Within one collection the
//! last document wins.
//!
//! Output filenames are unique across both collections, compared without
//! case. When two records would share a filename (`inbox` page and `inbox`
//! journal, or `a:b` and `a?b` which both sanitize to `a_b`), the first in
//! [`Registry::iter`] order keeps it and later ones get a counter:
//! `inbox (2).md`. Every such rename is kept in [`Registry::renamed`].

use crate::locale::Locale;
use crate::naming::{output_filename, parse_journal_key, sanitize_filename};
use crate::types::{Collection, SourceDocument};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

/// Inputs to registry construction that are not part of the documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryOptions {
    /// Append a random identifier to every output filename.
    pub with_ids: bool,
    /// Locale used for journal display names.
    pub locale: Locale,
}

/// Output identity of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRecord {
    pub key: String,
    pub collection: Collection,
    pub display_name: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// A record whose filename was taken by an earlier record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renamed {
    pub collection: Collection,
    pub key: String,
    /// The filename the record would have had.
    pub wanted: String,
    pub filename: String,
}

/// Frozen logical-key → [`PageRecord`] mapping for one run.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pages: BTreeMap<String, PageRecord>,
    journals: BTreeMap<String, PageRecord>,
    /// Lowercased key → (collection, key), for case-insensitive lookups.
    folded: BTreeMap<String, (Collection, String)>,
    renamed: Vec<Renamed>,
}

/// Fixed-length random token, not derived from content.
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Display name for a document, before sanitization.
pub fn display_name(collection: Collection, key: &str, locale: Locale) -> String {
    match collection {
        Collection::Page => key.to_string(),
        Collection::Journal => match parse_journal_key(key) {
            Some(date) => locale.journal_title(&date),
            None => key.to_string(),
        },
    }
}

impl Registry {
    /// Build the registry for a full document set.
    pub fn build(documents: &[SourceDocument], options: &RegistryOptions) -> Self {
        let mut registry = Registry::default();
        for doc in documents {
            registry.insert(doc.collection, &doc.key, options);
        }
        registry.disambiguate();
        registry
    }

    /// Give every record a filename no other record uses, ignoring case.
    fn disambiguate(&mut self) {
        let mut taken = HashSet::new();
        for collection in Collection::ALL {
            let map = match collection {
                Collection::Page => &mut self.pages,
                Collection::Journal => &mut self.journals,
            };
            for record in map.values_mut() {
                if taken.insert(record.filename.to_lowercase()) {
                    continue;
                }
                let stem = sanitize_filename(&record.display_name);
                let filename = (2..)
                    .map(|n| output_filename(&format!("{stem} ({n})"), record.id.as_deref()))
                    .find(|candidate| taken.insert(candidate.to_lowercase()))
                    .unwrap_or_default();
                self.renamed.push(Renamed {
                    collection,
                    key: record.key.clone(),
                    wanted: std::mem::replace(&mut record.filename, filename.clone()),
                    filename,
                });
            }
        }
    }

    fn insert(&mut self, collection: Collection, key: &str, options: &RegistryOptions) {
        let display_name = display_name(collection, key, options.locale);
        let id = options.with_ids.then(generate_id);
        let filename = output_filename(&display_name, id.as_deref());
        let record = PageRecord {
            key: key.to_string(),
            collection,
            display_name,
            filename,
            id,
        };
        // Pages take precedence in the folded index.
        let folded = key.to_lowercase();
        match collection {
            Collection::Page => {
                self.folded
                    .insert(folded, (Collection::Page, key.to_string()));
                self.pages.insert(key.to_string(), record);
            }
            Collection::Journal => {
                let page_owns = matches!(self.folded.get(&folded), Some((Collection::Page, _)));
                if !page_owns {
                    self.folded
                        .insert(folded, (Collection::Journal, key.to_string()));
                }
                self.journals.insert(key.to_string(), record);
            }
        }
    }

    fn map(&self, collection: Collection) -> &BTreeMap<String, PageRecord> {
        match collection {
            Collection::Page => &self.pages,
            Collection::Journal => &self.journals,
        }
    }

    /// Exact lookup within one collection.
    pub fn get(&self, collection: Collection, key: &str) -> Option<&PageRecord> {
        self.map(collection).get(key)
    }

    /// Resolve a cross-reference name.
    ///
    /// Exact page key, then exact journal key, then a case-insensitive match.
    pub fn resolve(&self, name: &str) -> Option<&PageRecord> {
        self.pages
            .get(name)
            .or_else(|| self.journals.get(name))
            .or_else(|| {
                let (collection, key) = self.folded.get(&name.to_lowercase())?;
                self.get(*collection, key)
            })
    }

    /// Records of one collection, ordered by key.
    pub fn records(&self, collection: Collection) -> impl Iterator<Item = &PageRecord> {
        self.map(collection).values()
    }

    /// All records: pages first, then journals.
    pub fn iter(&self) -> impl Iterator<Item = &PageRecord> {
        self.pages.values().chain(self.journals.values())
    }

    /// Records that lost a filename collision, in [`Registry::iter`] order.
    pub fn renamed(&self) -> &[Renamed] {
        &self.renamed
    }

    pub fn len(&self) -> usize {
        self.pages.len() + self.journals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
