//! Phase 2 output: rewrite every document and write it out.
//!
//! Rewriting is pure and runs on the rayon pool; results come back in
//! document order. Writing and logging then happen on the calling thread
//! in that same order, so the run log does not depend on scheduling.

use crate::registry::{PageRecord, Registry};
use crate::report::RunLog;
use crate::transform::{Rewritten, Transformer};
use crate::types::SourceDocument;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A document paired with its registry record and rewritten body.
#[derive(Debug)]
pub struct RenderedPage<'a> {
    pub source: &'a SourceDocument,
    pub record: &'a PageRecord,
    pub rewritten: Rewritten,
}

/// Rewrite all documents in parallel against a frozen registry.
///
/// A document without a registry record is skipped; this only happens
/// for a duplicate key whose record belongs to another file.
pub fn rewrite_all<'a>(
    documents: &'a [SourceDocument],
    registry: &'a Registry,
    transformer: &Transformer,
) -> Vec<RenderedPage<'a>> {
    documents
        .par_iter()
        .filter_map(|doc| {
            let record = registry.get(doc.collection, &doc.key)?;
            Some(RenderedPage {
                source: doc,
                record,
                rewritten: transformer.rewrite(&doc.text),
            })
        })
        .collect()
}

/// Log one warning per unresolved reference in `page`.
pub fn log_unresolved(page: &RenderedPage, log: &mut RunLog) {
    for name in &page.rewritten.unresolved {
        log.warn(format!(
            "unresolved link [[{name}]] in {} '{}'",
            page.source.collection, page.source.key
        ));
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EmitOutcome {
    pub written: usize,
    /// Indices into the emitted slice of pages that could not be written.
    pub failed: Vec<usize>,
}

/// Write each page to `dir/<record.filename>` in order.
///
/// `render` builds the file contents from a page and its index. Failures
/// are logged and recorded; the remaining pages are still written.
pub fn emit_pages<F>(pages: &[RenderedPage], dir: &Path, log: &mut RunLog, render: F) -> EmitOutcome
where
    F: Fn(usize, &RenderedPage) -> String,
{
    let mut outcome = EmitOutcome::default();
    for (index, page) in pages.iter().enumerate() {
        log_unresolved(page, log);
        match write_page(dir, &page.record.filename, &render(index, page)) {
            Ok(_) => {
                log.info(format!(
                    "converted {} '{}' -> {}",
                    page.source.collection, page.source.key, page.record.filename
                ));
                outcome.written += 1;
            }
            Err(e) => {
                log.error(format!("failed to write {}: {e}", page.record.filename));
                outcome.failed.push(index);
            }
        }
    }
    outcome
}

pub fn write_page(dir: &Path, filename: &str, contents: &str) -> io::Result<PathBuf> {
    let path = dir.join(filename);
    fs::write(&path, contents)?;
    Ok(path)
}
