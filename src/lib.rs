//! # logseq-notion
//!
//! Converts an outliner graph export (a directory with `pages/` and
//! `journals/` of markdown files plus an `assets/` tree) into a renamed,
//! link-consistent output tree a block-based document system can import.
//! Optionally it also writes the documents as one database: CSV tables,
//! a landing page, and per-page property headers.
//!
//! # Architecture: Two-Phase Pipeline
//!
//! ```text
//! Phase 1  scan → Registry::build     every logical key gets its output name
//! Phase 2  Transformer::rewrite       bodies rewritten against the frozen registry
//!          emit / table / landing     files written in document order
//! ```
//!
//! The registry is complete before any body is rewritten, so a link to a
//! page that sorts later still resolves. Phase 2 only reads the registry,
//! which lets it run on the rayon pool.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`locate`] | Find the export directory, list sibling exports |
//! | [`scan`] | Read `pages/*.md` and `journals/*.md` |
//! | [`registry`] | Phase 1: logical key → display name, filename, identifier |
//! | [`transform`] | Phase 2: the six ordered rewrite stages |
//! | [`emit`] | Parallel rewrite, sequential write |
//! | [`table`] | Database rows, summaries, CSV tables, page headers |
//! | [`landing`] | Landing page of the database variant |
//! | [`assets`] | Flatten `assets/` into the output |
//! | [`report`] | Run log and `conversion_report.json` |
//! | [`pipeline`] | One run end to end, plus the dry-run check |
//! | [`config`] | Layered `config.toml` loading and validation |
//! | [`locale`] | Fixed strings per output locale |
//! | [`naming`] | Journal keys, filename sanitization |
//! | [`types`] | `Collection`, `SourceDocument` |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Targeted Substitutions, Not a Markdown AST
//!
//! Each rewrite stage matches one inline syntax with a regex and leaves
//! everything else byte-for-byte intact. A document with no outliner
//! syntax comes out unchanged, which a parse-and-render round trip cannot
//! promise.
//!
//! ## Identifiers Are Opt-In
//!
//! With `with_ids = false` (the default) output names are a pure function
//! of the input, so two runs over the same export produce identical trees.
//! Identifiers only matter when the import target needs globally unique
//! names.

pub mod assets;
pub mod config;
pub mod emit;
pub mod landing;
pub mod locale;
pub mod locate;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod scan;
pub mod table;
pub mod transform;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
