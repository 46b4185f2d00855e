//! One conversion run, end to end.
//!
//! ```text
//! scan ──▶ Registry::build ──▶ assets ──▶ rewrite_all ──▶ emit ──▶ tables + landing ──▶ report
//!          (Phase 1, frozen)              (Phase 2, rayon)          (database only)
//! ```
//!
//! Output layout of the two variants:
//!
//! ```text
//! Pages                             Database
//! <out>/                            <out>/
//! ├── Project A.md                  ├── <team>.md                 # landing page
//! ├── 2025年01月01日.md              ├── <team>/
//! ├── assets/                       │   ├── <db>.csv
//! └── conversion_report.json        │   ├── <db>_today.csv … _wiki.csv
//!                                   │   └── <db>/
//!                                   │       ├── Project A.md
//!                                   │       └── assets/
//!                                   └── conversion_report.json
//! ```
//!
//! Only scanning and creating the output directory can fail a run. Every
//! later problem is logged and counted, and output already written stays.

use crate::assets::{AssetCopy, copy_assets};
use crate::config::ConvertConfig;
use crate::emit::{RenderedPage, emit_pages, rewrite_all};
use crate::landing::{self, Landing};
use crate::locate::Export;
use crate::naming::{MARKDOWN_EXT, sanitize_filename};
use crate::registry::{Registry, RegistryOptions, generate_id};
use crate::report::{DatabaseStats, Level, PageMapping, RunLog, RunReport, write_report};
use crate::scan::{ScanError, scan};
use crate::table::{Database, DatabaseEntry, RowDefaults, page_header};
use crate::transform::{Transformer, encode_component};
use crate::types::{Collection, SourceDocument};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("cannot create output directory {}: {source}", .path.display())]
    CreateOutput {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Which output tree to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    /// One markdown file per document.
    Pages,
    /// Pages inside a database directory plus CSV tables and a landing page.
    Database {
        /// Overrides `database.team_name` from config.
        team_name: Option<String>,
    },
}

impl Variant {
    pub fn name(&self) -> &'static str {
        match self {
            Variant::Pages => "pages",
            Variant::Database { .. } => "database",
        }
    }
}

/// Timestamped run directory for an export.
///
/// - pages: `<output>/<export>-<YYYYmmdd-HHMMSS>/notion-output`
/// - database: `<output>/<export>-team-<YYYYmmdd-HHMMSS>/notion-import`
pub fn run_directory(
    output: &Path,
    export_name: &str,
    variant: &Variant,
    now: DateTime<Local>,
) -> PathBuf {
    let stamp = now.format("%Y%m%d-%H%M%S");
    match variant {
        Variant::Pages => output
            .join(format!("{export_name}-{stamp}"))
            .join("notion-output"),
        Variant::Database { .. } => output
            .join(format!("{export_name}-team-{stamp}"))
            .join("notion-import"),
    }
}

/// Counts of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub export_name: String,
    pub variant: &'static str,
    pub out_dir: PathBuf,
    /// Documents in the registry.
    pub total_pages: usize,
    pub written_pages: usize,
    /// Documents that could not be read or written.
    pub failed_pages: usize,
    pub assets_copied: usize,
    pub assets_failed: usize,
    pub warnings: usize,
    pub errors: usize,
    pub database: Option<DatabaseStats>,
    pub report: Option<PathBuf>,
}

/// Convert `export` into `out_dir`.
pub fn run(
    export: &Export,
    out_dir: &Path,
    config: &ConvertConfig,
    variant: &Variant,
) -> Result<RunSummary, PipelineError> {
    let _span = tracing::info_span!("run", export = %export.name, variant = variant.name()).entered();
    let mut log = RunLog::new();
    log.info(format!(
        "converting '{}' ({}) -> {}",
        export.name,
        variant.name(),
        out_dir.display()
    ));
    create_dir(out_dir)?;

    let scanned = scan(export)?;
    for failure in &scanned.failures {
        log.error(format!(
            "cannot read {}: {}",
            failure.path.display(),
            failure.error
        ));
    }
    log.info(format!(
        "found {} pages and {} journals",
        scanned.count(Collection::Page),
        scanned.count(Collection::Journal)
    ));

    let registry = Registry::build(
        &scanned.documents,
        &RegistryOptions {
            with_ids: config.with_ids,
            locale: config.locale,
        },
    );
    for record in registry.iter() {
        log.info(format!(
            "mapped {} '{}' -> {}",
            record.collection, record.key, record.filename
        ));
    }
    for renamed in registry.renamed() {
        log.warn(format!(
            "{} '{}' written as {}: {} is already taken",
            renamed.collection, renamed.key, renamed.filename, renamed.wanted
        ));
    }

    let mut outcome = match variant {
        Variant::Pages => emit_plain(export, out_dir, config, &scanned.documents, &registry, &mut log),
        Variant::Database { team_name } => emit_database(
            export,
            out_dir,
            config,
            team_name.as_deref(),
            &scanned.documents,
            &registry,
            &mut log,
        )?,
    };
    outcome.failed += scanned.failures.len();

    log.info(format!(
        "{} of {} documents written",
        outcome.written,
        registry.len()
    ));
    let report = RunReport {
        conversion_time: Local::now(),
        source_name: &export.name,
        variant: variant.name(),
        total_pages: registry.len(),
        written_pages: outcome.written,
        failed_pages: outcome.failed,
        copied_assets: outcome.assets.copied,
        failed_assets: outcome.assets.failed,
        page_mapping: PageMapping::from_registry(&registry),
        asset_mapping: &outcome.assets.mapping,
        database: outcome.database.as_ref(),
        conversion_log: log.entries(),
    };
    let written = write_report(out_dir, &report);
    let report_path = match written {
        Ok(path) => Some(path),
        Err(e) => {
            log.error(format!("failed to write report: {e}"));
            None
        }
    };

    Ok(RunSummary {
        export_name: export.name.clone(),
        variant: variant.name(),
        out_dir: out_dir.to_path_buf(),
        total_pages: registry.len(),
        written_pages: outcome.written,
        failed_pages: outcome.failed,
        assets_copied: outcome.assets.copied,
        assets_failed: outcome.assets.failed,
        warnings: log.count(Level::Warning),
        errors: log.count(Level::Error),
        database: outcome.database,
        report: report_path,
    })
}

struct VariantOutcome {
    written: usize,
    failed: usize,
    assets: AssetCopy,
    database: Option<DatabaseStats>,
}

fn create_dir(path: &Path) -> Result<(), PipelineError> {
    fs::create_dir_all(path).map_err(|source| PipelineError::CreateOutput {
        path: path.to_path_buf(),
        source,
    })
}

fn copy_export_assets(export: &Export, page_dir: &Path, log: &mut RunLog) -> AssetCopy {
    match copy_assets(&export.assets_dir(), &page_dir.join("assets"), log) {
        Ok(copy) => copy,
        Err(e) => {
            log.error(e.to_string());
            AssetCopy::default()
        }
    }
}

fn emit_plain(
    export: &Export,
    out_dir: &Path,
    config: &ConvertConfig,
    documents: &[SourceDocument],
    registry: &Registry,
    log: &mut RunLog,
) -> VariantOutcome {
    let assets = copy_export_assets(export, out_dir, log);
    let transformer = Transformer::new(registry, config.locale.labels());
    let pages = rewrite_all(documents, registry, &transformer);
    let emitted = emit_pages(&pages, out_dir, log, |_, p| p.rewritten.text.clone());
    VariantOutcome {
        written: emitted.written,
        failed: emitted.failed.len(),
        assets,
        database: None,
    }
}

/// Name with an optional identifier suffix, as for page filenames.
fn with_optional_id(name: &str, with_ids: bool) -> String {
    let clean = sanitize_filename(name);
    if with_ids {
        format!("{clean} {}", generate_id())
    } else {
        clean
    }
}

fn emit_database(
    export: &Export,
    out_dir: &Path,
    config: &ConvertConfig,
    team_name: Option<&str>,
    documents: &[SourceDocument],
    registry: &Registry,
    log: &mut RunLog,
) -> Result<VariantOutcome, PipelineError> {
    let labels = config.locale.labels();
    let team = team_name
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| config.team_name());
    let main_name = with_optional_id(team, config.with_ids);
    let db_name = with_optional_id(&format!("{team}{}", labels.database_suffix), config.with_ids);
    let main_dir = out_dir.join(&main_name);
    let page_dir = main_dir.join(&db_name);
    create_dir(&page_dir)?;
    log.info(format!("database '{db_name}' in {}", page_dir.display()));

    let assets = copy_export_assets(export, &page_dir, log);

    // Table-of-contents pages are not written; links to them open the
    // landing page instead, two levels above the page directory.
    let landing_file = format!("{main_name}.{MARKDOWN_EXT}");
    let toc_keys: Vec<&str> = registry
        .records(Collection::Page)
        .filter(|r| is_toc_key(&r.key, &config.toc_page))
        .map(|r| r.key.as_str())
        .collect();
    let transformer = redirect_toc(
        Transformer::new(registry, labels),
        &toc_keys,
        &format!("../../{}", encode_component(&landing_file)),
    );
    let (toc, pages): (Vec<RenderedPage>, Vec<RenderedPage>) =
        rewrite_all(documents, registry, &transformer)
            .into_iter()
            .partition(|p| is_toc(p, &config.toc_page));

    let defaults = RowDefaults {
        created_by: config.created_by().to_string(),
        status: config.database.status.clone(),
        summary_length: config.database.summary_length,
    };
    let entries: Vec<DatabaseEntry> = pages
        .iter()
        .map(|p| DatabaseEntry::compose(p.record, &p.rewritten.text, config.locale, &defaults))
        .collect();
    let emitted = emit_pages(&pages, &page_dir, log, |i, p| {
        format!("{}{}", page_header(&entries[i], labels), p.rewritten.text)
    });

    let kept: Vec<DatabaseEntry> = entries
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !emitted.failed.contains(i))
        .map(|(_, e)| e)
        .collect();
    let database = Database {
        name: &db_name,
        labels,
        entries: &kept,
    };
    match database.write_all(&main_dir) {
        Ok(paths) => log.info(format!("wrote {} tables with {} rows", paths.len(), kept.len())),
        Err(e) => log.error(format!("failed to write tables: {e}")),
    }

    for extra in toc.iter().skip(1) {
        log.warn(format!(
            "page '{}' also matches the table of contents '{}' and is skipped",
            extra.source.key, config.toc_page
        ));
    }
    // The table-of-contents body is re-rendered with links into the page
    // directory since the landing page sits two levels above it.
    let contents = match toc.first() {
        Some(page) => {
            log.info(format!("folding '{}' into the landing page", page.source.key));
            let prefixed = redirect_toc(
                Transformer::new(registry, labels)
                    .with_link_prefix(&format!("{main_name}/{db_name}")),
                &toc_keys,
                &encode_component(&landing_file),
            );
            let rewritten = prefixed.rewrite(&page.source.text);
            for name in &rewritten.unresolved {
                log.warn(format!(
                    "unresolved link [[{name}]] in page '{}'",
                    page.source.key
                ));
            }
            rewritten.text
        }
        None => String::new(),
    };
    let landing = Landing {
        team_name: team,
        table_dir: &main_name,
        contents: &contents,
        source_name: &export.name,
        import_time: Local::now(),
    };
    match fs::write(out_dir.join(&landing_file), landing::render(&landing, &database, labels)) {
        Ok(()) => log.info(format!("wrote landing page {landing_file}")),
        Err(e) => log.error(format!("failed to write landing page {landing_file}: {e}")),
    }

    Ok(VariantOutcome {
        written: emitted.written,
        failed: emitted.failed.len(),
        assets,
        database: Some(database.stats()),
    })
}

fn is_toc(page: &RenderedPage, toc_page: &str) -> bool {
    page.source.collection == Collection::Page && is_toc_key(&page.source.key, toc_page)
}

fn redirect_toc<'r>(transformer: Transformer<'r>, keys: &[&str], target: &str) -> Transformer<'r> {
    keys.iter()
        .fold(transformer, |t, key| t.with_redirect(Collection::Page, key, target))
}

fn is_toc_key(key: &str, toc_page: &str) -> bool {
    key.eq_ignore_ascii_case(toc_page)
}

/// An unresolved reference found by [`check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    pub collection: Collection,
    pub key: String,
    pub name: String,
}

/// Result of a dry run.
#[derive(Debug, Default)]
pub struct CheckReport {
    pub pages: usize,
    pub journals: usize,
    pub unreadable: Vec<PathBuf>,
    pub unresolved: Vec<Unresolved>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.unreadable.is_empty() && self.unresolved.is_empty()
    }
}

/// Scan, build the registry and rewrite in memory; write nothing.
pub fn check(export: &Export, config: &ConvertConfig) -> Result<CheckReport, PipelineError> {
    let scanned = scan(export)?;
    let registry = Registry::build(
        &scanned.documents,
        &RegistryOptions {
            with_ids: false,
            locale: config.locale,
        },
    );
    let transformer = Transformer::new(&registry, config.locale.labels());
    let unresolved = rewrite_all(&scanned.documents, &registry, &transformer)
        .into_iter()
        .flat_map(|page| {
            let collection = page.source.collection;
            let key = page.source.key.clone();
            page.rewritten.unresolved.into_iter().map(move |name| Unresolved {
                collection,
                key: key.clone(),
                name,
            })
        })
        .collect();
    Ok(CheckReport {
        pages: scanned.count(Collection::Page),
        journals: scanned.count(Collection::Journal),
        unreadable: scanned.failures.into_iter().map(|f| f.path).collect(),
        unresolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Locale;
    use crate::test_helpers::ExportFixture;
    use chrono::TimeZone;

    fn en() -> ConvertConfig {
        ConvertConfig {
            locale: Locale::En,
            ..ConvertConfig::default()
        }
    }

    #[test]
    fn run_directory_naming() {
        let now = Local.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        let out = Path::new("out");
        assert_eq!(
            run_directory(out, "notes", &Variant::Pages, now),
            Path::new("out/notes-20250304-050607/notion-output")
        );
        assert_eq!(
            run_directory(out, "notes", &Variant::Database { team_name: None }, now),
            Path::new("out/notes-team-20250304-050607/notion-import")
        );
    }

    #[test]
    fn plain_run_writes_pages_assets_and_report() {
        let fx = ExportFixture::new()
            .page("Project A", "See [[Project B]] ![c](../assets/c.png)")
            .page("Project B", "plain")
            .journal("2025_01_01", "- TODO x")
            .asset("c.png", b"png");
        let out = fx.base().join("out");

        let summary = run(&fx.export(), &out, &en(), &Variant::Pages).unwrap();

        assert_eq!(summary.total_pages, 3);
        assert_eq!(summary.written_pages, 3);
        assert_eq!(summary.failed_pages, 0);
        assert_eq!(summary.assets_copied, 1);
        assert_eq!(summary.warnings, 0);
        assert_eq!(
            fs::read_to_string(out.join("Project A.md")).unwrap(),
            "See [Project B](Project%20B.md) ![c](c.png)"
        );
        assert_eq!(fs::read_to_string(out.join("Project B.md")).unwrap(), "plain");
        assert_eq!(fs::read_to_string(out.join("2025-01-01.md")).unwrap(), "- [ ] x");
        assert!(out.join("assets/c.png").is_file());
        assert!(summary.report.unwrap().is_file());
    }

    #[test]
    fn database_run_layout() {
        let fx = ExportFixture::new()
            .page("contents", "- [[Project A]]")
            .page("Project A", "body")
            .journal("2025_01_01", "day");
        let out = fx.base().join("out");
        let variant = Variant::Database {
            team_name: Some("Team".into()),
        };

        let summary = run(&fx.export(), &out, &en(), &variant).unwrap();

        let page_dir = out.join("Team/Team Database");
        assert!(page_dir.join("Project A.md").is_file());
        assert!(page_dir.join("2025-01-01.md").is_file());
        assert!(!page_dir.join("contents.md").exists());
        assert!(out.join("Team/Team Database.csv").is_file());
        assert_eq!(summary.written_pages, 2);

        let landing = fs::read_to_string(out.join("Team.md")).unwrap();
        assert!(landing.contains("- [Project A](Team/Team%20Database/Project%20A.md)"));
        assert!(landing.contains("[Team Database](Team/Team%20Database.csv)"));

        let db = summary.database.unwrap();
        assert_eq!(db.total_entries, 2);
        assert_eq!(db.journal_entries, 1);
    }

    #[test]
    fn links_to_contents_open_the_landing_page() {
        let fx = ExportFixture::new()
            .page("contents", "- [[Project A]] [[contents]]")
            .page("Project A", "back to [[Contents]]");
        let out = fx.base().join("out");
        let variant = Variant::Database {
            team_name: Some("Team".into()),
        };

        let summary = run(&fx.export(), &out, &en(), &variant).unwrap();

        let page_dir = out.join("Team/Team Database");
        let body = fs::read_to_string(page_dir.join("Project A.md")).unwrap();
        assert!(body.ends_with("back to [Contents](../../Team.md)"), "{body}");
        assert!(page_dir.join("../../Team.md").is_file());
        let landing = fs::read_to_string(out.join("Team.md")).unwrap();
        assert!(landing.contains("- [Project A](Team/Team%20Database/Project%20A.md) [contents](Team.md)"));
        assert_eq!(summary.warnings, 0);
    }

    #[test]
    fn extra_contents_pages_are_warned_about() {
        let fx = ExportFixture::new()
            .page("Contents", "- [[A]]")
            .page("contents", "- [[A]] again")
            .page("A", "");
        let out = fx.base().join("out");
        let variant = Variant::Database {
            team_name: Some("Team".into()),
        };

        let summary = run(&fx.export(), &out, &en(), &variant).unwrap();

        assert_eq!(summary.written_pages, 1);
        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(summary.report.unwrap()).unwrap()).unwrap();
        let warnings: Vec<&str> = report["conversion_log"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|e| e["level"] == "warning")
            .filter_map(|e| e["message"].as_str())
            .collect();
        assert!(
            warnings
                .iter()
                .any(|m| m.starts_with("page 'contents' also matches the table of contents")),
            "{warnings:?}"
        );
        let landing = fs::read_to_string(out.join("Team.md")).unwrap();
        assert!(landing.contains("- [A](Team/Team%20Database/A.md)\n"));
        assert!(!landing.contains("again"));
    }

    #[test]
    fn page_and_journal_sharing_a_key_both_written() {
        let fx = ExportFixture::new()
            .page("inbox", "PAGE BODY")
            .journal("inbox", "JOURNAL BODY")
            .page("Other", "[[inbox]]");
        let out = fx.base().join("out");

        let summary = run(&fx.export(), &out, &en(), &Variant::Pages).unwrap();

        assert_eq!(summary.written_pages, 3);
        assert_eq!(summary.warnings, 1);
        assert_eq!(fs::read_to_string(out.join("inbox.md")).unwrap(), "PAGE BODY");
        assert_eq!(fs::read_to_string(out.join("inbox (2).md")).unwrap(), "JOURNAL BODY");
        assert_eq!(fs::read_to_string(out.join("Other.md")).unwrap(), "[inbox](inbox.md)");
    }

    #[test]
    fn failed_asset_copy_is_counted() {
        let fx = ExportFixture::new().page("A", "").asset("c.png", b"png");
        let out = fx.base().join("out");
        fs::create_dir_all(out.join("assets/c.png")).unwrap();

        let summary = run(&fx.export(), &out, &en(), &Variant::Pages).unwrap();

        assert_eq!(summary.assets_copied, 0);
        assert_eq!(summary.assets_failed, 1);
        assert_eq!(summary.errors, 1);
    }

    #[test]
    fn team_name_falls_back_to_config() {
        let fx = ExportFixture::new().page("A", "");
        let out = fx.base().join("out");
        let mut config = en();
        config.database.team_name = "Lab".into();

        run(&fx.export(), &out, &config, &Variant::Database { team_name: None }).unwrap();

        assert!(out.join("Lab.md").is_file());
        assert!(out.join("Lab/Lab Database/A.md").is_file());
    }

    #[test]
    fn export_config_drives_naming() {
        let fx = ExportFixture::new()
            .journal("2025_01_01", "")
            .config("locale = \"en\"\nwith_ids = false\n");
        let out = fx.base().join("out");
        let config = crate::config::load_config(fx.base(), &fx.root()).unwrap();

        run(&fx.export(), &out, &config, &Variant::Pages).unwrap();

        assert!(out.join("2025-01-01.md").is_file());
    }

    #[test]
    fn unreadable_document_counts_as_failed() {
        let fx = ExportFixture::new().page("good", "ok");
        fs::write(fx.root().join("pages/bad.md"), [0xff, 0xfe]).unwrap();
        let out = fx.base().join("out");

        let summary = run(&fx.export(), &out, &en(), &Variant::Pages).unwrap();

        assert_eq!(summary.written_pages, 1);
        assert_eq!(summary.failed_pages, 1);
        assert_eq!(summary.errors, 1);
    }

    #[test]
    fn check_reports_unresolved_without_writing() {
        let fx = ExportFixture::new()
            .page("A", "[[B]] [[Nope]]")
            .page("B", "")
            .journal("2025_01_01", "[[Gone]]");

        let report = check(&fx.export(), &en()).unwrap();

        assert_eq!(report.pages, 2);
        assert_eq!(report.journals, 1);
        let names: Vec<&str> = report.unresolved.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Nope", "Gone"]);
        assert_eq!(report.unresolved[1].collection, Collection::Journal);
        assert!(!report.is_clean());
        assert_eq!(fs::read_dir(fx.base()).unwrap().count(), 1);
    }
}
