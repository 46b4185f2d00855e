//! Tabular projection of the registry: the database variant.
//!
//! Every document becomes one [`DatabaseEntry`] row. Rows go into a
//! primary table `<db>.csv` and six view tables `<db>_<view>.csv` next to
//! it. The views currently hold the same rows as the primary table; the
//! import target filters them after import.
//!
//! Columns, in order (English headers shown; see [`Labels::headers`]):
//!
//! | # | Column          | Journal row      | Article row |
//! |---|-----------------|------------------|-------------|
//! | 1 | Name            | display name     | display name |
//! | 2 | Start date      | `MM/DD/YYYY`     | empty |
//! | 3 | Page type       | journal label    | article label |
//! | 4 | End date        | same as start    | empty |
//! | 5 | Related members | empty            | empty |
//! | 6 | Created by      | config           | config |
//! | 7 | Tags            | empty            | empty |
//! | 8 | Summary         | plain-text body  | plain-text body |
//! | 9 | Status          | config           | config |
//! |10 | Progress        | empty            | empty |

use crate::locale::{Labels, Locale};
use crate::naming::{JournalDate, parse_journal_key};
use crate::registry::PageRecord;
use crate::report::DatabaseStats;
use crate::types::Collection;
use csv::WriterBuilder;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    Journal,
    Article,
}

impl PageType {
    /// Journals are documents from the journal collection, or pages whose
    /// name is itself a journal date.
    pub fn classify(record: &PageRecord, locale: Locale) -> Self {
        if record.collection == Collection::Journal || entry_date(record, locale).is_some() {
            PageType::Journal
        } else {
            PageType::Article
        }
    }

    pub fn label(self, labels: &Labels) -> &'static str {
        match self {
            PageType::Journal => labels.journal_type,
            PageType::Article => labels.article_type,
        }
    }
}

/// Date carried by a record's key or display name, if any.
fn entry_date(record: &PageRecord, locale: Locale) -> Option<JournalDate> {
    parse_journal_key(&record.key).or_else(|| locale.parse_journal_title(&record.display_name))
}

/// Row values shared by every entry of one run.
#[derive(Debug, Clone)]
pub struct RowDefaults {
    pub created_by: String,
    pub status: String,
    pub summary_length: usize,
}

/// One row of the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseEntry {
    pub name: String,
    pub page_type: PageType,
    pub start_date: String,
    pub end_date: String,
    pub related_members: String,
    pub created_by: String,
    pub tags: String,
    pub summary: String,
    pub status: String,
    pub progress: String,
}

impl DatabaseEntry {
    /// Build the row for `record`. `body` is the rewritten document text.
    pub fn compose(record: &PageRecord, body: &str, locale: Locale, defaults: &RowDefaults) -> Self {
        let page_type = PageType::classify(record, locale);
        let date = match page_type {
            PageType::Journal => entry_date(record, locale)
                .map(|d| d.to_us_date())
                .unwrap_or_default(),
            PageType::Article => String::new(),
        };
        Self {
            name: record.display_name.clone(),
            page_type,
            start_date: date.clone(),
            end_date: date,
            related_members: String::new(),
            created_by: defaults.created_by.clone(),
            tags: String::new(),
            summary: extract_summary(body, defaults.summary_length),
            status: defaults.status.clone(),
            progress: String::new(),
        }
    }

    /// Cells in column order.
    pub fn record(&self, labels: &Labels) -> [String; 10] {
        [
            self.name.clone(),
            self.start_date.clone(),
            self.page_type.label(labels).to_string(),
            self.end_date.clone(),
            self.related_members.clone(),
            self.created_by.clone(),
            self.tags.clone(),
            self.summary.clone(),
            self.status.clone(),
            self.progress.clone(),
        ]
    }
}

/// Plain-text summary of a markdown body.
///
/// Headings, emphasis and link text are kept; images, code and raw HTML
/// are dropped. Whitespace runs collapse to one space. Longer results are
/// cut to `max_chars` characters and get `...` appended.
pub fn extract_summary(body: &str, max_chars: usize) -> String {
    let mut text = String::new();
    let mut skip_depth = 0usize;
    for event in Parser::new_ext(body, Options::ENABLE_TASKLISTS | Options::ENABLE_STRIKETHROUGH)
    {
        match event {
            Event::Start(Tag::Image { .. } | Tag::CodeBlock(_)) => skip_depth += 1,
            Event::End(TagEnd::Image | TagEnd::CodeBlock) => {
                skip_depth = skip_depth.saturating_sub(1)
            }
            _ if skip_depth > 0 => {}
            Event::Text(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item) => text.push(' '),
            _ => {}
        }
    }
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > max_chars {
        let cut: String = collapsed.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    } else {
        collapsed
    }
}

/// The six filtered views written next to the primary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Today,
    Global,
    Projects,
    Tasks,
    Meetings,
    Wiki,
}

impl View {
    pub const ALL: [View; 6] = [
        View::Today,
        View::Global,
        View::Projects,
        View::Tasks,
        View::Meetings,
        View::Wiki,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            View::Today => "today",
            View::Global => "global",
            View::Projects => "projects",
            View::Tasks => "tasks",
            View::Meetings => "meetings",
            View::Wiki => "wiki",
        }
    }

    pub fn title(self, labels: &Labels) -> &'static str {
        labels.view_titles[self as usize]
    }

    /// Rows shown in this view. Every view shows all rows for now.
    pub fn select(self, entries: &[DatabaseEntry]) -> Vec<&DatabaseEntry> {
        entries.iter().collect()
    }
}

/// Primary table plus views, named after the database.
#[derive(Debug)]
pub struct Database<'a> {
    pub name: &'a str,
    pub labels: &'a Labels,
    pub entries: &'a [DatabaseEntry],
}

impl Database<'_> {
    pub fn primary_filename(&self) -> String {
        format!("{}.csv", self.name)
    }

    pub fn view_filename(&self, view: View) -> String {
        format!("{}_{}.csv", self.name, view.suffix())
    }

    pub fn stats(&self) -> DatabaseStats {
        let journals = self
            .entries
            .iter()
            .filter(|e| e.page_type == PageType::Journal)
            .count();
        DatabaseStats {
            name: self.name.to_string(),
            total_entries: self.entries.len(),
            journal_entries: journals,
            article_entries: self.entries.len() - journals,
        }
    }

    /// Write the primary table and every view into `dir`. Returns the
    /// written paths, primary first.
    pub fn write_all(&self, dir: &Path) -> Result<Vec<PathBuf>, TableError> {
        let mut written = Vec::with_capacity(1 + View::ALL.len());
        let all: Vec<&DatabaseEntry> = self.entries.iter().collect();
        written.push(self.write_table(&dir.join(self.primary_filename()), &all)?);
        for view in View::ALL {
            let rows = view.select(self.entries);
            written.push(self.write_table(&dir.join(self.view_filename(view)), &rows)?);
        }
        Ok(written)
    }

    fn write_table(&self, path: &Path, rows: &[&DatabaseEntry]) -> Result<PathBuf, TableError> {
        let mut writer = WriterBuilder::new().from_path(path)?;
        writer.write_record(self.labels.headers)?;
        for entry in rows {
            writer.write_record(entry.record(self.labels))?;
        }
        writer.flush()?;
        Ok(path.to_path_buf())
    }
}

/// Property block that opens each page in the database variant.
pub fn page_header(entry: &DatabaseEntry, labels: &Labels) -> String {
    let h = &labels.headers;
    let mut out = format!("# {}\n\n", entry.name);
    out.push_str(&format!("{}: {}\n", h[5], entry.created_by));
    if !entry.start_date.is_empty() {
        out.push_str(&format!("{}: {}\n", h[1], entry.start_date));
    }
    out.push_str(&format!("{}: {}\n", h[8], entry.status));
    out.push_str(&format!("{}: {}\n", h[2], entry.page_type.label(labels)));
    if !entry.summary.is_empty() {
        out.push_str(&format!("{}: {}\n", h[7], entry.summary));
    }
    out.push_str("\n---\n\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Registry, RegistryOptions};
    use crate::test_helpers::{find_record, journal, page};
    use std::fs;
    use tempfile::TempDir;

    fn defaults() -> RowDefaults {
        RowDefaults {
            created_by: "LogSeq import".into(),
            status: "Not started".into(),
            summary_length: 150,
        }
    }

    fn registry(locale: Locale) -> Registry {
        Registry::build(
            &[
                page("Project A", ""),
                page("2024_12_31", ""),
                journal("2025_01_01", ""),
                journal("scratch", ""),
            ],
            &RegistryOptions {
                with_ids: false,
                locale,
            },
        )
    }

    // =========================================================================
    // Classification
    // =========================================================================

    #[test]
    fn journal_collection_is_journal() {
        let reg = registry(Locale::Zh);
        let entry =
            DatabaseEntry::compose(find_record(&reg, "2025_01_01"), "", Locale::Zh, &defaults());
        assert_eq!(entry.page_type, PageType::Journal);
        assert_eq!(entry.name, "2025年01月01日");
        assert_eq!(entry.start_date, "01/01/2025");
        assert_eq!(entry.end_date, entry.start_date);
    }

    #[test]
    fn page_named_like_a_date_is_journal() {
        let reg = registry(Locale::En);
        let entry =
            DatabaseEntry::compose(find_record(&reg, "2024_12_31"), "", Locale::En, &defaults());
        assert_eq!(entry.page_type, PageType::Journal);
        assert_eq!(entry.start_date, "12/31/2024");
    }

    #[test]
    fn ordinary_page_is_article_without_dates() {
        let reg = registry(Locale::En);
        let entry =
            DatabaseEntry::compose(find_record(&reg, "Project A"), "", Locale::En, &defaults());
        assert_eq!(entry.page_type, PageType::Article);
        assert!(entry.start_date.is_empty());
        assert!(entry.end_date.is_empty());
    }

    #[test]
    fn undated_journal_has_empty_dates() {
        let reg = registry(Locale::En);
        let record = reg.get(Collection::Journal, "scratch").unwrap();
        let entry = DatabaseEntry::compose(record, "", Locale::En, &defaults());
        assert_eq!(entry.page_type, PageType::Journal);
        assert!(entry.start_date.is_empty());
    }

    #[test]
    fn record_follows_column_order() {
        let reg = registry(Locale::Zh);
        let entry = DatabaseEntry::compose(
            find_record(&reg, "2025_01_01"),
            "hello",
            Locale::Zh,
            &defaults(),
        );
        let cells = entry.record(Locale::Zh.labels());
        assert_eq!(cells[0], "2025年01月01日");
        assert_eq!(cells[2], "日志");
        assert_eq!(cells[5], "LogSeq import");
        assert_eq!(cells[7], "hello");
        assert_eq!(cells[8], "Not started");
        assert!(cells[9].is_empty());
    }

    // =========================================================================
    // Summary
    // =========================================================================

    #[test]
    fn summary_strips_markup() {
        let body = "# Title\n\nSome **bold** and [a link](x.md).\n\n![img](pic.png)\n\n```\ncode\n```\n\n`inline` end";
        assert_eq!(extract_summary(body, 150), "Title Some bold and a link. end");
    }

    #[test]
    fn summary_collapses_list_items() {
        let body = "- [ ] first\n- [x] second\n";
        assert_eq!(extract_summary(body, 150), "first second");
    }

    #[test]
    fn summary_truncates_by_characters() {
        let body = "字".repeat(200);
        let summary = extract_summary(&body, 150);
        assert_eq!(summary.chars().count(), 153);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn short_summary_not_truncated() {
        assert_eq!(extract_summary("short text", 150), "short text");
    }

    #[test]
    fn empty_body_empty_summary() {
        assert_eq!(extract_summary("", 150), "");
    }

    // =========================================================================
    // CSV output
    // =========================================================================

    #[test]
    fn writes_primary_and_six_views_with_identical_rows() {
        let tmp = TempDir::new().unwrap();
        let reg = registry(Locale::En);
        let entries: Vec<DatabaseEntry> = reg
            .iter()
            .map(|r| DatabaseEntry::compose(r, "body, with comma", Locale::En, &defaults()))
            .collect();
        let db = Database {
            name: "Team Database",
            labels: Locale::En.labels(),
            entries: &entries,
        };

        let written = db.write_all(tmp.path()).unwrap();
        assert_eq!(written.len(), 7);
        assert!(written[0].ends_with("Team Database.csv"));
        assert!(written[1].ends_with("Team Database_today.csv"));

        let primary = fs::read_to_string(&written[0]).unwrap();
        assert!(primary.starts_with(
            "Name,Start date,Page type,End date,Related members,Created by,Tags,Summary,Status,Progress\n"
        ));
        assert!(primary.contains("\"body, with comma\""));
        assert_eq!(primary.lines().count(), 1 + entries.len());
        for path in &written[1..] {
            assert_eq!(fs::read_to_string(path).unwrap(), primary);
        }
    }

    #[test]
    fn stats_count_page_types() {
        let reg = registry(Locale::En);
        let entries: Vec<DatabaseEntry> = reg
            .iter()
            .map(|r| DatabaseEntry::compose(r, "", Locale::En, &defaults()))
            .collect();
        let db = Database {
            name: "db",
            labels: Locale::En.labels(),
            entries: &entries,
        };
        let stats = db.stats();
        assert_eq!(stats.total_entries, 4);
        assert_eq!(stats.journal_entries, 3);
        assert_eq!(stats.article_entries, 1);
    }

    #[test]
    fn view_titles_follow_locale() {
        assert_eq!(View::Today.title(Locale::Zh.labels()), "今日聚合");
        assert_eq!(View::Wiki.title(Locale::En.labels()), "Wiki");
    }

    // =========================================================================
    // Page header
    // =========================================================================

    #[test]
    fn page_header_lists_properties() {
        let reg = registry(Locale::Zh);
        let entry = DatabaseEntry::compose(
            find_record(&reg, "2025_01_01"),
            "hello",
            Locale::Zh,
            &defaults(),
        );
        let header = page_header(&entry, Locale::Zh.labels());
        assert_eq!(
            header,
            "# 2025年01月01日\n\nCreated by: LogSeq import\n开始日期: 01/01/2025\n状态: Not started\n页面类型: 日志\n摘要: hello\n\n---\n\n"
        );
    }

    #[test]
    fn article_header_omits_empty_fields() {
        let reg = registry(Locale::En);
        let entry = DatabaseEntry::compose(find_record(&reg, "Project A"), "", Locale::En, &defaults());
        let header = page_header(&entry, Locale::En.labels());
        assert!(!header.contains("Start date"));
        assert!(!header.contains("Summary"));
        assert!(header.contains("Page type: Article"));
    }
}
