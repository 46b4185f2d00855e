//! Landing page of the database variant.
//!
//! ```text
//! # <team name>
//!
//! <rewritten table-of-contents body>
//!
//! ---
//!
//! Import time: 2025-01-01 12:00:00
//!
//! ## Database
//!
//! [<db name>](<team>/<db>.csv)
//!
//! # Today
//!
//! [Today](<team>/<db>_today.csv)
//! ... one section per view ...
//!
//! ---
//!
//! ## Import statistics
//!
//! - Total entries: 3
//! - Journal: 1
//! - Article: 2
//! - Source: work-notes
//! ```

use crate::locale::Labels;
use crate::report::DatabaseStats;
use crate::table::{Database, View};
use crate::transform::encode_component;
use chrono::{DateTime, Local};
use std::fmt::Write;

/// Inputs of [`render`].
#[derive(Debug)]
pub struct Landing<'a> {
    pub team_name: &'a str,
    /// Directory next to the landing page that holds the tables.
    pub table_dir: &'a str,
    /// Rewritten body of the table-of-contents page, empty when absent.
    pub contents: &'a str,
    pub source_name: &'a str,
    pub import_time: DateTime<Local>,
}

pub fn render(landing: &Landing, database: &Database, labels: &Labels) -> String {
    let stats: DatabaseStats = database.stats();
    let dir = encode_component(landing.table_dir);
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", landing.team_name);
    let contents = landing.contents.trim();
    if !contents.is_empty() {
        let _ = writeln!(out, "{contents}\n");
    }
    let _ = writeln!(out, "---\n");
    let _ = writeln!(
        out,
        "{}: {}\n",
        labels.landing_import_time,
        landing.import_time.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out, "## {}\n", labels.landing_database);
    let _ = writeln!(
        out,
        "[{}]({dir}/{})\n",
        database.name,
        encode_component(&database.primary_filename())
    );
    for view in View::ALL {
        let title = view.title(labels);
        let _ = writeln!(out, "# {title}\n");
        let _ = writeln!(
            out,
            "[{title}]({dir}/{})\n",
            encode_component(&database.view_filename(view))
        );
    }
    let _ = writeln!(out, "---\n");
    let _ = writeln!(out, "## {}\n", labels.landing_stats);
    let _ = writeln!(out, "- {}: {}", labels.landing_total, stats.total_entries);
    let _ = writeln!(out, "- {}: {}", labels.journal_type, stats.journal_entries);
    let _ = writeln!(out, "- {}: {}", labels.article_type, stats.article_entries);
    let _ = writeln!(out, "- {}: {}", labels.landing_source, landing.source_name);
    out
}
