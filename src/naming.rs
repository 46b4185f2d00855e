//! Centralized filename rules for source keys and output names.
//!
//! Every document in an export is identified by its filename stem (the
//! *logical key*). Output files are named after a display name that has been
//! made safe for every filesystem the import target may unpack into. This
//! module owns both directions:
//!
//! - [`parse_journal_key`] recognizes the strict `YYYY_MM_DD` journal key
//!   (also `YYYY-MM-DD`) and keeps the three components as written.
//! - [`sanitize_filename`] replaces path-hostile characters and trims the
//!   leading/trailing dots and spaces that some platforms reject.
//! - [`output_filename`] composes `<sanitized>[ <id>].md`.
//!
//! ## Examples
//!
//! ```text
//! 2025_01_01          → JournalDate { year: "2025", month: "01", day: "01" }
//! 2025_1_1            → None (strict two-digit month/day)
//! "a/b: c?"           → "a_b_ c_"
//! " .hidden. "        → "hidden"
//! ("Project A", None) → "Project A.md"
//! ```

/// Characters that are never allowed in an output filename.
const HOSTILE: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Fallback stem for names that sanitize to nothing.
pub const UNTITLED: &str = "Untitled";

/// Extension of every emitted document.
pub const MARKDOWN_EXT: &str = "md";

/// A journal key split into its numeric components.
///
/// Components are kept as the original digit strings so that a display name
/// always shows exactly the values found in the key (`01`, not `1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalDate {
    pub year: String,
    pub month: String,
    pub day: String,
}

impl JournalDate {
    /// Month/day/year form used by the import target's date columns.
    pub fn to_us_date(&self) -> String {
        format!("{}/{}/{}", self.month, self.day, self.year)
    }
}

/// Parse a strict numeric journal key: four digits, separator, two digits,
/// separator, two digits. The separator is `_` or `-` and must be the same
/// in both positions.
///
/// The calendar is not validated: `2025_13_45` still parses, and the display
/// name carries the same numbers.
pub fn parse_journal_key(key: &str) -> Option<JournalDate> {
    let bytes = key.as_bytes();
    if bytes.len() != 10 {
        return None;
    }
    let sep = bytes[4];
    if (sep != b'_' && sep != b'-') || bytes[7] != sep {
        return None;
    }
    let digits = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);
    if !(digits(0..4) && digits(5..7) && digits(8..10)) {
        return None;
    }
    Some(JournalDate {
        year: key[0..4].to_string(),
        month: key[5..7].to_string(),
        day: key[8..10].to_string(),
    })
}

/// Make a display name safe for use as a filename stem.
///
/// Path-hostile and control characters become `_`; leading and trailing
/// dots and spaces are stripped. Names that end up empty become
/// [`UNTITLED`].
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if HOSTILE.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = replaced.trim_matches(|c| c == '.' || c == ' ');
    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Compose the output filename for a display name and optional identifier.
pub fn output_filename(display_name: &str, id: Option<&str>) -> String {
    let stem = sanitize_filename(display_name);
    match id {
        Some(id) => format!("{stem} {id}.{MARKDOWN_EXT}"),
        None => format!("{stem}.{MARKDOWN_EXT}"),
    }
}

/// True if `stem` satisfies the output naming invariant.
pub fn is_sanitized(stem: &str) -> bool {
    !stem.is_empty()
        && !stem.chars().any(|c| HOSTILE.contains(&c) || c.is_control())
        && !stem.starts_with(['.', ' '])
        && !stem.ends_with(['.', ' '])
}
