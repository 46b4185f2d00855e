//! Content rewriting: Phase 2 of the conversion.
//!
//! A document body is rewritten by six targeted substitutions. There is no
//! markdown parse; each stage matches one inline syntax and leaves
//! everything else byte-for-byte intact.
//!
//! ## Stage order
//!
//! ```text
//! 1. ResolveLinks         [[Page]]            → [Page](Page.md)
//! 2. FlattenAssets        ![a](../assets/x/y.png) → ![a](y.png)
//! 3. NormalizeTasks       - DONE x / - TODO x  → - [x] x / - [ ] x
//! 4. NormalizeProperties  key:: value          → **key**: value
//! 5. CollapseBlockRefs    ((64f0…))            → > [Referenced block]
//! 6. StripQueries         {{query …}}          → <!-- … removed -->
//! ```
//!
//! The order is part of the contract: `{{embed [[Page]]}}` has its link
//! resolved before the query stage removes the whole braces block, and the
//! link produced by stage 1 is never seen as an asset by stage 2 because it
//! has no `assets/` segment.
//!
//! ## Idempotence
//!
//! No stage emits text that any stage matches, so running the pipeline over
//! its own output changes nothing. The tests check this per stage and for
//! the whole pipeline.
//!
//! ## Unresolved links
//!
//! A `[[name]]` with no registry entry becomes an anchor-style placeholder
//! `[name](#name)` and the name is returned in [`Rewritten::unresolved`].
//! The transformer itself stays pure; the caller decides how to log.

use crate::locale::Labels;
use crate::registry::Registry;
use crate::types::Collection;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Everything except RFC 3986 unreserved characters is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[([^\]]+)\]\]").unwrap());
static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").unwrap());
static TASK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([ \t]*)-[ \t]+(DONE|TODO|LATER|NOW)(?:[ \t]+|(\r?)$)").unwrap()
});
static PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([ \t]*)([A-Za-z][A-Za-z0-9_-]*)::[ \t]*(.*)$").unwrap()
});
static BLOCK_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\(([0-9a-fA-F]+(?:-[0-9a-fA-F]+)*)\)\)").unwrap());
static QUERY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{[^}]+\}\}").unwrap());

/// Percent-encode a single path component.
pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

/// One rewrite step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolveLinks,
    FlattenAssets,
    NormalizeTasks,
    NormalizeProperties,
    CollapseBlockRefs,
    StripQueries,
}

impl Stage {
    /// All stages in application order.
    pub const PIPELINE: [Stage; 6] = [
        Stage::ResolveLinks,
        Stage::FlattenAssets,
        Stage::NormalizeTasks,
        Stage::NormalizeProperties,
        Stage::CollapseBlockRefs,
        Stage::StripQueries,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::ResolveLinks => "resolve-links",
            Stage::FlattenAssets => "flatten-assets",
            Stage::NormalizeTasks => "normalize-tasks",
            Stage::NormalizeProperties => "normalize-properties",
            Stage::CollapseBlockRefs => "collapse-block-refs",
            Stage::StripQueries => "strip-queries",
        }
    }
}

/// Result of rewriting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub text: String,
    /// Cross-reference names with no registry entry, in order of occurrence.
    pub unresolved: Vec<String>,
}

/// Rewrites bodies against a frozen registry.
#[derive(Debug, Clone)]
pub struct Transformer<'a> {
    registry: &'a Registry,
    labels: &'a Labels,
    link_prefix: String,
    /// Records whose document is not written as a page, with the target
    /// their links point at instead.
    redirects: BTreeMap<(Collection, String), String>,
}

impl<'a> Transformer<'a> {
    pub fn new(registry: &'a Registry, labels: &'a Labels) -> Self {
        Self {
            registry,
            labels,
            link_prefix: String::new(),
            redirects: BTreeMap::new(),
        }
    }

    /// Point links to the record `(collection, key)` at `target` instead
    /// of its output file. `target` is used verbatim, without the link
    /// prefix.
    pub fn with_redirect(mut self, collection: Collection, key: &str, target: &str) -> Self {
        self.redirects
            .insert((collection, key.to_string()), target.to_string());
        self
    }

    /// Prefix resolved link targets with a relative directory path, for
    /// documents written outside the directory that holds the pages.
    ///
    /// Segments are percent-encoded individually; `/` separators are kept.
    pub fn with_link_prefix(mut self, dir: &str) -> Self {
        self.link_prefix = dir
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| format!("{}/", encode_component(s)))
            .collect();
        self
    }

    /// Run every stage in order.
    pub fn rewrite(&self, raw: &str) -> Rewritten {
        let mut text = raw.to_string();
        let mut unresolved = Vec::new();
        for stage in Stage::PIPELINE {
            text = self.apply(stage, &text, &mut unresolved).into_owned();
        }
        Rewritten { text, unresolved }
    }

    /// Run one stage. Misses from [`Stage::ResolveLinks`] are appended to
    /// `unresolved`.
    pub fn apply<'t>(
        &self,
        stage: Stage,
        text: &'t str,
        unresolved: &mut Vec<String>,
    ) -> Cow<'t, str> {
        match stage {
            Stage::ResolveLinks => self.resolve(text, unresolved),
            Stage::FlattenAssets => flatten_assets(text),
            Stage::NormalizeTasks => normalize_tasks(text),
            Stage::NormalizeProperties => normalize_properties(text),
            Stage::CollapseBlockRefs => {
                collapse_block_refs(text, self.labels.block_ref_placeholder)
            }
            Stage::StripQueries => strip_queries(text, self.labels.query_placeholder),
        }
    }

    fn resolve<'t>(&self, text: &'t str, unresolved: &mut Vec<String>) -> Cow<'t, str> {
        if self.redirects.is_empty() {
            return resolve_links(text, self.registry, &self.link_prefix, unresolved);
        }
        LINK.replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let redirect = self.registry.resolve(name).and_then(|record| {
                self.redirects
                    .get(&(record.collection, record.key.clone()))
            });
            match redirect {
                Some(target) => format!("[{name}]({target})"),
                None => link_to(name, self.registry, &self.link_prefix, unresolved),
            }
        })
    }
}

/// Stage 1: replace `[[name]]` with a link to the resolved output file.
pub fn resolve_links<'t>(
    text: &'t str,
    registry: &Registry,
    prefix: &str,
    unresolved: &mut Vec<String>,
) -> Cow<'t, str> {
    LINK.replace_all(text, |caps: &Captures| {
        link_to(&caps[1], registry, prefix, unresolved)
    })
}

fn link_to(name: &str, registry: &Registry, prefix: &str, unresolved: &mut Vec<String>) -> String {
    match registry.resolve(name) {
        Some(record) => format!("[{name}]({prefix}{})", encode_component(&record.filename)),
        None => {
            unresolved.push(name.to_string());
            format!("[{name}](#{})", encode_component(name))
        }
    }
}

/// Stage 2: point asset images at their flattened basename.
pub fn flatten_assets(text: &str) -> Cow<'_, str> {
    IMAGE.replace_all(text, |caps: &Captures| {
        let alt = &caps[1];
        let path = &caps[2];
        if path.contains("assets/") {
            let basename = path.rsplit('/').next().unwrap_or(path);
            format!("![{alt}]({})", encode_component(basename))
        } else {
            caps[0].to_string()
        }
    })
}

/// Stage 3: two-state checkboxes from the four task keywords.
pub fn normalize_tasks(text: &str) -> Cow<'_, str> {
    TASK.replace_all(text, |caps: &Captures| {
        let mark = if &caps[2] == "DONE" { 'x' } else { ' ' };
        // A bare keyword keeps its line's carriage return.
        let cr = caps.get(3).map_or("", |m| m.as_str());
        format!("{}- [{mark}] {cr}", &caps[1])
    })
}

/// Stage 4: `key:: value` property lines become `**key**: value`.
pub fn normalize_properties(text: &str) -> Cow<'_, str> {
    PROPERTY.replace_all(text, "${1}**${2}**: ${3}")
}

/// Stage 5: block references collapse to a fixed placeholder.
///
/// The referenced content is not inlined.
pub fn collapse_block_refs<'t>(text: &'t str, placeholder: &str) -> Cow<'t, str> {
    BLOCK_REF.replace_all(text, regex::NoExpand(placeholder))
}

/// Stage 6: `{{...}}` blocks become a comment; nothing is evaluated.
pub fn strip_queries<'t>(text: &'t str, placeholder: &str) -> Cow<'t, str> {
    QUERY.replace_all(text, regex::NoExpand(placeholder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Locale;
    use crate::registry::RegistryOptions;
    use crate::test_helpers::{journal, page};

    fn registry() -> Registry {
        Registry::build(
            &[
                page("Project A", ""),
                page("Project B", ""),
                page("Q&A: notes?", ""),
                journal("2025_01_01", ""),
            ],
            &RegistryOptions::default(),
        )
    }

    fn labels() -> &'static Labels {
        Locale::En.labels()
    }

    fn rewrite(text: &str) -> Rewritten {
        let reg = registry();
        Transformer::new(&reg, labels()).rewrite(text)
    }

    const SAMPLE: &str = "\
title:: Weekly
- TODO call [[Project B]] about ((64f1a2b3-0c4d-4e5f-8a9b-0123456789ab))
  - DONE sent ![chart](../assets/2025/chart one.png)
	- LATER read [[Missing Page]]
- NOW {{query (todo now)}}
- {{embed [[Project A]]}}
![remote](https://example.com/a.png)
";

    #[test]
    fn link_resolves_to_encoded_filename() {
        let out = rewrite("See [[Project B]]");
        assert_eq!(out.text, "See [Project B](Project%20B.md)");
        assert!(out.unresolved.is_empty());
    }

    #[test]
    fn link_to_journal_key_uses_localized_filename() {
        let out = rewrite("[[2025_01_01]]");
        assert_eq!(
            out.text,
            format!("[2025_01_01]({})", encode_component("2025年01月01日.md"))
        );
    }

    #[test]
    fn link_to_sanitized_name_keeps_visible_text() {
        let out = rewrite("[[Q&A: notes?]]");
        assert_eq!(out.text, "[Q&A: notes?](Q%26A_%20notes_.md)");
    }

    #[test]
    fn unresolved_link_degrades_to_anchor() {
        let out = rewrite("x [[Nowhere Land]] y");
        assert_eq!(out.text, "x [Nowhere Land](#Nowhere%20Land) y");
        assert_eq!(out.unresolved, vec!["Nowhere Land".to_string()]);
    }

    #[test]
    fn each_miss_is_reported_once_per_occurrence() {
        let out = rewrite("[[Gone]] and [[Gone]] and [[Project A]]");
        assert_eq!(out.unresolved, vec!["Gone", "Gone"]);
    }

    #[test]
    fn link_prefix_applied_to_resolved_links_only() {
        let reg = registry();
        let t = Transformer::new(&reg, labels()).with_link_prefix("Team A/Team A DB");
        let out = t.rewrite("[[Project A]] [[Nope]]");
        assert_eq!(
            out.text,
            "[Project A](Team%20A/Team%20A%20DB/Project%20A.md) [Nope](#Nope)"
        );
    }

    #[test]
    fn redirected_record_links_to_target_verbatim() {
        let reg = registry();
        let t = Transformer::new(&reg, labels())
            .with_link_prefix("Team/db")
            .with_redirect(Collection::Page, "Project A", "../../Team.md");
        let out = t.rewrite("[[Project A]] [[project a]] [[Project B]] [[Nope]]");
        assert_eq!(
            out.text,
            "[Project A](../../Team.md) [project a](../../Team.md) \
             [Project B](Team/db/Project%20B.md) [Nope](#Nope)"
        );
        assert_eq!(out.unresolved, vec!["Nope"]);
    }

    #[test]
    fn text_without_links_is_untouched_by_link_stage() {
        let reg = registry();
        let mut misses = Vec::new();
        let text = "plain [single] brackets and (parens) and ![img](x.png)";
        let out = resolve_links(text, &reg, "", &mut misses);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, text);
        assert!(misses.is_empty());
    }

    #[test]
    fn asset_image_flattened_to_basename() {
        assert_eq!(
            flatten_assets("![chart](../assets/2025/chart one.png)"),
            "![chart](chart%20one.png)"
        );
        assert_eq!(flatten_assets("![](assets/x.jpg)"), "![](x.jpg)");
    }

    #[test]
    fn non_asset_image_unchanged() {
        let text = "![remote](https://example.com/a.png) ![local](img/b.png)";
        assert_eq!(flatten_assets(text), text);
    }

    #[test]
    fn task_keywords_become_checkboxes() {
        let text = "- DONE a\n- TODO b\n  - LATER c\n\t- NOW d\n- DOING e";
        assert_eq!(
            normalize_tasks(text),
            "- [x] a\n- [ ] b\n  - [ ] c\n\t- [ ] d\n- DOING e"
        );
    }

    #[test]
    fn task_keyword_at_end_of_line_does_not_eat_next_line() {
        assert_eq!(normalize_tasks("- TODO\nnext"), "- [ ] \nnext");
        assert_eq!(normalize_tasks("- DONE\r\nnext"), "- [x] \r\nnext");
        assert_eq!(
            normalize_tasks("- TODO a\r\n  - NOW\r\n- LATER"),
            "- [ ] a\r\n  - [ ] \r\n- [ ] "
        );
    }

    #[test]
    fn crlf_task_lines_are_idempotent() {
        let once = normalize_tasks("- DONE\r\n- TODO x\r\n").into_owned();
        assert_eq!(normalize_tasks(&once), once);
    }

    #[test]
    fn task_keyword_mid_line_unchanged() {
        let text = "talk about TODO lists - TODO later";
        assert_eq!(normalize_tasks(text), text);
    }

    #[test]
    fn property_lines_emphasized() {
        assert_eq!(normalize_properties("tags:: a, b"), "**tags**: a, b");
        assert_eq!(normalize_properties("  id:: 1234"), "  **id**: 1234");
    }

    #[test]
    fn property_with_empty_value_stays_on_its_line() {
        assert_eq!(normalize_properties("alias::\nbody"), "**alias**: \nbody");
    }

    #[test]
    fn non_property_double_colon_unchanged() {
        let text = "- see std::fs for details";
        assert_eq!(normalize_properties(text), text);
    }

    #[test]
    fn block_ref_collapsed() {
        assert_eq!(
            collapse_block_refs("see ((64f1a2b3-0c4d-4e5f-8a9b-0123456789ab))", "> [ref]"),
            "see > [ref]"
        );
    }

    #[test]
    fn non_hex_double_parens_unchanged() {
        let text = "((not a ref)) and ((xyz))";
        assert_eq!(collapse_block_refs(text, "> [ref]"), text);
    }

    #[test]
    fn placeholders_are_not_expanded() {
        assert_eq!(collapse_block_refs("((abc))", "$1 cost"), "$1 cost");
        assert_eq!(strip_queries("{{x}}", "$0"), "$0");
    }

    #[test]
    fn queries_stripped() {
        assert_eq!(
            strip_queries("- {{query (todo now)}} end", "<!-- q -->"),
            "- <!-- q --> end"
        );
    }

    #[test]
    fn full_pipeline_on_sample() {
        let out = rewrite(SAMPLE);
        let expected = "\
**title**: Weekly
- [ ] call [Project B](Project%20B.md) about > [Referenced block]
  - [x] sent ![chart](chart%20one.png)
	- [ ] read [Missing Page](#Missing%20Page)
- [ ] <!-- LogSeq query removed -->
- <!-- LogSeq query removed -->
![remote](https://example.com/a.png)
";
        assert_eq!(out.text, expected);
        assert_eq!(out.unresolved, vec!["Missing Page"]);
    }

    #[test]
    fn embed_link_resolved_before_query_stripped() {
        let reg = registry();
        let t = Transformer::new(&reg, labels());
        let mut misses = Vec::new();
        let after_links = t.apply(Stage::ResolveLinks, "{{embed [[Gone]]}}", &mut misses);
        assert_eq!(after_links, "{{embed [Gone](#Gone)}}");
        assert_eq!(misses, vec!["Gone"]);
    }

    #[test]
    fn pipeline_is_idempotent() {
        let once = rewrite(SAMPLE).text;
        let twice = rewrite(&once);
        assert_eq!(twice.text, once);
        assert!(twice.unresolved.is_empty());
    }

    #[test]
    fn each_stage_is_idempotent() {
        let reg = registry();
        let t = Transformer::new(&reg, labels());
        for stage in Stage::PIPELINE {
            let mut misses = Vec::new();
            let once = t.apply(stage, SAMPLE, &mut misses).into_owned();
            let twice = t.apply(stage, &once, &mut misses).into_owned();
            assert_eq!(twice, once, "stage {}", stage.name());
        }
    }

    #[test]
    fn pipeline_is_identity_on_plain_markdown() {
        let text = "# Heading\n\nSome *text* with a [link](https://x.y) and `code`.\n";
        assert_eq!(rewrite(text).text, text);
    }

    #[test]
    fn encode_component_keeps_unreserved() {
        assert_eq!(encode_component("a-b_c.d~e"), "a-b_c.d~e");
        assert_eq!(encode_component("a b/c"), "a%20b%2Fc");
        assert_eq!(encode_component("日"), "%E6%97%A5");
    }
}
