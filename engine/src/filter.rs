//! FILENAME: engine/src/filter.rs
//! Filter Engine - decides which rows (or tree nodes) match a text filter.
//!
//! A row matches when any filterable column's rendered text satisfies the
//! filter. Compilation never fails outward: a malformed pattern is reported
//! as an error message next to a pass-through filter, and the caller decides
//! where to store that message.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::column::{Column, ColumnType};
use crate::error::EngineError;
use crate::row::{Row, RowId};
use crate::value::format_number;
use crate::log_warn;

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid markup pattern"));

// ============================================================================
// FILTER SPEC
// ============================================================================

/// How the filter text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterMode {
    /// Case-folded substring containment.
    #[default]
    Plain,
    /// Substring containment without case folding.
    CaseSensitive,
    /// Case-insensitive regular expression search.
    Regex,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSpec {
    pub text: String,
    pub mode: FilterMode,
    /// Propagate matches along the hierarchy (tree mode).
    pub tree_aware: bool,
}

impl FilterSpec {
    pub fn new(text: impl Into<String>, mode: FilterMode) -> Self {
        FilterSpec {
            text: text.into(),
            mode,
            tree_aware: false,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        FilterSpec::new(text, FilterMode::Plain)
    }

    pub fn regex(text: impl Into<String>) -> Self {
        FilterSpec::new(text, FilterMode::Regex)
    }

    pub fn tree_aware(mut self, tree_aware: bool) -> Self {
        self.tree_aware = tree_aware;
        self
    }

    pub fn is_active(&self) -> bool {
        !self.text.is_empty()
    }
}

// ============================================================================
// MATCHER
// ============================================================================

/// A compiled, ready-to-run filter predicate.
#[derive(Debug, Clone)]
pub enum RowMatcher {
    Plain { needle: String },
    CaseSensitive { needle: String },
    Regex(Regex),
}

impl RowMatcher {
    /// Compiles a spec. An empty filter text yields `Ok(None)`.
    pub fn compile(spec: &FilterSpec) -> Result<Option<RowMatcher>, EngineError> {
        if !spec.is_active() {
            return Ok(None);
        }
        let matcher = match spec.mode {
            FilterMode::Plain => RowMatcher::Plain {
                needle: spec.text.to_lowercase(),
            },
            FilterMode::CaseSensitive => RowMatcher::CaseSensitive {
                needle: spec.text.clone(),
            },
            FilterMode::Regex => {
                let regex = RegexBuilder::new(&spec.text)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| EngineError::InvalidFilterPattern {
                        pattern: spec.text.clone(),
                        message: e.to_string(),
                    })?;
                RowMatcher::Regex(regex)
            }
        };
        Ok(Some(matcher))
    }

    pub fn matches_text(&self, text: &str) -> bool {
        match self {
            RowMatcher::Plain { needle } => text.to_lowercase().contains(needle.as_str()),
            RowMatcher::CaseSensitive { needle } => text.contains(needle.as_str()),
            RowMatcher::Regex(regex) => regex.is_match(text),
        }
    }

    /// True when any filterable column's rendered text matches.
    pub fn matches_row(&self, row: &Row, columns: &[Column]) -> bool {
        columns
            .iter()
            .filter(|c| c.filterable)
            .any(|c| self.matches_text(&cell_text(row, c)))
    }
}

/// Result of compiling a filter: the predicate to run plus the error message
/// the caller should record. Compilation itself never mutates anything.
#[derive(Debug, Clone, Default)]
pub struct CompiledFilter {
    pub matcher: Option<RowMatcher>,
    pub error: Option<String>,
    /// Copied from `FilterSpec::tree_aware`.
    pub tree_aware: bool,
}

impl CompiledFilter {
    pub fn compile(spec: &FilterSpec) -> Self {
        match RowMatcher::compile(spec) {
            Ok(matcher) => CompiledFilter {
                matcher,
                error: None,
                tree_aware: spec.tree_aware,
            },
            Err(err) => {
                log_warn!("FILTER", "{}; filter disabled", err);
                let message = match err {
                    EngineError::InvalidFilterPattern { message, .. } => message,
                    other => other.to_string(),
                };
                CompiledFilter {
                    matcher: None,
                    error: Some(message),
                    tree_aware: spec.tree_aware,
                }
            }
        }
    }

    /// A filter that lets everything through.
    pub fn pass_through() -> Self {
        CompiledFilter::default()
    }

    pub fn is_active(&self) -> bool {
        self.matcher.is_some()
    }

    pub fn matches(&self, row: &Row, columns: &[Column]) -> bool {
        self.matcher
            .as_ref()
            .map_or(true, |m| m.matches_row(row, columns))
    }
}

// ============================================================================
// RENDERED TEXT
// ============================================================================

/// The text a filter sees for one cell.
pub fn cell_text(row: &Row, column: &Column) -> String {
    let value = row.get(&column.key);

    if let Some(render) = &column.render {
        return markup_text(&(render.0)(value, row));
    }

    match &column.column_type {
        ColumnType::Number => value.to_number().map(format_number).unwrap_or_default(),
        ColumnType::Html => markup_text(&value.to_text()),
        ColumnType::Link { text } => {
            let url = value.to_text();
            let label = text.clone().unwrap_or_else(|| url.clone());
            format!("{} {}", label, url)
        }
        ColumnType::Button { text } => text.clone().unwrap_or_else(|| "Action".to_string()),
        ColumnType::Text | ColumnType::Image | ColumnType::Custom(_) => value.to_text(),
    }
}

/// Removes markup tags, leaving the raw text (entities untouched).
pub fn strip_markup(s: &str) -> String {
    MARKUP_TAG.replace_all(s, "").into_owned()
}

/// Text content of a markup fragment: tags removed, common entities decoded, trimmed.
pub fn markup_text(s: &str) -> String {
    let stripped = strip_markup(s);
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    decoded.trim().to_string()
}

// ============================================================================
// FLAT AND TREE FILTERING
// ============================================================================

/// Keeps the rows that match, preserving order.
pub fn filter_rows<'a>(rows: &[&'a Row], columns: &[Column], filter: &CompiledFilter) -> Vec<&'a Row> {
    if !filter.is_active() {
        return rows.to_vec();
    }
    rows.iter()
        .copied()
        .filter(|row| filter.matches(row, columns))
        .collect()
}

/// Ids of the tree nodes visible under an active filter. A tree-aware filter
/// keeps every node that matches or has a matching descendant, so ancestors
/// of a match are always included. Otherwise only matching nodes are kept and
/// a match below a non-matching parent stays hidden. Rows without an id are
/// never reported.
pub fn tree_visibility(
    roots: &[Row],
    columns: &[Column],
    filter: &CompiledFilter,
    children_field: &str,
) -> FxHashSet<RowId> {
    let mut visible = FxHashSet::default();
    for root in roots {
        mark_visible(root, columns, filter, children_field, &mut visible);
    }
    visible
}

fn mark_visible(
    node: &Row,
    columns: &[Column],
    filter: &CompiledFilter,
    children_field: &str,
    visible: &mut FxHashSet<RowId>,
) -> bool {
    let mut ok = filter.matches(node, columns);
    if let Some(children) = node.children(children_field) {
        for child in children {
            if mark_visible(child, columns, filter, children_field, visible) && filter.tree_aware {
                ok = true;
            }
        }
    }
    if ok {
        if let Some(id) = node.id {
            visible.insert(id);
        }
    }
    ok
}
