//! Filtering the store into sorted views: token queries and regex queries.

use crate::domain::{Note, NoteKey, SortOrder};
use crate::store::NoteMap;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// How a query string is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// `tag:` filters, quoted phrases, and bare words, all required.
    #[default]
    Token,
    /// The query is a regular expression.
    Pattern,
}

/// Options controlling [`filter_notes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOptions {
    pub mode: SearchMode,
    pub case_sensitive: bool,
    /// In pattern mode, also match the expression against tags.
    pub search_tags: bool,
    pub order: SortOrder,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            case_sensitive: false,
            search_tags: true,
            order: SortOrder::default(),
        }
    }
}

/// One note in a filtered view.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredNote {
    pub key: NoteKey,
    pub note: Note,
    /// The note matched through one of its tags rather than its content.
    pub tag_match: bool,
}

/// The outcome of [`filter_notes`].
#[derive(Debug, Clone)]
pub struct FilterResult {
    pub notes: Vec<FilteredNote>,
    /// Pattern for highlighting matches in displayed content.
    pub highlight: Option<Regex>,
    /// Number of non-deleted notes scanned, matching or not.
    pub active_count: usize,
}

/// Filters and sorts the store's notes for display.
///
/// Deleted notes never appear in results.
pub fn filter_notes(notes: &NoteMap, query: &str, options: &FilterOptions) -> FilterResult {
    let mut result = match options.mode {
        SearchMode::Token => filter_by_tokens(notes, query, options.case_sensitive),
        SearchMode::Pattern => {
            filter_by_pattern(notes, query, options.case_sensitive, options.search_tags)
        }
    };
    result.notes.sort_by(|a, b| {
        options
            .order
            .compare(&a.note, &b.note)
            .then_with(|| a.key.cmp(&b.key))
    });
    result
}

/// A token query split into its parts.
#[derive(Debug, Default, PartialEq, Eq)]
struct TokenQuery {
    tags: Vec<String>,
    words: Vec<String>,
}

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"tag:\S+|"[^"]+"|\S+"#).expect("token regex is valid"));

fn parse_tokens(query: &str) -> TokenQuery {
    let mut parsed = TokenQuery::default();
    for m in TOKEN.find_iter(query) {
        let token = m.as_str();
        if let Some(tag) = token.strip_prefix("tag:") {
            parsed.tags.push(tag.to_lowercase());
        } else if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
            parsed.words.push(token[1..token.len() - 1].to_string());
        } else {
            parsed.words.push(token.to_string());
        }
    }
    parsed
}

fn filter_by_tokens(notes: &NoteMap, query: &str, case_sensitive: bool) -> FilterResult {
    let parsed = parse_tokens(query);
    let words: Vec<String> = if case_sensitive {
        parsed.words.clone()
    } else {
        parsed.words.iter().map(|w| w.to_lowercase()).collect()
    };

    let mut matches = Vec::new();
    let mut active_count = 0;

    for (key, note) in notes {
        if note.deleted {
            continue;
        }
        active_count += 1;

        let tags_ok = parsed
            .tags
            .iter()
            .all(|prefix| note.tags.iter().any(|t| t.has_prefix(prefix)));
        if !tags_ok {
            continue;
        }

        let content = if case_sensitive {
            note.content.clone()
        } else {
            note.content.to_lowercase()
        };
        if words.iter().all(|w| content.contains(w.as_str())) {
            matches.push(FilteredNote {
                key: key.clone(),
                note: note.clone(),
                tag_match: false,
            });
        }
    }

    FilterResult {
        notes: matches,
        highlight: highlight_for(&parsed.words, case_sensitive),
        active_count,
    }
}

/// Alternation of the literal words; `None` when there are none or the
/// pattern cannot be built.
fn highlight_for(words: &[String], case_sensitive: bool) -> Option<Regex> {
    if words.is_empty() {
        return None;
    }
    let pattern = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .ok()
}

fn filter_by_pattern(
    notes: &NoteMap,
    query: &str,
    case_sensitive: bool,
    search_tags: bool,
) -> FilterResult {
    // A malformed expression filters nothing out.
    let pattern = if query.is_empty() {
        None
    } else {
        RegexBuilder::new(query)
            .case_insensitive(!case_sensitive)
            .multi_line(true)
            .build()
            .map_err(|e| log::debug!("ignoring invalid search pattern {:?}: {}", query, e))
            .ok()
    };

    let mut matches = Vec::new();
    let mut active_count = 0;

    for (key, note) in notes {
        if note.deleted {
            continue;
        }
        active_count += 1;

        let tag_match = match &pattern {
            Some(re) if search_tags => note.tags.iter().any(|t| re.is_match(t.as_str())),
            _ => false,
        };
        let included = match &pattern {
            None => true,
            Some(re) => tag_match || re.is_match(&note.content),
        };
        if included {
            matches.push(FilteredNote {
                key: key.clone(),
                note: note.clone(),
                tag_match,
            });
        }
    }

    FilterResult {
        notes: matches,
        highlight: pattern,
        active_count,
    }
}
