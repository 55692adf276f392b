//! Note ordering: pinned-first plus alpha, alphanumeric, or date order.

use crate::domain::Note;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How filtered results are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Case-folded title.
    Alpha,
    /// Title split into digit/letter/other runs, digits compared numerically.
    Alphanum,
    /// Most recently modified first.
    #[default]
    Modified,
    /// Most recently created first.
    Created,
}

/// A caller-supplied ordering for filter results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub mode: SortMode,
    pub pinned_first: bool,
}

impl SortOrder {
    pub fn new(mode: SortMode, pinned_first: bool) -> Self {
        Self { mode, pinned_first }
    }

    /// Compares two notes under this order.
    pub fn compare(&self, a: &Note, b: &Note) -> Ordering {
        let pinned = if self.pinned_first {
            b.is_pinned().cmp(&a.is_pinned())
        } else {
            Ordering::Equal
        };
        pinned.then_with(|| match self.mode {
            SortMode::Alpha => a.title().to_lowercase().cmp(&b.title().to_lowercase()),
            SortMode::Alphanum => AlphanumKey::new(a.title()).cmp(&AlphanumKey::new(b.title())),
            SortMode::Modified => b.modifydate.total_cmp(&a.modifydate),
            SortMode::Created => b.createdate.total_cmp(&a.createdate),
        })
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::new(SortMode::default(), true)
    }
}

/// One run of a title split for alphanumeric comparison.
///
/// Variant order decides comparisons between runs of different kinds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Run {
    Digits(Number),
    Letters(String),
    Other(String),
}

/// A digit run compared by numeric value, of any length.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Number(String); // leading zeros stripped

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort key for natural ("alphanumeric") title ordering.
///
/// A title is split into alternating runs of digits, letters, and anything
/// else. Keys compare run by run; a missing run sorts below any present one,
/// which is exactly how `Vec`'s lexicographic `Ord` treats a shorter prefix.
///
/// # Examples
///
/// ```
/// use notesync::domain::AlphanumKey;
///
/// assert!(AlphanumKey::new("note 2") < AlphanumKey::new("note 10"));
/// assert!(AlphanumKey::new("note") < AlphanumKey::new("note 1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AlphanumKey(Vec<Run>);

#[derive(Clone, Copy, PartialEq, Eq)]
enum RunKind {
    Digit,
    Letter,
    Other,
}

fn kind_of(c: char) -> RunKind {
    if c.is_ascii_digit() {
        RunKind::Digit
    } else if c.is_alphabetic() {
        RunKind::Letter
    } else {
        RunKind::Other
    }
}

impl AlphanumKey {
    pub fn new(title: &str) -> Self {
        let folded = title.to_lowercase();
        let mut runs = Vec::new();
        let mut current = String::new();
        let mut current_kind = None;

        for c in folded.chars() {
            let kind = kind_of(c);
            if current_kind.is_some_and(|k| k != kind) {
                runs.push(make_run(current_kind, std::mem::take(&mut current)));
            }
            current_kind = Some(kind);
            current.push(c);
        }
        if !current.is_empty() {
            runs.push(make_run(current_kind, current));
        }

        Self(runs)
    }
}

fn make_run(kind: Option<RunKind>, text: String) -> Run {
    match kind {
        Some(RunKind::Digit) => {
            let trimmed = text.trim_start_matches('0');
            Run::Digits(Number(trimmed.to_string()))
        }
        Some(RunKind::Letter) => Run::Letters(text),
        _ => Run::Other(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(s: &str) -> AlphanumKey {
        AlphanumKey::new(s)
    }

    fn note(content: &str, modifydate: f64) -> Note {
        Note::new(content, modifydate)
    }

    // ===========================================
    // Alphanumeric key
    // ===========================================

    #[test]
    fn digits_compare_numerically() {
        assert!(key("item 9") < key("item 10"));
        assert!(key("2") < key("10"));
        assert!(key("007") == key("7"));
    }

    #[test]
    fn huge_numbers_do_not_overflow() {
        assert!(key("99999999999999999999999999") < key("100000000000000000000000000"));
    }

    #[test]
    fn letters_compare_lexicographically() {
        assert!(key("apple") < key("banana"));
        assert!(key("Apple") == key("apple"));
    }

    #[test]
    fn absent_run_sorts_lowest() {
        assert!(key("chapter") < key("chapter 1"));
        assert!(key("") < key("a"));
        assert!(key("v1") < key("v1.2"));
    }

    #[test]
    fn other_runs_compare_lexicographically() {
        assert!(key("a-1") < key("a_1"));
    }

    #[test]
    fn sorting_titles_naturally() {
        let mut titles = vec!["file10", "file2", "file1", "file", "File 3"];
        titles.sort_by_key(|t| key(t));
        // Digit runs sort below punctuation runs at the same position.
        assert_eq!(titles, vec!["file", "file1", "file2", "file10", "File 3"]);
    }

    // ===========================================
    // Sort order
    // ===========================================

    #[test]
    fn pinned_notes_come_first() {
        let mut pinned = note("zzz", 1.0);
        pinned.set_pinned(true);
        let plain = note("aaa", 2.0);

        let order = SortOrder::new(SortMode::Alpha, true);
        assert_eq!(order.compare(&pinned, &plain), Ordering::Less);

        let order = SortOrder::new(SortMode::Alpha, false);
        assert_eq!(order.compare(&pinned, &plain), Ordering::Greater);
    }

    #[test]
    fn modified_mode_is_newest_first() {
        let order = SortOrder::new(SortMode::Modified, false);
        assert_eq!(
            order.compare(&note("a", 5.0), &note("b", 1.0)),
            Ordering::Less
        );
    }

    #[test]
    fn sort_mode_parses_from_lowercase() {
        let mode: SortMode = serde_json::from_str("\"alphanum\"").unwrap();
        assert_eq!(mode, SortMode::Alphanum);
    }
}
