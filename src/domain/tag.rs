//! Case-insensitive tag type for labelling notes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A case-insensitive tag attached to a note.
///
/// Tags are normalized to lowercase, making `Work`, `work`, and `WORK`
/// equivalent. A note's tags form a set; the order they are serialized in
/// carries no meaning.
///
/// # Validation Rules
/// - Non-empty after trimming
/// - No whitespace and no commas (those separate tags in user input)
///
/// # Examples
///
/// ```
/// use notesync::domain::Tag;
///
/// let tag = Tag::new("Work").unwrap();
/// assert_eq!(tag.as_str(), "work");
/// assert!(tag.has_prefix("wo"));
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(String); // Always stored lowercase

/// Error returned when parsing an invalid tag.
#[derive(Debug, Clone)]
pub struct ParseTagError(String);

impl fmt::Display for ParseTagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseTagError {}

impl Tag {
    /// Creates a new Tag from a string.
    ///
    /// # Errors
    ///
    /// Returns `ParseTagError` if:
    /// - The tag is empty or whitespace-only
    /// - The tag contains whitespace or a comma
    pub fn new(s: &str) -> Result<Self, ParseTagError> {
        let normalized = s.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(ParseTagError("tag cannot be empty".to_string()));
        }

        if normalized.chars().any(|c| c.is_whitespace() || c == ',') {
            return Err(ParseTagError(format!(
                "invalid tag '{}': tags cannot contain whitespace or commas",
                normalized
            )));
        }

        Ok(Self(normalized))
    }

    /// Parses a user-supplied tag list separated by commas and/or whitespace.
    ///
    /// Empty fragments are skipped.
    pub fn parse_list(s: &str) -> Result<Vec<Self>, ParseTagError> {
        s.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(Self::new)
            .collect()
    }

    /// Returns the normalized tag value as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this tag starts with `prefix` (already lowercase).
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag(\"{}\")", self.0)
    }
}

impl FromStr for Tag {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Tag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
