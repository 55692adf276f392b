//! Store key for notes: a local ULID token, or the remote key once known.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Identifier a note is stored under.
///
/// Freshly created notes get a locally generated ULID. Once the remote
/// service accepts a note, its remote key replaces the local one and stays
/// the note's key for good.
///
/// # Examples
///
/// ```
/// use notesync::domain::NoteKey;
///
/// let key = NoteKey::generate();
/// assert_eq!(key.as_str().len(), 26);
///
/// let remote: NoteKey = "agtzaW1wbGUtbm90ZXIQ".parse().unwrap();
/// assert_eq!(remote.as_str(), "agtzaW1wbGUtbm90ZXIQ");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteKey(String);

impl NoteKey {
    /// Generates a new local key.
    ///
    /// Uniqueness against an existing key set is checked by the store, which
    /// regenerates on collision.
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for NoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NoteKey(\"{}\")", self.0)
    }
}

impl Borrow<str> for NoteKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Error returned when parsing an invalid key.
#[derive(Debug, Clone)]
pub struct ParseNoteKeyError {
    value: String,
}

impl fmt::Display for ParseNoteKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid note key '{}': keys must be non-empty and contain no whitespace or path separators",
            self.value
        )
    }
}

impl std::error::Error for ParseNoteKeyError {}

impl FromStr for NoteKey {
    type Err = ParseNoteKeyError;

    // Keys double as file stems, so anything that could escape the notes
    // directory is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = !s.is_empty()
            && s != "."
            && s != ".."
            && !s
                .chars()
                .any(|c| c.is_whitespace() || c == '/' || c == '\\');
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(ParseNoteKeyError {
                value: s.to_string(),
            })
        }
    }
}
