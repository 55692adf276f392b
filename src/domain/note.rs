//! Note record and the derived-state predicates the workers rely on.

use crate::domain::{NoteKey, Tag};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// System tag marking a note as pinned.
pub const PINNED: &str = "pinned";

/// Seconds since the Unix epoch, with sub-second precision.
pub type Timestamp = f64;

/// Returns the current time as a [`Timestamp`].
pub fn now() -> Timestamp {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// A free-form text note plus its bookkeeping dates.
///
/// # Dates
/// - `modifydate`: last content/tag/flag change; never decreases except
///   through reconciliation.
/// - `savedate`: last successful disk write.
/// - `syncdate`: last successful reconciliation with the remote service.
///   `0.0` means "never synced".
///
/// # Optional Fields
/// - `key`: remote key, present once the remote service accepted the note
/// - `version`: remote revision counter
///
/// # Examples
///
/// ```
/// use notesync::domain::Note;
///
/// let note = Note::new("Shopping list", 100.0);
/// assert_eq!(note.title(), "Shopping list");
/// assert!(note.needs_save());
/// assert!(note.needs_sync_to_remote());
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub content: String,
    #[serde(default)]
    pub tags: BTreeSet<Tag>,
    pub createdate: Timestamp,
    pub modifydate: Timestamp,
    #[serde(default)]
    pub syncdate: Timestamp,
    #[serde(default)]
    pub savedate: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<NoteKey>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub systemtags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

impl Note {
    /// Creates a never-saved, never-synced note.
    pub fn new(content: impl Into<String>, at: Timestamp) -> Self {
        Self {
            content: content.into(),
            tags: BTreeSet::new(),
            createdate: at,
            modifydate: at,
            syncdate: 0.0,
            savedate: 0.0,
            key: None,
            deleted: false,
            systemtags: Vec::new(),
            version: None,
        }
    }

    /// Builds a local record from a note fetched from the remote service.
    ///
    /// An absent content field becomes empty content.
    pub fn from_remote(remote: &RemoteNote) -> Self {
        let mut note = Self::new(String::new(), remote.createdate);
        note.merge_remote(remote);
        note.modifydate = remote.modifydate;
        note
    }

    /// The first line of the content.
    pub fn title(&self) -> &str {
        self.content.lines().next().unwrap_or("").trim()
    }

    /// True if the note carries the pinned system tag.
    pub fn is_pinned(&self) -> bool {
        self.systemtags.iter().any(|t| t == PINNED)
    }

    /// Sets or clears the pinned system tag. Returns true if anything changed.
    pub fn set_pinned(&mut self, pinned: bool) -> bool {
        if pinned == self.is_pinned() {
            return false;
        }
        if pinned {
            self.systemtags.push(PINNED.to_string());
        } else {
            self.systemtags.retain(|t| t != PINNED);
        }
        true
    }

    /// True if the in-memory state has not reached disk yet.
    pub fn needs_save(&self) -> bool {
        self.modifydate > self.savedate || self.syncdate > self.savedate
    }

    /// True if the remote service has not seen the current state.
    pub fn needs_sync_to_remote(&self) -> bool {
        self.key.is_none() || self.modifydate > self.syncdate
    }

    /// True if this note was modified after `other`.
    pub fn is_newer_than(&self, other: &Note) -> bool {
        self.modifydate > other.modifydate
    }

    /// Applies a remote response onto this note.
    ///
    /// Remote-authoritative fields are overwritten; `savedate` and
    /// `syncdate` are local bookkeeping and left alone. An absent
    /// `content` means "unchanged on the server". `modifydate` becomes the
    /// later of the two sides.
    pub fn merge_remote(&mut self, remote: &RemoteNote) {
        if let Some(content) = &remote.content {
            self.content = content.clone();
        }
        self.key = Some(remote.key.clone());
        if remote.version.is_some() {
            self.version = remote.version;
        }
        self.tags = remote.tags.clone();
        self.createdate = remote.createdate;
        self.modifydate = self.modifydate.max(remote.modifydate);
        self.deleted = remote.deleted;
        self.systemtags = remote.systemtags.clone();
    }

    /// Takes only the identity the remote assigned (key and version),
    /// keeping every user-visible field.
    pub fn adopt_remote_identity(&mut self, remote: &RemoteNote) {
        self.key = Some(remote.key.clone());
        if remote.version.is_some() {
            self.version = remote.version;
        }
    }

    /// Compares user-visible fields against a remote copy, ignoring local
    /// bookkeeping. A remote copy without content never matches.
    pub fn same_fields_as(&self, remote: &RemoteNote) -> bool {
        remote.content.as_deref() == Some(self.content.as_str())
            && self.tags == remote.tags
            && self.deleted == remote.deleted
            && same_systemtags(&self.systemtags, &remote.systemtags)
    }
}

fn same_systemtags(a: &[String], b: &[String]) -> bool {
    let a: BTreeSet<_> = a.iter().collect();
    let b: BTreeSet<_> = b.iter().collect();
    a == b
}

impl fmt::Debug for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Note")
            .field("title", &self.title())
            .field("key", &self.key)
            .field("version", &self.version)
            .field("modifydate", &self.modifydate)
            .field("savedate", &self.savedate)
            .field("syncdate", &self.syncdate)
            .field("deleted", &self.deleted)
            .field("tags", &self.tags)
            .finish()
    }
}

/// A note as returned by the remote service.
///
/// Index listings and some upsert responses leave `content` out; `None`
/// means "not included", never "empty".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteNote {
    pub key: NoteKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<Tag>,
    pub createdate: Timestamp,
    pub modifydate: Timestamp,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub systemtags: Vec<String>,
}

impl RemoteNote {
    /// Builds the remote view of a local note under `key`.
    pub fn from_note(key: NoteKey, note: &Note) -> Self {
        Self {
            key,
            version: note.version,
            content: Some(note.content.clone()),
            tags: note.tags.clone(),
            createdate: note.createdate,
            modifydate: note.modifydate,
            deleted: note.deleted,
            systemtags: note.systemtags.clone(),
        }
    }

    /// The same entry without its content, as index listings return it.
    pub fn without_content(mut self) -> Self {
        self.content = None;
        self
    }
}
