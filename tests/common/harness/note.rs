//! Builder for test notes with sensible defaults.

use notesync::domain::{Note, NoteKey, Tag, now};

/// Builder for creating test notes with sensible defaults.
///
/// Generates a key and sets every date to now, as a note that was created
/// and saved but never synced.
#[derive(Debug)]
pub struct TestNote {
    key: NoteKey,
    content: String,
    tags: Vec<Tag>,
    pinned: bool,
    deleted: bool,
    modifydate: f64,
    remote_key: bool,
}

impl TestNote {
    /// Creates a new test note with the given content.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            key: NoteKey::generate(),
            content: content.into(),
            tags: Vec::new(),
            pinned: false,
            deleted: false,
            modifydate: now(),
            remote_key: false,
        }
    }

    /// Sets an explicit key for the note.
    pub fn key(mut self, key: &str) -> Self {
        self.key = key.parse().expect("Invalid NoteKey");
        self
    }

    /// Adds a tag to the note.
    pub fn tag(mut self, tag: impl AsRef<str>) -> Self {
        self.tags.push(Tag::new(tag.as_ref()).expect("Invalid tag"));
        self
    }

    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }

    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    pub fn modified_at(mut self, modifydate: f64) -> Self {
        self.modifydate = modifydate;
        self
    }

    /// Marks the note as already synced under its key.
    pub fn synced(mut self) -> Self {
        self.remote_key = true;
        self
    }

    /// Returns the key.
    pub fn note_key(&self) -> &NoteKey {
        &self.key
    }

    /// Converts this TestNote to a domain Note.
    pub fn to_note(&self) -> Note {
        let mut note = Note::new(self.content.clone(), self.modifydate);
        note.tags = self.tags.iter().cloned().collect();
        note.set_pinned(self.pinned);
        note.deleted = self.deleted;
        note.savedate = self.modifydate;
        if self.remote_key {
            note.key = Some(self.key.clone());
            note.version = Some(1);
            note.syncdate = self.modifydate;
        }
        note
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===========================================
    // TestNote Builder
    // ===========================================

    #[test]
    fn test_note_defaults_to_saved_and_unsynced() {
        let note = TestNote::new("My Test Note").to_note();
        assert_eq!(note.title(), "My Test Note");
        assert!(!note.needs_save());
        assert!(note.needs_sync_to_remote());
    }

    #[test]
    fn test_note_builder_fluent() {
        let note = TestNote::new("Plans\nbody")
            .key("abc123")
            .tag("work")
            .pinned()
            .synced();

        assert_eq!(note.note_key().as_str(), "abc123");
        let domain_note = note.to_note();
        assert!(domain_note.is_pinned());
        assert_eq!(domain_note.key.as_ref().map(|k| k.as_str()), Some("abc123"));
        assert!(!domain_note.needs_sync_to_remote());
    }
}
