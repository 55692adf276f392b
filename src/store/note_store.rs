//! The shared in-memory note map and its caller-facing mutations.

use crate::domain::{Note, NoteKey, Tag, now};
use crate::infra::NoteFiles;
use crate::store::{Change, Event, StoreError, StoreResult};
use crossbeam::channel::{self, Receiver, Sender};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// The note map every component shares.
pub type NoteMap = HashMap<NoteKey, Note>;

/// In-memory store of all notes, guarded by one lock.
///
/// Cloning is cheap and yields another handle to the same map and event
/// channel. Background workers copy notes out under the lock, do their I/O
/// without it, and take it again only to write results back; nothing here
/// holds the lock across disk or network I/O.
#[derive(Clone)]
pub struct NoteStore {
    notes: Arc<Mutex<NoteMap>>,
    events: Sender<Event>,
}

impl NoteStore {
    /// Creates an empty store and the receiving end of its event channel.
    pub fn new() -> (Self, Receiver<Event>) {
        Self::from_notes(Vec::new())
    }

    /// Creates a store holding `notes`.
    pub fn from_notes(notes: impl IntoIterator<Item = (NoteKey, Note)>) -> (Self, Receiver<Event>) {
        let (tx, rx) = channel::unbounded();
        let store = Self {
            notes: Arc::new(Mutex::new(notes.into_iter().collect())),
            events: tx,
        };
        (store, rx)
    }

    /// Loads every note from disk.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Read` if any record cannot be read; no partial
    /// store is returned.
    pub fn load(files: &NoteFiles) -> StoreResult<(Self, Receiver<Event>)> {
        files.init().map_err(StoreError::Read)?;
        let notes = files.load_all().map_err(StoreError::Read)?;
        Ok(Self::from_notes(notes))
    }

    /// Locks the note map, recovering it if a holder panicked.
    pub(crate) fn lock(&self) -> MutexGuard<'_, NoteMap> {
        self.notes.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn emit(&self, event: Event) {
        // No receiver left means nobody is listening; that is fine.
        let _ = self.events.send(event);
    }

    /// Number of notes in the store, tombstones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// All keys currently in the store.
    pub fn keys(&self) -> Vec<NoteKey> {
        self.lock().keys().cloned().collect()
    }

    /// Deep copies of every note.
    pub fn snapshot(&self) -> Vec<(NoteKey, Note)> {
        self.lock()
            .iter()
            .map(|(k, n)| (k.clone(), n.clone()))
            .collect()
    }

    /// Runs `f` over the map under the lock.
    pub fn with_notes<T>(&self, f: impl FnOnce(&NoteMap) -> T) -> T {
        f(&self.lock())
    }

    /// Creates a note whose content is `title` and returns its new local key.
    pub fn create_note(&self, title: &str) -> NoteKey {
        let key = {
            let mut notes = self.lock();
            let mut key = NoteKey::generate();
            while notes.contains_key(&key) {
                key = NoteKey::generate();
            }
            notes.insert(key.clone(), Note::new(title, now()));
            key
        };
        log::debug!("created note {}", key);
        self.emit(Event::NoteStatusChanged {
            key: key.clone(),
            change: Change::Created,
        });
        key
    }

    /// Returns a copy of the note.
    pub fn get_note(&self, key: &NoteKey) -> StoreResult<Note> {
        self.lock()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { key: key.clone() })
    }

    /// Returns the note's content.
    pub fn get_content(&self, key: &NoteKey) -> StoreResult<String> {
        self.get_note(key).map(|n| n.content)
    }

    /// Replaces the note's content. Returns false if it was already equal.
    pub fn set_content(&self, key: &NoteKey, content: &str) -> StoreResult<bool> {
        self.mutate(key, Change::Content, |note| {
            if note.content == content {
                return Ok(false);
            }
            note.content = content.to_string();
            Ok(true)
        })
    }

    /// Adds tags to the note. Tags it already has are ignored.
    pub fn add_tags(&self, key: &NoteKey, tags: &[Tag]) -> StoreResult<bool> {
        self.mutate(key, Change::Tags, |note| {
            let before = note.tags.len();
            note.tags.extend(tags.iter().cloned());
            Ok(note.tags.len() != before)
        })
    }

    /// Removes a tag from the note.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::TagNotPresent` if the note does not have the tag.
    pub fn delete_tag(&self, key: &NoteKey, tag: &Tag) -> StoreResult<()> {
        self.mutate(key, Change::Tags, |note| {
            if note.tags.remove(tag) {
                Ok(true)
            } else {
                Err(StoreError::TagNotPresent {
                    key: key.clone(),
                    tag: tag.clone(),
                })
            }
        })
        .map(|_| ())
    }

    /// Pins or unpins the note.
    pub fn set_pinned(&self, key: &NoteKey, pinned: bool) -> StoreResult<bool> {
        self.mutate(key, Change::Pinned, |note| Ok(note.set_pinned(pinned)))
    }

    /// Marks the note deleted. It stays in the store as a tombstone until
    /// a full sync confirms the remote no longer lists it.
    pub fn delete_note(&self, key: &NoteKey) -> StoreResult<bool> {
        self.mutate(key, Change::Deleted, |note| {
            if note.deleted {
                return Ok(false);
            }
            note.deleted = true;
            Ok(true)
        })
    }

    /// Applies `f` to the note under the lock. If `f` reports a change, the
    /// note's `modifydate` is bumped and a status event goes out.
    fn mutate(
        &self,
        key: &NoteKey,
        change: Change,
        f: impl FnOnce(&mut Note) -> StoreResult<bool>,
    ) -> StoreResult<bool> {
        let changed = {
            let mut notes = self.lock();
            let note = notes
                .get_mut(key)
                .ok_or_else(|| StoreError::NotFound { key: key.clone() })?;
            let changed = f(note)?;
            if changed {
                note.modifydate = now().max(note.modifydate);
            }
            changed
        };
        if changed {
            self.emit(Event::NoteStatusChanged {
                key: key.clone(),
                change,
            });
        }
        Ok(changed)
    }

    /// Moves a note to `new`, dropping the `old` slot. Returns false if
    /// `old` is gone.
    pub(crate) fn rekey_locked(notes: &mut NoteMap, old: &NoteKey, new: &NoteKey) -> bool {
        match notes.remove(old) {
            Some(note) => {
                notes.insert(new.clone(), note);
                true
            }
            None => false,
        }
    }
}
