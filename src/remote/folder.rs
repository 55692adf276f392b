//! A remote note service backed by a directory, one JSON file per note.
//!
//! Pointing two stores at the same folder gives a working two-device setup
//! without a network service.

use crate::domain::{Note, NoteKey, RemoteNote};
use crate::infra::{FsError, scan_directory, write_atomic};
use crate::sync::{RemoteClient, RemoteError, RemoteResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Directory-backed [`RemoteClient`].
///
/// Upserts assign a fresh key to notes that have none and bump `version`
/// on every write. Deleted notes stay fetchable by key but are left out
/// of listings.
#[derive(Debug)]
pub struct FolderRemote {
    dir: PathBuf,
    // Serializes read-modify-write of version numbers.
    writes: Mutex<()>,
}

impl FolderRemote {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            writes: Mutex::new(()),
        }
    }

    /// Creates the directory if missing.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, FsError> {
        let remote = Self::new(dir);
        fs::create_dir_all(&remote.dir).map_err(|e| FsError::from_io(&remote.dir, e))?;
        Ok(remote)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &NoteKey) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn read(&self, path: &Path) -> RemoteResult<RemoteNote> {
        let bytes = fs::read(path).map_err(|e| transport(FsError::from_io(path, e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| RemoteError::Rejected(format!("corrupt note {}: {}", path.display(), e)))
    }

    fn write(&self, note: &RemoteNote) -> RemoteResult<()> {
        let bytes = serde_json::to_vec_pretty(note)
            .map_err(|e| RemoteError::Rejected(format!("cannot encode note {}: {}", note.key, e)))?;
        write_atomic(&self.path(&note.key), &bytes, None).map_err(transport)
    }
}

fn transport(error: FsError) -> RemoteError {
    RemoteError::Transport(error.to_string())
}

impl RemoteClient for FolderRemote {
    fn authenticate(&self) -> RemoteResult<String> {
        if self.dir.is_dir() {
            Ok(format!("folder:{}", self.dir.display()))
        } else {
            Err(RemoteError::Auth(format!(
                "remote folder {} does not exist",
                self.dir.display()
            )))
        }
    }

    fn list_notes(&self, full: bool) -> RemoteResult<Vec<RemoteNote>> {
        let paths = scan_directory(&self.dir, "json").map_err(transport)?;
        let mut notes = Vec::with_capacity(paths.len());
        for path in paths {
            let note = self.read(&path)?;
            if note.deleted {
                continue;
            }
            notes.push(if full { note } else { note.without_content() });
        }
        Ok(notes)
    }

    fn get_note(&self, key: &NoteKey) -> RemoteResult<RemoteNote> {
        let path = self.path(key);
        if !path.exists() {
            return Err(RemoteError::NotFound(key.clone()));
        }
        self.read(&path)
    }

    fn upsert_note(&self, note: &Note) -> RemoteResult<RemoteNote> {
        let _writing = self.writes.lock().unwrap_or_else(|e| e.into_inner());

        let key = note.key.clone().unwrap_or_else(NoteKey::generate);
        let path = self.path(&key);
        let previous = if path.exists() {
            Some(self.read(&path)?)
        } else {
            None
        };

        let mut stored = RemoteNote::from_note(key, note);
        stored.version = Some(previous.and_then(|p| p.version).unwrap_or(0) + 1);
        self.write(&stored)?;
        log::debug!("folder remote stored {} v{:?}", stored.key, stored.version);
        Ok(stored)
    }

    fn delete_note(&self, key: &NoteKey) -> RemoteResult<()> {
        let path = self.path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(RemoteError::NotFound(key.clone())),
            Err(e) => Err(transport(FsError::from_io(&path, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn remote() -> (TempDir, FolderRemote) {
        let dir = TempDir::new().unwrap();
        let remote = FolderRemote::open(dir.path().join("server")).unwrap();
        (dir, remote)
    }

    #[test]
    fn first_upsert_assigns_key_and_version() {
        let (_dir, remote) = remote();
        let stored = remote.upsert_note(&Note::new("hello", 10.0)).unwrap();

        assert_eq!(stored.version, Some(1));
        assert_eq!(stored.content.as_deref(), Some("hello"));
        assert_eq!(remote.get_note(&stored.key).unwrap(), stored);
    }

    #[test]
    fn later_upserts_bump_version() {
        let (_dir, remote) = remote();
        let mut note = Note::new("hello", 10.0);
        let first = remote.upsert_note(&note).unwrap();

        note.merge_remote(&first);
        note.content = "hello again".into();
        let second = remote.upsert_note(&note).unwrap();

        assert_eq!(second.key, first.key);
        assert_eq!(second.version, Some(2));
    }

    #[test]
    fn index_listing_omits_content_and_deleted_notes() {
        let (_dir, remote) = remote();
        let kept = remote.upsert_note(&Note::new("kept", 1.0)).unwrap();
        let mut gone = Note::new("gone", 1.0);
        gone.deleted = true;
        let gone = remote.upsert_note(&gone).unwrap();

        let index = remote.list_notes(false).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].key, kept.key);
        assert!(index[0].content.is_none());

        assert_eq!(remote.list_notes(true).unwrap()[0].content.as_deref(), Some("kept"));
        assert!(remote.get_note(&gone.key).unwrap().deleted);
    }

    #[test]
    fn missing_notes_are_not_found() {
        let (_dir, remote) = remote();
        let key: NoteKey = "nothing".parse().unwrap();
        assert!(matches!(remote.get_note(&key), Err(RemoteError::NotFound(_))));
        assert!(matches!(remote.delete_note(&key), Err(RemoteError::NotFound(_))));
    }

    #[test]
    fn authenticate_requires_folder() {
        let dir = TempDir::new().unwrap();
        let missing = FolderRemote::new(dir.path().join("absent"));
        assert!(matches!(missing.authenticate(), Err(RemoteError::Auth(_))));
        assert!(FolderRemote::new(dir.path()).authenticate().is_ok());
    }
}
