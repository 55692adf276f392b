//! Durable note storage: one JSON record per note, plus an optional
//! plain-text mirror, all written atomically.

use crate::domain::{Note, NoteKey, Timestamp};
use crate::infra::slug::generate_filename;
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write as IoWrite};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;
use thiserror::Error;
use walkdir::WalkDir;

/// Extension of per-note JSON records.
const RECORD_EXTENSION: &str = "json";

/// A text file must be this much newer than its record before its content
/// wins at load. Filesystems store mtimes at coarser precision than
/// `modifydate`.
const MTIME_TOLERANCE: f64 = 1.0;

/// Errors during file system operations on notes.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("note file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse note record at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize note {key}: {source}")]
    Serialize {
        key: NoteKey,
        #[source]
        source: serde_json::Error,
    },

    #[error("atomic write failed for {path}: {source}")]
    AtomicWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("record file name is not a valid note key: {path}")]
    InvalidKey { path: PathBuf },

    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("invalid encoding in {path}: {encoding}")]
    InvalidEncoding { path: PathBuf, encoding: String },
}

impl FsError {
    /// Creates an appropriate FsError from an io::Error.
    pub(crate) fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => FsError::NotFound { path: path.into() },
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied { path: path.into() },
            _ => FsError::Io {
                path: path.into(),
                source: error,
            },
        }
    }
}

/// Failure while loading the store at startup.
pub type ReadError = FsError;

/// Failure while persisting a note.
pub type WriteError = FsError;

/// Plain-text mirror settings.
#[derive(Debug, Clone)]
pub struct TextMirror {
    pub dir: PathBuf,
    pub extension: String,
}

/// The on-disk home of the note store.
///
/// Every note lives in `<dir>/<key>.json`. With a [`TextMirror`] configured,
/// its content is also written to a text file named after its title, and
/// text edited outside the application is picked up at load.
#[derive(Debug, Clone)]
pub struct NoteFiles {
    dir: PathBuf,
    text: Option<TextMirror>,
}

impl NoteFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            text: None,
        }
    }

    /// Enables the plain-text mirror.
    pub fn with_text_mirror(mut self, dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        self.text = Some(TextMirror {
            dir: dir.into(),
            extension: extension.into(),
        });
        self
    }

    /// Returns the records directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the records (and text mirror) directories if missing.
    pub fn init(&self) -> Result<(), FsError> {
        fs::create_dir_all(&self.dir).map_err(|e| FsError::from_io(&self.dir, e))?;
        if let Some(text) = &self.text {
            fs::create_dir_all(&text.dir).map_err(|e| FsError::from_io(&text.dir, e))?;
        }
        Ok(())
    }

    /// Path of the JSON record for `key`.
    pub fn record_path(&self, key: &NoteKey) -> PathBuf {
        self.dir.join(format!("{}.{}", key, RECORD_EXTENSION))
    }

    /// Path of the text mirror file for a note, if the mirror is enabled.
    pub fn text_path(&self, key: &NoteKey, note: &Note) -> Option<PathBuf> {
        self.text
            .as_ref()
            .map(|t| t.dir.join(generate_filename(key, note.title(), &t.extension)))
    }

    /// Reads every note record.
    ///
    /// Any unreadable or corrupt record fails the whole load. With the text
    /// mirror enabled, newer text files override record content and
    /// unclaimed text files become new notes.
    ///
    /// # Errors
    ///
    /// Returns the first `FsError` encountered.
    pub fn load_all(&self) -> Result<Vec<(NoteKey, Note)>, ReadError> {
        let mut notes = Vec::new();
        for path in scan_directory(&self.dir, RECORD_EXTENSION)? {
            let key = key_from_record_path(&path)?;
            let note = read_record(&path)?;
            notes.push((key, note));
        }

        if let Some(text) = &self.text {
            self.reconcile_text_mirror(text, &mut notes)?;
        }

        log::info!("loaded {} notes from {}", notes.len(), self.dir.display());
        Ok(notes)
    }

    fn reconcile_text_mirror(
        &self,
        text: &TextMirror,
        notes: &mut Vec<(NoteKey, Note)>,
    ) -> Result<(), ReadError> {
        let mut claimed = HashSet::new();

        for (key, note) in notes.iter_mut() {
            if note.deleted {
                continue;
            }
            let Some(path) = self.text_path(key, note) else {
                continue;
            };
            if !path.exists() {
                continue;
            }
            let mtime = modified_time(&path)?;
            if mtime > note.modifydate + MTIME_TOLERANCE {
                let body = read_text(&path)?;
                if body != note.content {
                    log::info!("text file {} is newer than note {}", path.display(), key);
                    note.content = body;
                    note.modifydate = mtime;
                }
            }
            claimed.insert(path);
        }

        for path in scan_directory(&text.dir, &text.extension)? {
            if claimed.contains(&path) {
                continue;
            }
            let mtime = modified_time(&path)?;
            let body = read_text(&path)?;
            let key = NoteKey::generate();
            let note = Note::new(body, mtime);

            // Move the file to the name the note will be saved under, so
            // the next load recognises it.
            if let Some(target) = self.text_path(&key, &note) {
                fs::rename(&path, &target).map_err(|e| FsError::from_io(&path, e))?;
            }
            log::info!("imported new note {} from {}", key, path.display());
            notes.push((key, note));
        }

        Ok(())
    }

    /// Writes a note's record (and text mirror).
    ///
    /// A text mirror file left behind under a previous title is removed.
    ///
    /// # Errors
    ///
    /// Returns `FsError::Serialize` or an I/O variant on failure.
    pub fn write(&self, key: &NoteKey, note: &Note) -> Result<(), WriteError> {
        let record = self.record_path(key);

        if self.text.is_some() {
            let previous = match read_record(&record) {
                Ok(previous) => Some(previous),
                Err(FsError::NotFound { .. }) => None,
                Err(e) => return Err(e),
            };
            let new_path = self.text_path(key, note);
            if let Some(old_path) = previous.and_then(|p| self.text_path(key, &p))
                && Some(&old_path) != new_path.as_ref()
            {
                remove_if_exists(&old_path)?;
            }
            if let Some(path) = new_path {
                if note.deleted {
                    remove_if_exists(&path)?;
                } else {
                    write_text(&path, &note.content, note.modifydate)?;
                }
            }
        }

        write_record(&record, key, note)
    }

    /// Removes a note's record and, if given the note, its text mirror.
    ///
    /// Missing files are not an error.
    pub fn remove(&self, key: &NoteKey, note: Option<&Note>) -> Result<(), WriteError> {
        if let Some(path) = note.and_then(|n| self.text_path(key, n)) {
            remove_if_exists(&path)?;
        }
        remove_if_exists(&self.record_path(key))
    }
}

/// Reads one JSON note record.
///
/// # Errors
///
/// Returns `FsError::NotFound` if the file doesn't exist.
/// Returns `FsError::Parse` if the record is not a valid note.
pub fn read_record(path: &Path) -> Result<Note, FsError> {
    let bytes = fs::read(path).map_err(|e| FsError::from_io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| FsError::Parse {
        path: path.into(),
        source: e,
    })
}

/// Writes one JSON note record atomically.
///
/// Uses a temporary file and atomic rename to prevent partial writes.
pub fn write_record(path: &Path, key: &NoteKey, note: &Note) -> Result<(), FsError> {
    let content = serde_json::to_vec_pretty(note).map_err(|e| FsError::Serialize {
        key: key.clone(),
        source: e,
    })?;
    write_atomic(path, &content, None)
}

/// Reads a text mirror file, rejecting non-UTF-8 content.
pub fn read_text(path: &Path) -> Result<String, FsError> {
    let bytes = fs::read(path).map_err(|e| FsError::from_io(path, e))?;

    let content = String::from_utf8(bytes).map_err(|e| FsError::InvalidEncoding {
        path: path.into(),
        encoding: format!("invalid UTF-8 at byte {}", e.utf8_error().valid_up_to()),
    })?;

    Ok(content
        .strip_prefix('\u{FEFF}')
        .map(str::to_string)
        .unwrap_or(content))
}

/// Writes a text mirror file atomically, stamping its mtime with `modified`.
pub fn write_text(path: &Path, body: &str, modified: Timestamp) -> Result<(), FsError> {
    write_atomic(path, body.as_bytes(), Some(to_system_time(modified)))
}

pub(crate) fn write_atomic(path: &Path, content: &[u8], mtime: Option<SystemTime>) -> Result<(), FsError> {
    let parent = path
        .parent()
        .ok_or_else(|| FsError::NotFound { path: path.into() })?;

    if !parent.is_dir() {
        return Err(FsError::NotFound {
            path: parent.into(),
        });
    }

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| FsError::Io {
        path: path.into(),
        source: e,
    })?;

    temp.write_all(content).map_err(|e| FsError::Io {
        path: path.into(),
        source: e,
    })?;

    if let Some(mtime) = mtime {
        temp.as_file().set_modified(mtime).map_err(|e| FsError::Io {
            path: path.into(),
            source: e,
        })?;
    }

    temp.persist(path).map_err(|e| FsError::AtomicWrite {
        path: path.into(),
        source: e.error,
    })?;

    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<(), FsError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FsError::from_io(path, e)),
    }
}

fn modified_time(path: &Path) -> Result<Timestamp, FsError> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| FsError::from_io(path, e))?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0))
}

fn to_system_time(ts: Timestamp) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs_f64(ts.max(0.0))
}

fn key_from_record_path(path: &Path) -> Result<NoteKey, FsError> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| FsError::InvalidKey { path: path.into() })
}

/// Lists files with `extension` directly inside `dir`, skipping hidden files.
///
/// A missing directory yields no files.
pub(crate) fn scan_directory(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, FsError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    if !dir.is_dir() {
        return Err(FsError::NotADirectory { path: dir.into() });
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| FsError::Io {
            path: dir.into(),
            source: e.into(),
        })?;
        let hidden = entry
            .file_name()
            .to_str()
            .is_some_and(|s| s.starts_with('.'));
        if hidden || !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().is_some_and(|e| e == extension) {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths)
}
