//! Isolated test environment with temp directory.

use super::{NotesyncCommand, TestNote};
use notesync::domain::{Note, NoteKey};
use notesync::infra::{NoteFiles, read_record};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated test environment.
///
/// Holds a notes directory, a remote folder, and a config home so the
/// user's real configuration is never read. Everything is removed on drop.
pub struct TestEnv {
    /// The temporary directory (kept for lifetime management)
    _temp_dir: TempDir,
    notes_dir: PathBuf,
    remote_dir: PathBuf,
    config_home: PathBuf,
}

impl TestEnv {
    /// Creates a new isolated test environment.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        let env = Self {
            notes_dir: root.join("notes"),
            remote_dir: root.join("remote"),
            config_home: root.join("config"),
            _temp_dir: temp_dir,
        };
        std::fs::create_dir_all(&env.notes_dir).expect("Failed to create notes dir");
        std::fs::create_dir_all(&env.config_home).expect("Failed to create config dir");
        env
    }

    pub fn notes_dir(&self) -> &Path {
        &self.notes_dir
    }

    pub fn remote_dir(&self) -> &Path {
        &self.remote_dir
    }

    /// Writes `~/.config/notesync/config.toml` for this environment.
    pub fn write_config(&self, contents: &str) {
        let dir = self.config_home.join("notesync");
        std::fs::create_dir_all(&dir).expect("Failed to create config dir");
        std::fs::write(dir.join("config.toml"), contents).expect("Failed to write config");
    }

    /// Writes a note record directly into the notes directory.
    pub fn add_note(&self, test_note: &TestNote) -> PathBuf {
        let files = NoteFiles::new(&self.notes_dir);
        files
            .write(test_note.note_key(), &test_note.to_note())
            .expect("Failed to write test note");
        files.record_path(test_note.note_key())
    }

    /// Reads back every record in the notes directory.
    pub fn notes_on_disk(&self) -> Vec<(NoteKey, Note)> {
        NoteFiles::new(&self.notes_dir)
            .load_all()
            .expect("Failed to load notes")
    }

    /// Reads back one record.
    pub fn note_on_disk(&self, key: &str) -> Note {
        read_record(&self.notes_dir.join(format!("{}.json", key))).expect("Failed to read note")
    }

    /// Creates a command configured for this test environment.
    pub fn cmd(&self) -> NotesyncCommand {
        NotesyncCommand::new()
            .config_home(&self.config_home)
            .dir(&self.notes_dir)
    }

    /// Creates a command that also syncs with this environment's remote.
    pub fn cmd_with_remote(&self) -> NotesyncCommand {
        self.cmd().remote(&self.remote_dir)
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===========================================
    // TestEnv Foundation
    // ===========================================

    #[test]
    fn test_env_creates_temp_directory() {
        let env = TestEnv::new();
        assert!(env.notes_dir().is_dir(), "notes directory should exist");
    }

    #[test]
    fn test_env_cleanup_on_drop() {
        let path = {
            let env = TestEnv::new();
            env.notes_dir().to_path_buf()
        };
        assert!(!path.exists(), "temp directory should be cleaned up on drop");
    }

    #[test]
    fn test_env_add_note_round_trips() {
        let env = TestEnv::new();
        let note = TestNote::new("Parseable Note").key("k1").tag("integration");
        let path = env.add_note(&note);

        assert!(path.ends_with("k1.json"));
        let loaded = env.note_on_disk("k1");
        assert_eq!(loaded.content, "Parseable Note");
        assert_eq!(loaded.tags.len(), 1);
    }
}
