//! Fluent wrapper around assert_cmd::Command.

#![allow(dead_code)]

use assert_cmd::Command;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Fluent wrapper around `assert_cmd::Command` for the `notesync` binary.
pub struct NotesyncCommand {
    args: Vec<String>,
    config_home: Option<PathBuf>,
    stdin: Option<String>,
}

impl NotesyncCommand {
    pub fn new() -> Self {
        Self {
            args: Vec::new(),
            config_home: None,
            stdin: None,
        }
    }

    /// Points the config lookup at `path` instead of the user's home.
    pub fn config_home(mut self, path: &Path) -> Self {
        self.config_home = Some(path.to_path_buf());
        self
    }

    /// Sets the `--dir` option to specify the notes directory.
    pub fn dir(self, path: &Path) -> Self {
        self.args(["--dir", &path.to_string_lossy()])
    }

    /// Sets the `--remote` option.
    pub fn remote(self, path: &Path) -> Self {
        self.args(["--remote", &path.to_string_lossy()])
    }

    /// Adds arguments to the command.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    pub fn stdin(mut self, input: &str) -> Self {
        self.stdin = Some(input.to_string());
        self
    }

    /// Returns the current arguments (for testing).
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Runs the command and returns an Assert for making assertions.
    #[allow(deprecated)]
    pub fn assert(self) -> assert_cmd::assert::Assert {
        let mut cmd = Command::cargo_bin("notesync").expect("Failed to find notesync binary");
        cmd.args(&self.args);
        cmd.env_remove("RUST_LOG");
        if let Some(home) = &self.config_home {
            cmd.env("XDG_CONFIG_HOME", home);
            cmd.env("HOME", home);
        }
        if let Some(input) = self.stdin {
            cmd.write_stdin(input);
        }
        cmd.assert()
    }

    /// Runs the command, expects success, and returns stdout as a string.
    pub fn output_success(self) -> String {
        let output = self.assert().success().get_output().stdout.clone();
        String::from_utf8(output).expect("Output was not valid UTF-8")
    }

    /// Runs the command, expects success, and parses stdout as JSON.
    pub fn output_json<T: DeserializeOwned>(self) -> T {
        let output = self.output_success();
        serde_json::from_str(&output).expect("Failed to parse output as JSON")
    }

    // ===========================================
    // Command Shortcuts
    // ===========================================

    pub fn new_note(self, title: &str) -> Self {
        self.args(["new", title])
    }

    pub fn ls(self) -> Self {
        self.args(["ls"])
    }

    pub fn show(self, note: &str) -> Self {
        self.args(["show", note])
    }

    pub fn sync(self) -> Self {
        self.args(["sync"])
    }

    pub fn status(self) -> Self {
        self.args(["status"])
    }

    /// Adds `--format json` to the command.
    pub fn format_json(self) -> Self {
        self.args(["--format", "json"])
    }
}

impl Default for NotesyncCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_command_with_dir() {
        let temp = TempDir::new().unwrap();
        let cmd = NotesyncCommand::new().dir(temp.path());
        let args = cmd.get_args();
        assert_eq!(args[0], "--dir");
        assert_eq!(args[1], temp.path().to_string_lossy());
    }

    #[test]
    fn test_command_shortcuts() {
        let cmd = NotesyncCommand::new().ls().format_json();
        assert_eq!(cmd.get_args(), ["ls", "--format", "json"]);
    }
}
