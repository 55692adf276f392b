//! Configuration file support.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::db::{DEFAULT_SYNC_IDLE_SECS, StoreOptions};
use crate::domain::{SortMode, SortOrder};
use crate::infra::TextMirror;
use crate::search::{FilterOptions, SearchMode};

/// Application configuration loaded from config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Notes directory
    pub db_path: Option<PathBuf>,

    /// Mirror every note to a plain text file
    pub notes_as_txt: bool,

    /// Directory for text files (default: `<db_path>/txt`)
    pub txt_path: Option<PathBuf>,

    /// Extension for text files (default: `txt`)
    pub txt_extension: Option<String>,

    pub search_mode: SearchMode,

    pub case_sensitive: bool,

    /// Also match pattern searches against tags (default: true)
    pub search_tags: Option<bool>,

    pub sort_mode: SortMode,

    /// Sort pinned notes first (default: true)
    pub pinned_on_top: Option<bool>,

    /// Seconds a note must sit unedited before it is synced
    pub sync_idle_secs: Option<f64>,

    /// Directory acting as the remote note service
    pub remote_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default config file location.
    ///
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read config file: {}", config_path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("failed to parse config file: {}", config_path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Returns the path to the config file.
    ///
    /// Default: `~/.config/notesync/config.toml`
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("notesync")
            .join("config.toml")
    }

    /// Resolve the notes directory, with CLI argument taking precedence.
    ///
    /// Precedence order:
    /// 1. CLI `--dir` argument
    /// 2. Config file `db_path` setting
    /// 3. `notesync` under the platform data directory
    pub fn db_path(&self, cli_dir: Option<&PathBuf>) -> PathBuf {
        cli_dir
            .cloned()
            .or_else(|| self.db_path.clone())
            .unwrap_or_else(|| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("notesync")
            })
    }

    /// Storage settings for the core.
    pub fn store_options(&self, cli_dir: Option<&PathBuf>) -> StoreOptions {
        let db_path = self.db_path(cli_dir);
        let text_mirror = self.notes_as_txt.then(|| TextMirror {
            dir: self
                .txt_path
                .clone()
                .unwrap_or_else(|| db_path.join("txt")),
            extension: self
                .txt_extension
                .clone()
                .unwrap_or_else(|| "txt".to_string()),
        });
        StoreOptions {
            db_path,
            text_mirror,
            sync_idle_secs: self.sync_idle_secs.unwrap_or(DEFAULT_SYNC_IDLE_SECS),
        }
    }

    /// Search and sort settings for the core.
    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            mode: self.search_mode,
            case_sensitive: self.case_sensitive,
            search_tags: self.search_tags.unwrap_or(true),
            order: SortOrder::new(self.sort_mode, self.pinned_on_top.unwrap_or(true)),
        }
    }
}
