//! Output format types for CLI commands.

use clap::ValueEnum;
use serde::Serialize;

use crate::db::Status;
use crate::domain::{Note, NoteKey, Timestamp};
use crate::sync::FullSyncReport;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output for programmatic consumption
    Json,
}

/// Wrapper for serializable command output.
#[derive(Debug, Serialize)]
pub struct Output<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> Output<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// A single note in listing output.
#[derive(Debug, Serialize)]
pub struct NoteListing {
    pub key: String,
    pub title: String,
    pub tags: Vec<String>,
    pub pinned: bool,
    pub modified: String,
}

impl NoteListing {
    pub fn new(key: &NoteKey, note: &Note) -> Self {
        Self {
            key: key.to_string(),
            title: note.title().to_string(),
            tags: note.tags.iter().map(|t| t.to_string()).collect(),
            pinned: note.is_pinned(),
            modified: format_timestamp(note.modifydate),
        }
    }
}

/// Pending work, as printed by `status`.
#[derive(Debug, Serialize)]
pub struct StatusListing {
    pub notes: usize,
    pub deleted: usize,
    pub unsaved: usize,
    pub unsynced: usize,
}

impl From<Status> for StatusListing {
    fn from(status: Status) -> Self {
        Self {
            notes: status.notes,
            deleted: status.deleted,
            unsaved: status.needs_save,
            unsynced: status.needs_sync,
        }
    }
}

/// Totals from a full sync.
#[derive(Debug, Serialize)]
pub struct SyncListing {
    pub pushed: usize,
    pub deleted: usize,
    pub pulled: usize,
    pub errors: usize,
}

impl From<FullSyncReport> for SyncListing {
    fn from(report: FullSyncReport) -> Self {
        Self {
            pushed: report.pushed,
            deleted: report.deleted,
            pulled: report.pulled,
            errors: report.errors,
        }
    }
}

/// Formats seconds since the epoch as a local `YYYY-MM-DD HH:MM`.
pub fn format_timestamp(ts: Timestamp) -> String {
    chrono::DateTime::from_timestamp(ts.trunc() as i64, 0)
        .map(|dt| {
            dt.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_string())
}
