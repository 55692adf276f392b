//! Notifications emitted by the store and its workers.

use crate::domain::NoteKey;

/// What a local mutation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Created,
    Content,
    Tags,
    Pinned,
    Deleted,
}

/// Events delivered on the store's notification channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A caller mutation touched a note.
    NoteStatusChanged { key: NoteKey, change: Change },
    /// A note's state reached disk.
    NoteSaved { key: NoteKey },
    /// A note was reconciled with the remote service. `updated` is true when
    /// remote content was merged into the note.
    NoteSynced { key: NoteKey, updated: bool },
    /// A note moved from its local key to the key the remote assigned.
    NoteRekeyed { old: NoteKey, new: NoteKey },
    /// A full-sync pass finished a phase.
    SyncProgress { message: String },
    /// A full-sync pass finished; `errors` counts per-note pull failures.
    SyncCompleted { errors: usize },
    /// A full-sync pass aborted.
    SyncFailed { error: String },
}
