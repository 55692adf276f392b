//! Store error type.

use crate::domain::{NoteKey, ParseTagError, Tag};
use crate::infra::{ReadError, WriteError};
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by note store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested note is not in the store.
    #[error("note not found: {key}")]
    NotFound { key: NoteKey },

    /// `delete_tag` named a tag the note does not carry.
    #[error("note {key} has no tag '{tag}'")]
    TagNotPresent { key: NoteKey, tag: Tag },

    #[error(transparent)]
    InvalidTag(#[from] ParseTagError),

    /// Loading the store at startup failed.
    #[error("failed to load notes: {0}")]
    Read(#[source] ReadError),

    /// Persisting a note failed. The save worker stops after this and every
    /// later drain or flush reports the same error.
    #[error("failed to save notes: {0}")]
    Write(#[source] Arc<WriteError>),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
