//! The remote note service as the core sees it.

use crate::domain::{Note, NoteKey, RemoteNote};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by a remote client.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("remote note not found: {0}")]
    NotFound(NoteKey),

    #[error("remote rejected the request: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Client for the remote note service.
///
/// Implementations report failures as values. `upsert_note` creates a new
/// remote note when the note has no `key`, and otherwise updates the note
/// under that key. `list_notes(false)` may leave `content` out of entries.
pub trait RemoteClient: Send + Sync {
    fn authenticate(&self) -> RemoteResult<String>;

    fn list_notes(&self, full: bool) -> RemoteResult<Vec<RemoteNote>>;

    fn get_note(&self, key: &NoteKey) -> RemoteResult<RemoteNote>;

    fn upsert_note(&self, note: &Note) -> RemoteResult<RemoteNote>;

    /// Removes a note from the server outright.
    ///
    /// Local deletions never come through here: they reach the server as
    /// an upsert of the note with `deleted` set, and the tombstone is
    /// dropped once a full sync no longer finds it in the index. This call
    /// is for tools working on the server directly.
    fn delete_note(&self, key: &NoteKey) -> RemoteResult<()>;
}

/// A [`RemoteClient`] behind a panic boundary.
///
/// A panicking client call surfaces as `RemoteError::Transport`, so no
/// worker thread dies because of a misbehaving transport.
#[derive(Clone)]
pub struct Remote {
    client: Arc<dyn RemoteClient>,
}

impl Remote {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self { client }
    }

    pub fn authenticate(&self) -> RemoteResult<String> {
        guarded("authenticate", || self.client.authenticate())
    }

    pub fn list_notes(&self, full: bool) -> RemoteResult<Vec<RemoteNote>> {
        guarded("list_notes", || self.client.list_notes(full))
    }

    pub fn get_note(&self, key: &NoteKey) -> RemoteResult<RemoteNote> {
        guarded("get_note", || self.client.get_note(key))
    }

    pub fn upsert_note(&self, note: &Note) -> RemoteResult<RemoteNote> {
        guarded("upsert_note", || self.client.upsert_note(note))
    }

    /// See [`RemoteClient::delete_note`]; sync itself never purges notes.
    pub fn delete_note(&self, key: &NoteKey) -> RemoteResult<()> {
        guarded("delete_note", || self.client.delete_note(key))
    }
}

fn guarded<T>(op: &str, f: impl FnOnce() -> RemoteResult<T>) -> RemoteResult<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        log::error!("remote {} panicked: {}", op, message);
        Err(RemoteError::Transport(format!("{} panicked: {}", op, message)))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
