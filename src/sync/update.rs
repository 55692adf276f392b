//! Pushing one note to the remote, with recovery from lost acknowledgements,
//! and writing the result back into the store.

use crate::domain::{Note, NoteKey, RemoteNote, Timestamp};
use crate::store::{NoteMap, NoteStore};
use crate::sync::{Remote, RemoteError};
use thiserror::Error;

/// Why a push did not succeed.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The upsert failed and there was nothing to recover.
    #[error("upsert failed: {0}")]
    Remote(#[source] RemoteError),

    /// The upsert failed and the remote copy differs from ours.
    #[error("upsert failed ({error}); remote copy differs from local note")]
    Conflict {
        error: RemoteError,
        remote: Box<RemoteNote>,
    },

    /// The upsert failed and so did the fetch meant to check on it.
    #[error("upsert failed ({error}); recovery fetch failed: {recovery}")]
    RecoveryFailed {
        error: RemoteError,
        recovery: RemoteError,
    },
}

/// A successful push.
#[derive(Debug, Clone)]
pub struct Pushed {
    /// The pushed note with the response merged in.
    pub note: Note,
    /// The remote response. `None` when the upsert errored but the remote
    /// already held identical fields, so nothing needs merging.
    pub response: Option<RemoteNote>,
}

/// Sends `note` to the remote service.
///
/// On success the response is merged onto a copy of `note`, keeping local
/// bookkeeping the response does not carry. If the upsert fails for a note
/// the remote already knows, its current remote copy is fetched: identical
/// user-visible fields mean the write landed and only the acknowledgement
/// was lost, which counts as success with no change.
pub fn update_note_to_remote(remote: &Remote, note: &Note) -> Result<Pushed, UpdateError> {
    let error = match remote.upsert_note(note) {
        Ok(response) => {
            let mut merged = note.clone();
            merged.merge_remote(&response);
            return Ok(Pushed {
                note: merged,
                response: Some(response),
            });
        }
        Err(error) => error,
    };

    let Some(key) = &note.key else {
        return Err(UpdateError::Remote(error));
    };

    match remote.get_note(key) {
        Ok(current) if note.same_fields_as(&current) => {
            log::info!("upsert of {} failed ({}) but remote copy matches", key, error);
            Ok(Pushed {
                note: note.clone(),
                response: None,
            })
        }
        Ok(current) => Err(UpdateError::Conflict {
            error,
            remote: Box::new(current),
        }),
        Err(recovery) => Err(UpdateError::RecoveryFailed { error, recovery }),
    }
}

/// What writing a push back into the store did.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// Key the note lives under now.
    pub key: NoteKey,
    /// Local key the note was moved away from, on its first sync.
    pub rekeyed_from: Option<NoteKey>,
    /// Remote fields changed the local note.
    pub updated: bool,
}

/// Writes a push result into the live note under `key`.
///
/// `snapshot` is the copy that was pushed. If the live note was modified
/// after it was taken, only the remote identity is adopted: a stale echo
/// never overwrites a fresher local edit. Either way `syncdate` becomes
/// `at`, and a newly assigned remote key replaces the local one.
///
/// Returns `None` if the note left the store meanwhile.
pub(crate) fn apply_push(
    notes: &mut NoteMap,
    key: &NoteKey,
    snapshot: &Note,
    pushed: &Pushed,
    at: Timestamp,
) -> Option<Applied> {
    let live = notes.get_mut(key)?;

    let mut updated = false;
    if let Some(response) = &pushed.response {
        if live.is_newer_than(snapshot) {
            log::debug!("note {} changed during sync; keeping local content", key);
            live.adopt_remote_identity(response);
        } else {
            let before = (live.content.clone(), live.tags.clone());
            live.merge_remote(response);
            updated = before != (live.content.clone(), live.tags.clone());
        }
    }
    live.syncdate = at;

    let remote_key = live.key.clone();
    match remote_key {
        Some(remote_key) if &remote_key != key => {
            NoteStore::rekey_locked(notes, key, &remote_key);
            log::info!("note {} is now {}", key, remote_key);
            Some(Applied {
                key: remote_key,
                rekeyed_from: Some(key.clone()),
                updated,
            })
        }
        _ => Some(Applied {
            key: key.clone(),
            rekeyed_from: None,
            updated,
        }),
    }
}
