//! Reconciling the store with the remote note service.
//!
//! [`SyncWorker`] pushes individual notes in the background;
//! [`FullSync`] runs the complete bidirectional pass. Both go through
//! [`update_note_to_remote`] and share one lock so they never interleave.

mod full;
mod remote;
mod update;
mod worker;

pub use full::{FullSync, FullSyncReport, SyncError};
pub use remote::{Remote, RemoteClient, RemoteError, RemoteResult};
pub use update::{Applied, Pushed, UpdateError, update_note_to_remote};
pub use worker::{SyncReport, SyncStats, SyncWorker};
