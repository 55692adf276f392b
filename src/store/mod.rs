//! Shared note map, its mutations, the event channel, and disk persistence

mod error;
mod event;
mod note_store;
mod save_worker;

pub use error::{StoreError, StoreResult};
pub use event::{Change, Event};
pub use note_store::{NoteMap, NoteStore};
pub use save_worker::{SaveQueue, SaveReport, SaveTask, SaveWorker};
