//! Core types: Note, RemoteNote, NoteKey, Tag, sort order

mod note;
mod note_key;
mod sort;
mod tag;

pub use note::{Note, PINNED, RemoteNote, Timestamp, now};
pub use note_key::{NoteKey, ParseNoteKeyError};
pub use sort::{AlphanumKey, SortMode, SortOrder};
pub use tag::{ParseTagError, Tag};
