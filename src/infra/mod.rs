//! File I/O for note records and their text mirror

mod fs;
mod slug;

pub(crate) use fs::{scan_directory, write_atomic};
pub use fs::{
    FsError, NoteFiles, ReadError, TextMirror, WriteError, read_record, read_text, write_record,
    write_text,
};
pub use slug::{generate_filename, slugify};
