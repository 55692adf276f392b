//! Filtered, sorted views over the note store

mod filter;

pub use filter::{FilterOptions, FilterResult, FilteredNote, SearchMode, filter_notes};
