//! Test harness for CLI integration tests.
//!
//! Provides isolated test environments, programmatic note creation,
//! and CLI assertion helpers using `assert_cmd`.

mod command;
mod env;
mod note;

pub use command::NotesyncCommand;
pub use env::TestEnv;
pub use note::TestNote;
