//! CLI command definitions and handlers

pub mod config;
pub mod handlers;
pub mod output;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use output::OutputFormat;

/// notesync - local notes kept in sync with a remote note store
#[derive(Parser, Debug)]
#[command(name = "notesync", version, about, long_about = None)]
pub struct Cli {
    /// Notes directory (overrides config file)
    #[arg(short = 'd', long, global = true)]
    pub dir: Option<PathBuf>,

    /// Remote folder to sync with (overrides config file)
    #[arg(short = 'r', long, global = true)]
    pub remote: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new note
    New(NewArgs),

    /// List notes, optionally filtered by a query
    #[command(name = "ls")]
    List(ListArgs),

    /// Show a note's contents
    Show(NoteArgs),

    /// Replace a note's contents
    Edit(EditArgs),

    /// Add tags to a note
    Tag(TagArgs),

    /// Remove a tag from a note
    Untag(UntagArgs),

    /// Pin a note to the top of listings
    Pin(NoteArgs),

    /// Unpin a note
    Unpin(NoteArgs),

    /// Delete a note (removed everywhere on the next sync)
    Rm(NoteArgs),

    /// Run a full sync with the remote
    Sync(SyncArgs),

    /// Show pending work
    Status(StatusArgs),
}

/// Arguments for the `new` command
#[derive(Parser, Debug)]
pub struct NewArgs {
    /// Note title (first line of the content)
    pub title: String,

    /// Tags for the note (comma separated, can be repeated)
    #[arg(short, long = "tag", action = ArgAction::Append)]
    pub tags: Vec<String>,

    /// Pin the new note
    #[arg(long)]
    pub pin: bool,
}

/// Arguments for the `ls` (list) command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Filter query: words, "quoted phrases", and tag:prefix filters
    pub query: Option<String>,

    /// Treat the query as a regular expression
    #[arg(short = 'p', long)]
    pub pattern: bool,

    /// Match case exactly
    #[arg(short = 'c', long)]
    pub case_sensitive: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// A command that takes only a note
#[derive(Parser, Debug)]
pub struct NoteArgs {
    /// Note key, key prefix, or title
    pub note: String,
}

/// Arguments for the `edit` command
#[derive(Parser, Debug)]
pub struct EditArgs {
    /// Note key, key prefix, or title
    pub note: String,

    /// New content; `-` reads it from stdin
    pub content: String,
}

/// Arguments for the `tag` command
#[derive(Parser, Debug)]
pub struct TagArgs {
    /// Note key, key prefix, or title
    pub note: String,

    /// Tags to add (comma or space separated)
    #[arg(required = true)]
    pub tags: Vec<String>,
}

/// Arguments for the `untag` command
#[derive(Parser, Debug)]
pub struct UntagArgs {
    /// Note key, key prefix, or title
    pub note: String,

    /// Tag to remove
    pub tag: String,
}

/// Arguments for the `sync` command
#[derive(Parser, Debug)]
pub struct SyncArgs {
    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// Arguments for the `status` command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}
