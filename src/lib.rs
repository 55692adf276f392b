//! notesync - a local note cache kept in sync with a remote note service

pub mod cli;
pub mod db;
pub mod domain;
pub mod infra;
pub mod remote;
pub mod search;
pub mod store;
pub mod sync;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

use cli::{
    Cli, Command,
    config::Config,
    handlers::{
        handle_edit, handle_list, handle_new, handle_pin, handle_rm, handle_show, handle_status,
        handle_sync, handle_tag, handle_untag,
    },
};
use db::NoteDb;
use remote::FolderRemote;
use sync::RemoteClient;

/// How long the CLI waits for saves and syncs before exiting.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(30);

/// Main entry point for the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load()?;
    let options = config.store_options(cli.dir.as_ref());

    let client: Option<Arc<dyn RemoteClient>> =
        match cli.remote.as_ref().or(config.remote_dir.as_ref()) {
            Some(dir) => Some(Arc::new(FolderRemote::open(dir).with_context(|| {
                format!("failed to open remote folder: {}", dir.display())
            })?)),
            None => None,
        };

    let db = NoteDb::open(&options, config.filter_options(), client)
        .with_context(|| format!("failed to open notes at {}", options.db_path.display()))?;

    let result = match &cli.command {
        Command::New(args) => handle_new(args, &db).map(|_| ()),
        Command::List(args) => handle_list(args, &db, config.filter_options()),
        Command::Show(args) => handle_show(args, &db),
        Command::Edit(args) => handle_edit(args, &db),
        Command::Tag(args) => handle_tag(args, &db),
        Command::Untag(args) => handle_untag(args, &db),
        Command::Pin(args) => handle_pin(args, &db, true),
        Command::Unpin(args) => handle_pin(args, &db, false),
        Command::Rm(args) => handle_rm(args, &db),
        Command::Sync(args) => handle_sync(args, &db),
        Command::Status(args) => handle_status(args, &db),
    };

    // Persist whatever the command changed, even if it then failed.
    let flushed = db.flush(FLUSH_TIMEOUT).context("failed to save notes")?;
    if !flushed {
        log::warn!("gave up waiting for pending saves and syncs");
    }
    result
}

/// Logs to stderr at `warn` by default, raised by each `-v`. `RUST_LOG`
/// takes precedence.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
