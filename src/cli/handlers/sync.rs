//! Sync and status handlers.

use anyhow::{Context, Result};

use crate::cli::output::{Output, OutputFormat, StatusListing, SyncListing};
use crate::cli::{StatusArgs, SyncArgs};
use crate::db::NoteDb;
use crate::store::Event;

pub fn handle_sync(args: &SyncArgs, db: &NoteDb) -> Result<()> {
    let result = db.full_sync_blocking();

    // Progress goes to stderr so JSON output stays parseable.
    for event in db.drain_events() {
        if let Event::SyncProgress { message } = event {
            eprintln!("  {}", message);
        }
    }
    let report = result.context("sync failed")?;

    match args.format {
        OutputFormat::Human => {
            println!(
                "Synced: {} pushed, {} pulled, {} removed",
                report.pushed, report.pulled, report.deleted
            );
            if report.errors > 0 {
                eprintln!("{} notes could not be fetched", report.errors);
            }
        }
        OutputFormat::Json => {
            let listing = SyncListing::from(report);
            println!("{}", serde_json::to_string_pretty(&Output::new(listing))?);
        }
    }
    Ok(())
}

pub fn handle_status(args: &StatusArgs, db: &NoteDb) -> Result<()> {
    let listing = StatusListing::from(db.status());

    match args.format {
        OutputFormat::Human => {
            println!("Notes:    {}", listing.notes - listing.deleted);
            println!("Deleted:  {}", listing.deleted);
            println!("Unsaved:  {}", listing.unsaved);
            println!("Unsynced: {}", listing.unsynced);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&Output::new(listing))?);
        }
    }
    Ok(())
}
