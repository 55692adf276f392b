//! List command handler.

use anyhow::Result;

use super::truncate_str;
use crate::cli::ListArgs;
use crate::cli::output::{NoteListing, Output, OutputFormat};
use crate::db::NoteDb;
use crate::search::{FilterOptions, SearchMode};

/// Applies the command-line switches on top of the configured options.
pub(crate) fn list_options(args: &ListArgs, configured: FilterOptions) -> FilterOptions {
    FilterOptions {
        mode: if args.pattern {
            SearchMode::Pattern
        } else {
            configured.mode
        },
        case_sensitive: args.case_sensitive || configured.case_sensitive,
        ..configured
    }
}

pub fn handle_list(args: &ListArgs, db: &NoteDb, configured: FilterOptions) -> Result<()> {
    let options = list_options(args, configured);
    let result = db.filter_with(args.query.as_deref().unwrap_or(""), &options);

    match args.format {
        OutputFormat::Human => {
            if result.notes.is_empty() {
                println!("No notes found.");
                return Ok(());
            }
            println!("{:<12}  {:<50}  {:>16}", "Key", "Title", "Modified");
            println!("{:<12}  {:<50}  {:>16}", "-".repeat(12), "-".repeat(50), "-".repeat(16));
            for filtered in &result.notes {
                let listing = NoteListing::new(&filtered.key, &filtered.note);
                let marker = if listing.pinned { "*" } else { " " };
                println!(
                    "{:<12}  {:<50}  {:>16}{}",
                    truncate_str(&listing.key, 12),
                    truncate_str(&listing.title, 50),
                    listing.modified,
                    marker
                );
            }
            println!();
            println!("{} of {} notes", result.notes.len(), result.active_count);
        }
        OutputFormat::Json => {
            let listings: Vec<NoteListing> = result
                .notes
                .iter()
                .map(|n| NoteListing::new(&n.key, &n.note))
                .collect();
            println!("{}", serde_json::to_string_pretty(&Output::new(listings))?);
        }
    }
    Ok(())
}
