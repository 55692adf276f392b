//! Handlers for commands that create or change a single note.

use anyhow::{Context, Result};
use std::io::Read;

use super::resolve::require_note;
use crate::cli::output::format_timestamp;
use crate::cli::{EditArgs, NewArgs, NoteArgs};
use crate::db::NoteDb;
use crate::domain::{NoteKey, Tag};

pub fn handle_new(args: &NewArgs, db: &NoteDb) -> Result<NoteKey> {
    let tags = parse_tags(&args.tags)?;

    let key = db.create_note(&args.title);
    if !tags.is_empty() {
        db.add_tags(&key, &tags)?;
    }
    if args.pin {
        db.set_pinned(&key, true)?;
    }

    println!("Created: {} [{}]", args.title, key);
    Ok(key)
}

pub fn handle_show(args: &NoteArgs, db: &NoteDb) -> Result<()> {
    let key = require_note(db, &args.note)?;
    let note = db.get_note(&key)?;

    println!("# {}", note.title());
    println!();
    println!(
        "Key: {}  Created: {}  Modified: {}",
        key,
        format_timestamp(note.createdate),
        format_timestamp(note.modifydate)
    );
    if !note.tags.is_empty() {
        let tags: Vec<_> = note.tags.iter().map(|t| t.as_str()).collect();
        println!("Tags: {}", tags.join(", "));
    }
    if note.is_pinned() {
        println!("Pinned");
    }
    println!();
    println!("{}", note.content);
    Ok(())
}

pub fn handle_edit(args: &EditArgs, db: &NoteDb) -> Result<()> {
    let key = require_note(db, &args.note)?;
    let content = if args.content == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read content from stdin")?;
        buf
    } else {
        args.content.clone()
    };

    if db.set_content(&key, &content)? {
        println!("Edited: {} [{}]", db.get_note(&key)?.title(), key);
    } else {
        println!("Unchanged: [{}]", key);
    }
    Ok(())
}

pub fn handle_pin(args: &NoteArgs, db: &NoteDb, pinned: bool) -> Result<()> {
    let key = require_note(db, &args.note)?;
    let changed = db.set_pinned(&key, pinned)?;
    let verb = match (pinned, changed) {
        (true, true) => "Pinned",
        (false, true) => "Unpinned",
        (true, false) => "Already pinned",
        (false, false) => "Not pinned",
    };
    println!("{}: [{}]", verb, key);
    Ok(())
}

pub fn handle_rm(args: &NoteArgs, db: &NoteDb) -> Result<()> {
    let key = require_note(db, &args.note)?;
    let title = db.get_note(&key)?.title().to_string();
    db.delete_note(&key)?;
    println!("Deleted: {} [{}]", title, key);
    Ok(())
}

/// Parses repeated, comma or space separated tag arguments.
pub(crate) fn parse_tags(args: &[String]) -> Result<Vec<Tag>> {
    let mut tags = Vec::new();
    for arg in args {
        tags.extend(Tag::parse_list(arg).with_context(|| format!("invalid tag: {}", arg))?);
    }
    Ok(tags)
}
