//! Tag command handlers.

use anyhow::{Context, Result};

use super::notes::parse_tags;
use super::resolve::require_note;
use crate::cli::{TagArgs, UntagArgs};
use crate::db::NoteDb;
use crate::domain::Tag;

pub fn handle_tag(args: &TagArgs, db: &NoteDb) -> Result<()> {
    let key = require_note(db, &args.note)?;
    let tags = parse_tags(&args.tags)?;

    if db.add_tags(&key, &tags)? {
        let names: Vec<_> = tags.iter().map(|t| t.as_str()).collect();
        println!("Tagged [{}]: {}", key, names.join(", "));
    } else {
        println!("Already tagged: [{}]", key);
    }
    Ok(())
}

pub fn handle_untag(args: &UntagArgs, db: &NoteDb) -> Result<()> {
    let key = require_note(db, &args.note)?;
    let tag = Tag::new(&args.tag).with_context(|| format!("invalid tag: {}", args.tag))?;

    db.delete_tag(&key, &tag)?;
    println!("Untagged [{}]: {}", key, tag);
    Ok(())
}
