//! Note resolution utilities.

use anyhow::{Result, bail};

use crate::db::NoteDb;
use crate::domain::{Note, NoteKey};
use crate::store::NoteMap;

/// Result of resolving a note identifier.
#[derive(Debug)]
pub enum ResolveResult {
    /// Exactly one note matched.
    Unique(NoteKey),
    /// Multiple notes matched (ambiguous).
    Ambiguous(Vec<(NoteKey, Note)>),
    /// No notes matched.
    NotFound,
}

/// Resolves a note identifier against the notes in `notes`.
///
/// Resolution order:
/// 1. Exact key
/// 2. Key prefix (4+ characters)
/// 3. Title, ignoring case
///
/// Deleted notes are never matched.
pub fn resolve_note(notes: &NoteMap, identifier: &str) -> ResolveResult {
    let identifier = identifier.trim();
    let live = || notes.iter().filter(|(_, n)| !n.deleted);

    if let Some((key, _)) = live().find(|(k, _)| k.as_str() == identifier) {
        return ResolveResult::Unique(key.clone());
    }

    let mut candidates: Vec<(NoteKey, Note)> = Vec::new();

    if identifier.chars().count() >= 4 {
        candidates.extend(
            live()
                .filter(|(k, _)| k.as_str().starts_with(identifier))
                .map(|(k, n)| (k.clone(), n.clone())),
        );
        // Key matches are the most precise
        if candidates.len() == 1 {
            return ResolveResult::Unique(candidates.remove(0).0);
        }
    }

    let lowered = identifier.to_lowercase();
    for (key, note) in live().filter(|(_, n)| n.title().to_lowercase() == lowered) {
        if !candidates.iter().any(|(k, _)| k == key) {
            candidates.push((key.clone(), note.clone()));
        }
    }

    match candidates.len() {
        0 => ResolveResult::NotFound,
        1 => ResolveResult::Unique(candidates.remove(0).0),
        _ => {
            candidates.sort_by(|a, b| a.0.cmp(&b.0));
            ResolveResult::Ambiguous(candidates)
        }
    }
}

/// Resolves `identifier` to a key, failing with a message on stderr if it
/// is ambiguous or unknown.
pub(crate) fn require_note(db: &NoteDb, identifier: &str) -> Result<NoteKey> {
    match db.store().with_notes(|notes| resolve_note(notes, identifier)) {
        ResolveResult::Unique(key) => Ok(key),
        ResolveResult::Ambiguous(notes) => {
            print_ambiguous_notes(identifier, &notes);
            bail!("ambiguous note identifier");
        }
        ResolveResult::NotFound => bail!("note not found: '{}'", identifier),
    }
}

/// Prints the candidates for an ambiguous identifier.
pub(crate) fn print_ambiguous_notes(identifier: &str, notes: &[(NoteKey, Note)]) {
    eprintln!("Ambiguous: '{}' matches {} notes:", identifier, notes.len());
    for (key, note) in notes {
        eprintln!("  {} - {}", key, note.title());
        if !note.tags.is_empty() {
            let tags: Vec<_> = note.tags.iter().map(|t| t.as_str()).collect();
            eprintln!("      tags: {}", tags.join(", "));
        }
    }
    eprintln!();
    eprintln!("Use the key to specify which note you mean.");
}
