//! Filename generation for the plain-text note mirror.

use crate::domain::NoteKey;

/// Converts a note title to a filesystem-friendly slug.
///
/// - Converts to lowercase
/// - Replaces spaces with hyphens
/// - Keeps only alphanumeric characters (any script), hyphens, and underscores
/// - Collapses consecutive hyphens
/// - Trims leading/trailing hyphens
/// - Truncates to 50 characters (at word boundary if possible)
/// - Returns "untitled" for empty results
///
/// # Examples
///
/// ```
/// use notesync::infra::slugify;
///
/// assert_eq!(slugify("Shopping List"), "shopping-list");
/// assert_eq!(slugify("Hello World!"), "hello-world");
/// assert_eq!(slugify(""), "untitled");
/// ```
pub fn slugify(title: &str) -> String {
    const MAX_CHARS: usize = 50;

    let lower = title.to_lowercase();

    let mut collapsed = String::new();
    let mut prev_was_hyphen = false;
    for c in lower.chars() {
        let c = match c {
            ' ' | '-' => '-',
            '_' => '_',
            c if c.is_alphanumeric() => c,
            _ => continue,
        };
        if c == '-' {
            if !prev_was_hyphen {
                collapsed.push(c);
            }
            prev_was_hyphen = true;
        } else {
            collapsed.push(c);
            prev_was_hyphen = false;
        }
    }

    let trimmed = collapsed.trim_matches('-');

    if trimmed.is_empty() {
        return "untitled".to_string();
    }

    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= MAX_CHARS {
        return trimmed.to_string();
    }

    let truncated: String = chars[..MAX_CHARS].iter().collect();
    if let Some(last_hyphen) = truncated.rfind('-')
        && last_hyphen > truncated.len() / 2
    {
        return truncated[..last_hyphen].to_string();
    }

    truncated.trim_end_matches('-').to_string()
}

/// Generates the text-mirror filename for a note.
///
/// Format: `{slug}-{last 8 chars of key}.{extension}`. The key suffix keeps
/// two notes with the same title from sharing a file.
///
/// # Examples
///
/// ```
/// use notesync::domain::NoteKey;
/// use notesync::infra::generate_filename;
///
/// let key: NoteKey = "01HQ3K5M7NXJK4QZPW8V2R6T9Y".parse().unwrap();
/// assert_eq!(generate_filename(&key, "Shopping List", "txt"), "shopping-list-8V2R6T9Y.txt");
/// ```
pub fn generate_filename(key: &NoteKey, title: &str, extension: &str) -> String {
    format!("{}-{}.{}", slugify(title), key_suffix(key), extension)
}

fn key_suffix(key: &NoteKey) -> String {
    let chars: Vec<char> = key.as_str().chars().collect();
    let start = chars.len().saturating_sub(8);
    chars[start..].iter().collect()
}
