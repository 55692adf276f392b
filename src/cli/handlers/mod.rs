//! Command handlers for the CLI.

mod list;
mod metadata;
mod notes;
mod resolve;
mod sync;


pub use list::handle_list;
pub use metadata::{handle_tag, handle_untag};
pub use notes::{handle_edit, handle_new, handle_pin, handle_rm, handle_show};
pub use resolve::{ResolveResult, resolve_note};
pub use sync::{handle_status, handle_sync};

// Re-export for tests
#[cfg(test)]
pub(crate) use list::list_options;
#[cfg(test)]
pub(crate) use notes::parse_tags;

// ===========================================
// Shared Utilities
// ===========================================

/// Truncates a string to a maximum display width, adding ellipsis if needed.
pub(crate) fn truncate_str(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
        format!("{}…", truncated)
    }
}
