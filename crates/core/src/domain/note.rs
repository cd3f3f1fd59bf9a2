use serde::{Deserialize, Serialize};

/// Maximum excerpt length in characters, ellipsis included.
pub const SNIPPET_MAX_CHARS: usize = 350;
const ELLIPSIS: &str = "...";

/// A truncated note excerpt with the basename of the file it came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSnippet {
    pub text: String,
    pub source: String,
}

impl NoteSnippet {
    pub fn new(excerpt: &str, source: impl Into<String>) -> Self {
        Self { text: truncate_excerpt(excerpt), source: source.into() }
    }
}

/// Trims the excerpt and cuts it to [`SNIPPET_MAX_CHARS`], marking the cut with `...`.
pub fn truncate_excerpt(excerpt: &str) -> String {
    let trimmed = excerpt.trim();
    if trimmed.chars().count() <= SNIPPET_MAX_CHARS {
        return trimmed.to_string();
    }

    let keep = SNIPPET_MAX_CHARS - ELLIPSIS.len();
    let mut truncated = trimmed.chars().take(keep).collect::<String>();
    truncated.push_str(ELLIPSIS);
    truncated
}
