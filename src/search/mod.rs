//! Search filtering for the note list.

use crate::entity::Note;

/// Case-insensitive substring filter over a note's title or content.
///
/// An empty query matches every note.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    raw: String,
    needle: String,
}

impl SearchFilter {
    pub fn new(query: &str) -> Self {
        Self {
            raw: query.to_string(),
            needle: query.to_lowercase(),
        }
    }

    /// The query as the user typed it.
    pub fn query(&self) -> &str {
        &self.raw
    }

    /// Check if filter has any constraint.
    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    pub fn matches(&self, note: &Note) -> bool {
        if self.is_empty() {
            return true;
        }
        note.title.to_lowercase().contains(&self.needle)
            || note.content.to_lowercase().contains(&self.needle)
    }

    /// Notes matching the filter, in their original order.
    pub fn apply<'a>(&self, notes: &'a [Note]) -> Vec<&'a Note> {
        notes.iter().filter(|n| self.matches(n)).collect()
    }
}
