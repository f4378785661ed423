// src/entity/note.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title shown for notes whose title is empty.
pub const UNTITLED: &str = "Untitled";

/// Number of content characters shown in list previews.
pub const PREVIEW_CHARS: usize = 60;

/// A persisted note. `id` is assigned by storage; a note that has not been
/// inserted yet only exists as a [`NoteDraft`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub order_index: i64,
}

impl Note {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            UNTITLED
        } else {
            &self.title
        }
    }

    pub fn preview(&self) -> String {
        self.content.chars().take(PREVIEW_CHARS).collect()
    }

    pub fn draft(&self) -> NoteDraft {
        NoteDraft::new(self.title.clone(), self.content.clone())
    }

    /// Apply a partial update. Applying the same patch twice leaves the note
    /// as the first application did.
    pub fn apply(&mut self, patch: &NotePatch) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(content) = &patch.content {
            self.content.clone_from(content);
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
    }
}

/// Title/content pair as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Partial update payload for a note
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl NotePatch {
    /// Patch carrying a saved draft and the timestamp storage wrote for it.
    pub fn saved(draft: &NoteDraft, updated_at: Option<DateTime<Utc>>) -> Self {
        Self {
            title: Some(draft.title.clone()),
            content: Some(draft.content.clone()),
            updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(title: &str, content: &str) -> Note {
        let now = Utc::now();
        Note {
            id: 1,
            title: title.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
            order_index: 0,
        }
    }

    #[test]
    fn test_display_title_falls_back_to_untitled() {
        assert_eq!(note("", "x").display_title(), "Untitled");
        assert_eq!(note("Groceries", "x").display_title(), "Groceries");
    }

    #[test]
    fn test_preview_counts_chars_not_bytes() {
        let content = "é".repeat(100);
        let preview = note("t", &content).preview();
        assert_eq!(preview.chars().count(), PREVIEW_CHARS);
    }

    #[test]
    fn test_apply_partial_patch() {
        let mut n = note("old", "body");
        let patch = NotePatch {
            title: Some("new".to_string()),
            ..Default::default()
        };
        n.apply(&patch);
        assert_eq!(n.title, "new");
        assert_eq!(n.content, "body");

        let once = n.clone();
        n.apply(&patch);
        assert_eq!(n, once);
    }
}
