//! The notes application: storage, the in-memory view, and autosave wired
//! together behind the operations the UI layer drives.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};

use crate::autosave::{AutosaveConfig, AutosaveCoordinator, AutosaveEvent, AutosaveState, SharedStore};
use crate::entity::{Note, NoteDraft};
use crate::error::{NotesError, Result};
use crate::storage::NoteGateway;
use crate::store::NoteStore;

/// Title given to notes created without one.
pub const DEFAULT_TITLE: &str = "Untitled Note";

/// One row of the note list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteSummary {
    pub id: i64,
    pub title: String,
    pub preview: String,
    pub order_index: i64,
    pub updated_at: DateTime<Utc>,
}

impl NoteSummary {
    fn from_note(note: &Note) -> Self {
        Self {
            id: note.id,
            title: note.display_title().to_string(),
            preview: note.preview(),
            order_index: note.order_index,
            updated_at: note.updated_at,
        }
    }
}

/// What the editor pane shows for the selected note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorView {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// True when the text shown is not yet stored
    pub unsaved: bool,
    pub autosave: AutosaveState,
}

/// State exposed to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub notes: Vec<NoteSummary>,
    pub total: usize,
    pub selected: Option<i64>,
    pub filter: String,
    pub editor: Option<EditorView>,
}

pub struct NotesApp<G> {
    gateway: Arc<G>,
    store: SharedStore,
    autosave: AutosaveCoordinator<G>,
}

impl<G: NoteGateway + 'static> NotesApp<G> {
    pub fn new(gateway: Arc<G>, config: AutosaveConfig) -> Self {
        let store = Arc::new(Mutex::new(NoteStore::new()));
        let autosave = AutosaveCoordinator::new(Arc::clone(&gateway), Arc::clone(&store), config);
        Self {
            gateway,
            store,
            autosave,
        }
    }

    /// Like [`NotesApp::new`], also returning the autosave outcome stream.
    pub fn with_events(
        gateway: Arc<G>,
        config: AutosaveConfig,
    ) -> (Self, mpsc::UnboundedReceiver<AutosaveEvent>) {
        let store = Arc::new(Mutex::new(NoteStore::new()));
        let (autosave, events) =
            AutosaveCoordinator::with_events(Arc::clone(&gateway), Arc::clone(&store), config);
        (
            Self {
                gateway,
                store,
                autosave,
            },
            events,
        )
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn autosave(&self) -> &AutosaveCoordinator<G> {
        &self.autosave
    }

    /// Read every note from storage and select the first one if nothing is
    /// selected yet.
    pub async fn load(&self) -> Result<()> {
        let notes = self.gateway.list_notes().await?;
        let mut store = self.store.lock().await;
        store.replace_all(notes);
        store.select_first_if_none();
        tracing::debug!(count = store.len(), "loaded notes");
        Ok(())
    }

    /// Create a note and select it. The note reaches the list only once
    /// storage has confirmed its id.
    pub async fn create(&self, title: &str, content: &str) -> Result<Note> {
        let id = self.gateway.create_note(title, content).await?;
        let note = self
            .gateway
            .get_note(id)
            .await?
            .ok_or(NotesError::NoteNotFound(id))?;

        self.store.lock().await.add(note.clone());
        self.select(Some(id)).await?;
        Ok(note)
    }

    /// Change the selected note. A pending edit of the previously selected
    /// note is written immediately rather than left to its timer.
    pub async fn select(&self, id: Option<i64>) -> Result<()> {
        let previous = {
            let store = self.store.lock().await;
            if let Some(id) = id {
                if store.get(id).is_none() {
                    return Err(NotesError::NoteNotFound(id));
                }
            }
            store.selected()
        };

        if let Some(previous) = previous.filter(|p| Some(*p) != id) {
            // A failed flush keeps the edit as a draft and is reported through
            // the autosave events; the selection still moves.
            if let Err(e) = self.autosave.flush(previous).await {
                tracing::warn!(note_id = previous, error = %e, "flush on selection change failed");
            }
        }

        self.store.lock().await.select(id);
        Ok(())
    }

    /// Record an edit of the selected note. Ignored when nothing is selected.
    pub async fn edit(&self, title: &str, content: &str) -> Result<()> {
        let Some(id) = self.store.lock().await.selected() else {
            tracing::debug!("edit with no selected note ignored");
            return Ok(());
        };
        self.autosave.edit(id, NoteDraft::new(title, content)).await
    }

    pub async fn search(&self, query: &str) {
        self.store.lock().await.set_filter(query);
    }

    /// Delete a note. Deleting an id that does not exist succeeds and leaves
    /// the view unchanged. If storage rejects the delete, a pending edit is
    /// kept and its timer restarted.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let held = self.autosave.hold(id).await;

        if let Err(e) = self.gateway.delete_note(id).await {
            if let Some(draft) = self.autosave.draft(id).await.filter(|_| held) {
                if let Err(rearm) = self.autosave.edit(id, draft).await {
                    tracing::warn!(note_id = id, error = %rearm, "could not restart autosave");
                }
            }
            return Err(e);
        }

        self.autosave.discard(id).await;
        self.store.lock().await.remove(id);
        Ok(())
    }

    /// Move a note to a new display position and reload the list.
    pub async fn reorder(&self, id: i64, order_index: i64) -> Result<()> {
        self.gateway.set_order(id, order_index).await?;
        self.reload().await
    }

    /// Renumber display order densely and reload the list.
    pub async fn compact(&self) -> Result<usize> {
        let moved = self.gateway.compact_order().await?;
        self.reload().await?;
        Ok(moved)
    }

    /// Write every pending edit now.
    pub async fn flush(&self) -> Result<usize> {
        self.autosave.flush_all().await
    }

    async fn reload(&self) -> Result<()> {
        let notes = self.gateway.list_notes().await?;
        self.store.lock().await.replace_all(notes);
        Ok(())
    }

    /// Text to show in the editor for a note: unsaved edits first, then
    /// the stored values.
    pub async fn editor_text(&self, id: i64) -> Option<NoteDraft> {
        if let Some(draft) = self.autosave.draft(id).await {
            return Some(draft);
        }
        self.store.lock().await.get(id).map(Note::draft)
    }

    pub async fn view(&self) -> ViewState {
        let (notes, total, selected, filter) = {
            let store = self.store.lock().await;
            (
                store.visible().map(NoteSummary::from_note).collect(),
                store.len(),
                store.selected_note().map(Note::draft).zip(store.selected()),
                store.filter().query().to_string(),
            )
        };

        let editor = match selected {
            Some((stored, id)) => {
                let draft = self.autosave.draft(id).await;
                let unsaved = draft.as_ref().is_some_and(|d| *d != stored);
                let shown = draft.unwrap_or(stored);
                Some(EditorView {
                    id,
                    title: shown.title,
                    content: shown.content,
                    unsaved,
                    autosave: self.autosave.state(id).await,
                })
            }
            None => None,
        };

        ViewState {
            notes,
            total,
            selected: editor.as_ref().map(|e| e.id),
            filter,
            editor,
        }
    }
}
