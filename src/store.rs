//! In-memory projection of the notes table.
//!
//! The list only ever holds notes whose storage identity is confirmed. Title
//! and content change through [`NoteStore::apply_partial_update`] after a
//! write succeeds; nothing here reorders the list except a full
//! [`NoteStore::replace_all`].

use crate::entity::{Note, NotePatch};
use crate::search::SearchFilter;

#[derive(Debug, Default, Clone)]
pub struct NoteStore {
    notes: Vec<Note>,
    selected: Option<i64>,
    filter: SearchFilter,
    /// Indices into `notes` that pass `filter`, in list order
    visible: Vec<usize>,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list with a fresh storage read. The selection is
    /// kept if the note still exists.
    pub fn replace_all(&mut self, notes: Vec<Note>) {
        self.notes = notes;
        if let Some(id) = self.selected {
            if self.get(id).is_none() {
                self.selected = None;
            }
        }
        self.refresh();
    }

    /// Append a note whose insert has been confirmed. An existing entry with
    /// the same id is overwritten in place.
    pub fn add(&mut self, note: Note) {
        match self.notes.iter_mut().find(|n| n.id == note.id) {
            Some(existing) => *existing = note,
            None => self.notes.push(note),
        }
        self.refresh();
    }

    /// Change the selection. Selecting an id that is not in the list is
    /// ignored; returns whether the selection is now `id`.
    pub fn select(&mut self, id: Option<i64>) -> bool {
        match id {
            Some(id) if self.get(id).is_none() => false,
            _ => {
                self.selected = id;
                true
            }
        }
    }

    /// Select the first note when nothing is selected.
    pub fn select_first_if_none(&mut self) -> Option<i64> {
        if self.selected.is_none() {
            self.selected = self.notes.first().map(|n| n.id);
        }
        self.selected
    }

    /// Merge saved fields into a note. Returns false if the id is unknown.
    pub fn apply_partial_update(&mut self, id: i64, patch: &NotePatch) -> bool {
        let Some(note) = self.notes.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        note.apply(patch);
        self.refresh();
        true
    }

    /// Drop a note from the view, clearing the selection if it pointed at it.
    pub fn remove(&mut self, id: i64) -> Option<Note> {
        let pos = self.notes.iter().position(|n| n.id == id)?;
        let removed = self.notes.remove(pos);
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.refresh();
        Some(removed)
    }

    pub fn set_filter(&mut self, query: &str) {
        self.filter = SearchFilter::new(query);
        self.refresh();
    }

    fn refresh(&mut self) {
        self.visible = self
            .notes
            .iter()
            .enumerate()
            .filter(|(_, n)| self.filter.matches(n))
            .map(|(i, _)| i)
            .collect();
    }

    #[cfg(test)]
    fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Notes passing the active filter
    pub fn visible(&self) -> impl Iterator<Item = &Note> + '_ {
        self.visible.iter().map(|&i| &self.notes[i])
    }

    pub fn get(&self, id: i64) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn selected(&self) -> Option<i64> {
        self.selected
    }

    pub fn selected_note(&self) -> Option<&Note> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn filter(&self) -> &SearchFilter {
        &self.filter
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
