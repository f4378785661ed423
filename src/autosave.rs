//! Debounced autosave of note edits.
//!
//! Each note edited through the coordinator gets a slot that moves between
//! three states:
//!
//! - `Idle`: no timer, no write outstanding.
//! - `Pending`: an edit arrived and a quiescence timer is running. Every new
//!   edit cancels the timer and starts a fresh one, so the values written are
//!   always the most recent ones.
//! - `Writing`: a storage update is outstanding.
//!
//! Writes for one note are serialized by a per-note gate, so a timer that
//! expires while a write is in flight queues behind it and then writes
//! whatever is newest. A timer is bound to the note id it was started for,
//! not to whatever note is selected when it fires.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::config::DEFAULT_AUTOSAVE_MS;
use crate::entity::{NoteDraft, NotePatch};
use crate::error::{NotesError, Result};
use crate::storage::NoteGateway;
use crate::store::NoteStore;

/// Note store shared between the app and the coordinator.
pub type SharedStore = Arc<Mutex<NoteStore>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveConfig {
    /// Inactivity after the last edit before it is written
    pub quiescence: Duration,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            quiescence: Duration::from_millis(DEFAULT_AUTOSAVE_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AutosaveState {
    Idle,
    Pending,
    Writing,
}

/// Result of a write attempt, published for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AutosaveEvent {
    Saved {
        id: i64,
        updated_at: Option<DateTime<Utc>>,
    },
    /// The timer fired but the values matched what is already stored.
    Skipped { id: i64 },
    Failed { id: i64, error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    Written,
    Clean,
}

struct Timer {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Slot {
    /// Last values known to be in storage
    persisted: NoteDraft,
    /// Latest edit, kept until it is stored
    captured: Option<NoteDraft>,
    timer: Option<Timer>,
    writing: bool,
    gate: Arc<Mutex<()>>,
}

impl Slot {
    fn new(persisted: NoteDraft) -> Self {
        Self {
            persisted,
            captured: None,
            timer: None,
            writing: false,
            gate: Arc::new(Mutex::new(())),
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
        }
    }

    /// The captured values, if they differ from storage.
    fn dirty(&self) -> Option<NoteDraft> {
        self.captured
            .as_ref()
            .filter(|draft| **draft != self.persisted)
            .cloned()
    }
}

struct Inner<G> {
    gateway: Arc<G>,
    store: SharedStore,
    config: AutosaveConfig,
    slots: Mutex<HashMap<i64, Slot>>,
    generation: AtomicU64,
    events: Option<mpsc::UnboundedSender<AutosaveEvent>>,
}

/// Debounces edits and drives at most one storage write per note at a time.
pub struct AutosaveCoordinator<G> {
    inner: Arc<Inner<G>>,
}

impl<G> Clone for AutosaveCoordinator<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: NoteGateway + 'static> AutosaveCoordinator<G> {
    pub fn new(gateway: Arc<G>, store: SharedStore, config: AutosaveConfig) -> Self {
        Self::build(gateway, store, config, None)
    }

    /// Like [`AutosaveCoordinator::new`], also returning a receiver of write outcomes.
    pub fn with_events(
        gateway: Arc<G>,
        store: SharedStore,
        config: AutosaveConfig,
    ) -> (Self, mpsc::UnboundedReceiver<AutosaveEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::build(gateway, store, config, Some(tx)), rx)
    }

    fn build(
        gateway: Arc<G>,
        store: SharedStore,
        config: AutosaveConfig,
        events: Option<mpsc::UnboundedSender<AutosaveEvent>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                gateway,
                store,
                config,
                slots: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                events,
            }),
        }
    }

    /// Capture new values for a note and restart its quiescence timer.
    pub async fn edit(&self, id: i64, draft: NoteDraft) -> Result<()> {
        let stored = {
            let store = self.inner.store.lock().await;
            store.get(id).map(|note| note.draft())
        };

        let mut slots = self.inner.slots.lock().await;
        let slot = match slots.entry(id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let Some(persisted) = stored else {
                    return Err(NotesError::NoteNotFound(id));
                };
                entry.insert(Slot::new(persisted))
            }
        };

        slot.cancel_timer();
        slot.captured = Some(draft);

        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let quiescence = self.inner.config.quiescence;
        let coordinator = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiescence).await;
            coordinator.on_timer(id, generation).await;
        });
        slot.timer = Some(Timer { generation, handle });

        tracing::debug!(note_id = id, generation, "autosave pending");
        Ok(())
    }

    async fn on_timer(&self, id: i64, generation: u64) {
        {
            let mut slots = self.inner.slots.lock().await;
            let Some(slot) = slots.get_mut(&id) else {
                return;
            };
            match &slot.timer {
                Some(timer) if timer.generation == generation => slot.timer = None,
                _ => return,
            }
        }

        // `persist` logs failures and emits them on the event channel when
        // there is one. A coordinator built with `new` only logs them. The
        // typed text stays captured and the next edit or flush retries.
        let _ = self.persist(id).await;
    }

    /// Write a note's pending edit now instead of waiting for its timer.
    /// Waits for an in-flight write of the same note to finish first.
    pub async fn flush(&self, id: i64) -> Result<FlushOutcome> {
        {
            let mut slots = self.inner.slots.lock().await;
            match slots.get_mut(&id) {
                Some(slot) => slot.cancel_timer(),
                None => return Ok(FlushOutcome::Clean),
            }
        }
        self.persist(id).await
    }

    /// Flush every note with unsaved edits. Returns the first failure after
    /// attempting all of them.
    pub async fn flush_all(&self) -> Result<usize> {
        let ids: Vec<i64> = {
            let slots = self.inner.slots.lock().await;
            slots.keys().copied().collect()
        };

        let mut written = 0;
        let mut first_error = None;
        for id in ids {
            match self.flush(id).await {
                Ok(FlushOutcome::Written) => written += 1,
                Ok(FlushOutcome::Clean) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }

    /// Forget a note entirely, cancelling its timer. A write already in
    /// flight still completes against storage.
    pub async fn discard(&self, id: i64) {
        let mut slots = self.inner.slots.lock().await;
        if let Some(mut slot) = slots.remove(&id) {
            slot.cancel_timer();
            tracing::debug!(note_id = id, "autosave state discarded");
        }
    }

    /// Stop a note's timer but keep its captured edit. Returns whether a
    /// timer was running.
    pub async fn hold(&self, id: i64) -> bool {
        let mut slots = self.inner.slots.lock().await;
        match slots.get_mut(&id) {
            Some(slot) if slot.timer.is_some() => {
                slot.cancel_timer();
                true
            }
            _ => false,
        }
    }

    pub async fn state(&self, id: i64) -> AutosaveState {
        let slots = self.inner.slots.lock().await;
        match slots.get(&id) {
            Some(slot) if slot.writing => AutosaveState::Writing,
            Some(slot) if slot.timer.is_some() => AutosaveState::Pending,
            _ => AutosaveState::Idle,
        }
    }

    /// Values typed for a note that are not yet known to be stored.
    pub async fn draft(&self, id: i64) -> Option<NoteDraft> {
        let slots = self.inner.slots.lock().await;
        slots.get(&id).and_then(|slot| slot.captured.clone())
    }

    async fn persist(&self, id: i64) -> Result<FlushOutcome> {
        let gate = {
            let slots = self.inner.slots.lock().await;
            match slots.get(&id) {
                Some(slot) => Arc::clone(&slot.gate),
                None => return Ok(FlushOutcome::Clean),
            }
        };
        let _permit = gate.lock().await;

        let draft = {
            let mut slots = self.inner.slots.lock().await;
            let Some(slot) = slots.get_mut(&id) else {
                return Ok(FlushOutcome::Clean);
            };
            match slot.dirty() {
                Some(draft) => {
                    slot.writing = true;
                    draft
                }
                None => {
                    slot.captured = None;
                    self.emit(AutosaveEvent::Skipped { id });
                    return Ok(FlushOutcome::Clean);
                }
            }
        };

        tracing::debug!(note_id = id, "autosave writing");
        let result = self
            .inner
            .gateway
            .update_note(id, &draft.title, &draft.content)
            .await;

        let mut slots = self.inner.slots.lock().await;
        let slot = slots.get_mut(&id);
        match result {
            Ok(updated_at) => {
                if let Some(slot) = slot {
                    slot.writing = false;
                    if slot.captured.as_ref() == Some(&draft) {
                        slot.captured = None;
                    }
                    slot.persisted = draft.clone();
                }
                {
                    let mut store = self.inner.store.lock().await;
                    store.apply_partial_update(id, &NotePatch::saved(&draft, updated_at));
                }
                tracing::info!(note_id = id, "autosaved note");
                self.emit(AutosaveEvent::Saved { id, updated_at });
                Ok(FlushOutcome::Written)
            }
            Err(e) => {
                if let Some(slot) = slot {
                    slot.writing = false;
                }
                tracing::warn!(note_id = id, error = %e, "autosave failed");
                self.emit(AutosaveEvent::Failed {
                    id,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn emit(&self, event: AutosaveEvent) {
        if let Some(tx) = &self.inner.events {
            let _ = tx.send(event);
        }
    }
}
