//! Test doubles shared by unit tests.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::autosave::SharedStore;
use crate::entity::Note;
use crate::error::{NotesError, Result};
use crate::storage::{NoteGateway, SqliteGateway};
use crate::store::NoteStore;

#[derive(Debug, Clone)]
pub struct RecordedWrite {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// When the write was issued
    pub at: Instant,
}

/// In-memory SQLite gateway that records successful updates and can be told
/// to fail or to take time.
pub struct RecordingGateway {
    inner: SqliteGateway,
    writes: StdMutex<Vec<RecordedWrite>>,
    failing: AtomicBool,
    latency_ms: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self {
            inner: SqliteGateway::in_memory(),
            writes: StdMutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotesError::StorageFailure("disk unavailable".to_string()));
        }
        Ok(())
    }
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NoteGateway for RecordingGateway {
    async fn list_notes(&self) -> Result<Vec<Note>> {
        self.inner.list_notes().await
    }

    async fn get_note(&self, id: i64) -> Result<Option<Note>> {
        self.inner.get_note(id).await
    }

    async fn create_note(&self, title: &str, content: &str) -> Result<i64> {
        self.check()?;
        self.inner.create_note(title, content).await
    }

    async fn update_note(
        &self,
        id: i64,
        title: &str,
        content: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        let at = Instant::now();
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        let result = match self.check() {
            Ok(()) => self.inner.update_note(id, title, content).await,
            Err(e) => Err(e),
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if result.is_ok() {
            self.writes.lock().unwrap().push(RecordedWrite {
                id,
                title: title.to_string(),
                content: content.to_string(),
                at,
            });
        }
        result
    }

    async fn delete_note(&self, id: i64) -> Result<()> {
        self.check()?;
        self.inner.delete_note(id).await
    }

    async fn set_order(&self, id: i64, order_index: i64) -> Result<()> {
        self.check()?;
        self.inner.set_order(id, order_index).await
    }

    async fn compact_order(&self) -> Result<usize> {
        self.check()?;
        self.inner.compact_order().await
    }
}

/// Gateway pre-populated with notes and a store loaded from it.
pub async fn seeded(notes: &[(&str, &str)]) -> (Arc<RecordingGateway>, SharedStore, Vec<i64>) {
    let gateway = Arc::new(RecordingGateway::new());
    let mut ids = Vec::new();
    for (title, content) in notes {
        ids.push(gateway.create_note(title, content).await.unwrap());
    }

    let mut store = NoteStore::new();
    store.replace_all(gateway.list_notes().await.unwrap());
    (gateway, Arc::new(Mutex::new(store)), ids)
}
