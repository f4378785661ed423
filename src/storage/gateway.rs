use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Row};

use super::database::{Database, FromRow};
use crate::entity::{self, Note};
use crate::error::{NotesError, Result};

const NOTE_COLUMNS: &str = "id, title, content, created_at, updated_at, order_index";

/// Typed note operations over durable storage.
///
/// Update, delete and reorder of an id that does not exist are no-ops, not
/// errors: the UI may race a delete against a pending autosave.
#[async_trait]
pub trait NoteGateway: Send + Sync {
    /// All notes by `order_index` ascending, most recently updated first on ties.
    async fn list_notes(&self) -> Result<Vec<Note>>;

    async fn get_note(&self, id: i64) -> Result<Option<Note>>;

    /// Insert a note at the end of the display order and return its id.
    async fn create_note(&self, title: &str, content: &str) -> Result<i64>;

    /// Overwrite title and content and refresh `updated_at`. Returns the
    /// timestamp written, or `None` when no row has this id.
    async fn update_note(&self, id: i64, title: &str, content: &str)
        -> Result<Option<DateTime<Utc>>>;

    async fn delete_note(&self, id: i64) -> Result<()>;

    async fn set_order(&self, id: i64, order_index: i64) -> Result<()>;

    /// Renumber `order_index` densely from 0 in list order. Returns how many
    /// rows moved.
    async fn compact_order(&self) -> Result<usize>;
}

/// [`NoteGateway`] backed by the SQLite `notes` table.
pub struct SqliteGateway {
    db: Database,
}

impl SqliteGateway {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Gateway over a database file. The file is opened on first use.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(Database::new(path))
    }

    pub fn in_memory() -> Self {
        Self::new(Database::in_memory())
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl FromRow for Note {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Note {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            created_at: timestamp_column(row, 3)?,
            updated_at: timestamp_column(row, 4)?,
            order_index: row.get(5)?,
        })
    }
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    entity::parse_timestamp(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp '{}'", raw).into(),
        )
    })
}

#[async_trait]
impl NoteGateway for SqliteGateway {
    async fn list_notes(&self) -> Result<Vec<Note>> {
        let session = self.db.session().await?;
        session.select(
            &format!(
                "SELECT {NOTE_COLUMNS} FROM notes ORDER BY order_index ASC, updated_at DESC"
            ),
            [],
        )
    }

    async fn get_note(&self, id: i64) -> Result<Option<Note>> {
        let session = self.db.session().await?;
        let mut notes: Vec<Note> =
            session.select(&format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"), [id])?;
        Ok(notes.pop())
    }

    async fn create_note(&self, title: &str, content: &str) -> Result<i64> {
        // Both statements run under one session, so creates from this process
        // cannot interleave between the max read and the insert.
        let session = self.db.session().await?;

        let max: Vec<i64> =
            session.select("SELECT COALESCE(MAX(order_index), -1) FROM notes", [])?;
        let order_index = max.first().copied().unwrap_or(-1) + 1;

        let now = entity::format_timestamp(&entity::now());
        let executed = session.execute(
            "INSERT INTO notes (title, content, created_at, updated_at, order_index)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![title, content, now, now, order_index],
        )?;

        let id = executed
            .last_insert_id
            .ok_or_else(NotesError::missing_insert_id)?;
        tracing::info!(note_id = id, order_index, "created note");
        Ok(id)
    }

    async fn update_note(
        &self,
        id: i64,
        title: &str,
        content: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        let session = self.db.session().await?;
        let now = entity::now();
        let executed = session.execute(
            "UPDATE notes SET title = ?1, content = ?2, updated_at = ?3 WHERE id = ?4",
            params![title, content, entity::format_timestamp(&now), id],
        )?;

        if executed.rows_affected == 0 {
            tracing::warn!(note_id = id, "update matched no note");
            return Ok(None);
        }
        Ok(Some(now))
    }

    async fn delete_note(&self, id: i64) -> Result<()> {
        let session = self.db.session().await?;
        let executed = session.execute("DELETE FROM notes WHERE id = ?1", [id])?;
        tracing::debug!(note_id = id, deleted = executed.rows_affected, "delete note");
        Ok(())
    }

    async fn set_order(&self, id: i64, order_index: i64) -> Result<()> {
        let session = self.db.session().await?;
        session.execute(
            "UPDATE notes SET order_index = ?1 WHERE id = ?2",
            params![order_index, id],
        )?;
        Ok(())
    }

    async fn compact_order(&self) -> Result<usize> {
        let mut session = self.db.session().await?;
        let moved = session.transaction(|tx| {
            let current: Vec<(i64, i64)> = tx
                .prepare("SELECT id, order_index FROM notes ORDER BY order_index ASC, updated_at DESC")?
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<_, _>>()?;

            let mut update = tx.prepare("UPDATE notes SET order_index = ?1 WHERE id = ?2")?;
            let mut moved = 0;
            for (position, (id, order_index)) in (0_i64..).zip(current) {
                if order_index != position {
                    update.execute(params![position, id])?;
                    moved += 1;
                }
            }
            Ok(moved)
        })?;

        tracing::info!(moved, "compacted note order");
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_list_empty() {
        let gateway = SqliteGateway::in_memory();
        assert!(gateway.list_notes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_round_trip() {
        let gateway = SqliteGateway::in_memory();
        let first = gateway.create_note("First", "").await.unwrap();
        let id = gateway.create_note("T", "B").await.unwrap();
        assert_ne!(first, id);

        let notes = gateway.list_notes().await.unwrap();
        let note = notes.iter().find(|n| n.id == id).unwrap();
        assert_eq!(note.title, "T");
        assert_eq!(note.content, "B");
        assert_eq!(note.order_index, 1);
        assert_eq!(note.created_at, note.updated_at);
    }

    #[tokio::test]
    async fn test_order_index_strictly_increasing() {
        let gateway = SqliteGateway::in_memory();
        for i in 0..5 {
            gateway.create_note(&format!("n{i}"), "").await.unwrap();
        }
        let indices: Vec<i64> = gateway
            .list_notes()
            .await
            .unwrap()
            .iter()
            .map(|n| n.order_index)
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_order_continues_after_max_not_count() {
        let gateway = SqliteGateway::in_memory();
        let a = gateway.create_note("a", "").await.unwrap();
        gateway.create_note("b", "").await.unwrap();
        gateway.set_order(a, 10).await.unwrap();

        let c = gateway.create_note("c", "").await.unwrap();
        let note = gateway.get_note(c).await.unwrap().unwrap();
        assert_eq!(note.order_index, 11);
    }

    #[tokio::test]
    async fn test_update_refreshes_updated_at() {
        let gateway = SqliteGateway::in_memory();
        let id = gateway.create_note("t", "b").await.unwrap();
        let before = gateway.get_note(id).await.unwrap().unwrap();

        let written = gateway.update_note(id, "t2", "b2").await.unwrap().unwrap();
        let after = gateway.get_note(id).await.unwrap().unwrap();

        assert_eq!(after.title, "t2");
        assert_eq!(after.content, "b2");
        assert_eq!(after.updated_at, written);
        assert!(after.updated_at >= after.created_at);
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_are_noops() {
        let gateway = SqliteGateway::in_memory();
        assert_eq!(gateway.update_note(99, "x", "y").await.unwrap(), None);
        gateway.delete_note(99).await.unwrap();
        gateway.set_order(99, 3).await.unwrap();
        assert!(gateway.list_notes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_row() {
        let gateway = SqliteGateway::in_memory();
        let id = gateway.create_note("t", "b").await.unwrap();
        gateway.delete_note(id).await.unwrap();
        assert!(gateway.get_note(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ties_break_by_updated_at_desc() {
        let gateway = SqliteGateway::in_memory();
        let a = gateway.create_note("a", "").await.unwrap();
        let b = gateway.create_note("b", "").await.unwrap();
        gateway.set_order(b, 0).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        gateway.update_note(a, "a", "newer").await.unwrap();

        let ids: Vec<i64> = gateway.list_notes().await.unwrap().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[tokio::test]
    async fn test_compact_order() {
        let gateway = SqliteGateway::in_memory();
        let a = gateway.create_note("a", "").await.unwrap();
        let b = gateway.create_note("b", "").await.unwrap();
        let c = gateway.create_note("c", "").await.unwrap();
        gateway.set_order(a, 7).await.unwrap();
        gateway.set_order(b, 3).await.unwrap();

        let moved = gateway.compact_order().await.unwrap();
        assert_eq!(moved, 3);

        let order: Vec<(i64, i64)> = gateway
            .list_notes()
            .await
            .unwrap()
            .iter()
            .map(|n| (n.id, n.order_index))
            .collect();
        assert_eq!(order, vec![(c, 0), (b, 1), (a, 2)]);

        assert_eq!(gateway.compact_order().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reads_existing_data_file_timestamps() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("mdnotes.db");
        {
            let conn = rusqlite::Connection::open(&path).unwrap();
            conn.execute_batch(crate::storage::migrations::MIGRATIONS[0].sql)
                .unwrap();
            conn.execute(
                "INSERT INTO notes (title, content, created_at, updated_at, order_index)
                 VALUES ('old', 'body', '2024-03-01T12:00:00.000Z', '2024-03-02T08:30:00.250Z', 0)",
                [],
            )
            .unwrap();
        }

        let gateway = SqliteGateway::open(&path);
        let notes = gateway.list_notes().await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(
            entity::format_timestamp(&notes[0].updated_at),
            "2024-03-02T08:30:00.250Z"
        );
    }

    #[tokio::test]
    async fn test_unparseable_timestamp_is_storage_failure() {
        let gateway = SqliteGateway::in_memory();
        let id = gateway.create_note("t", "c").await.unwrap();
        {
            let session = gateway.database().session().await.unwrap();
            session
                .execute(
                    "UPDATE notes SET updated_at = 'yesterday' WHERE id = ?1",
                    [id],
                )
                .unwrap();
        }

        let err = gateway.get_note(id).await.unwrap_err();
        assert!(matches!(err, NotesError::StorageFailure(_)));
        assert!(err.to_string().contains("invalid timestamp 'yesterday'"));
    }
}
