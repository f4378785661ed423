use std::fs;
use std::path::PathBuf;

use rusqlite::{Connection, Params, Row};
use tokio::sync::{Mutex, MutexGuard, OnceCell};

use super::migrations;
use crate::error::Result;

/// Where the database lives.
#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// The single shared SQLite connection.
///
/// Nothing touches the disk until the first [`Database::session`] call; the
/// connection is then opened, migrated, and kept for the life of the value.
/// Sessions hold the connection lock, so statements issued through this
/// handle never interleave.
pub struct Database {
    location: Location,
    conn: OnceCell<Mutex<Connection>>,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
            conn: OnceCell::new(),
        }
    }

    /// Private in-memory database, mostly for tests
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            conn: OnceCell::new(),
        }
    }

    #[cfg(test)]
    fn is_open(&self) -> bool {
        self.conn.initialized()
    }

    /// Acquire exclusive use of the connection, opening it on first use.
    pub async fn session(&self) -> Result<Session<'_>> {
        let conn = self
            .conn
            .get_or_try_init(|| async { self.open().map(Mutex::new) })
            .await?;
        Ok(Session {
            conn: conn.lock().await,
        })
    }

    fn open(&self) -> Result<Connection> {
        let mut conn = match &self.location {
            Location::File(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                tracing::info!(path = %path.display(), "opening notes database");
                Connection::open(path)?
            }
            Location::Memory => Connection::open_in_memory()?,
        };
        let version = migrations::migrate(&mut conn)?;
        tracing::debug!(schema_version = version, "notes database ready");
        Ok(conn)
    }
}

/// Map a result row to a value.
pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

impl FromRow for i64 {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        row.get(0)
    }
}

/// Outcome of a write statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Executed {
    /// Rowid generated by the statement, if it inserted one
    pub last_insert_id: Option<i64>,
    pub rows_affected: usize,
}

/// Exclusive access to the connection for a sequence of statements.
pub struct Session<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl Session<'_> {
    /// Run a parameterized query and map every row.
    pub fn select<T: FromRow, P: Params>(&self, sql: &str, params: P) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params, |row| T::from_row(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Run a parameterized write statement.
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<Executed> {
        let before = self.conn.last_insert_rowid();
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows_affected = stmt.execute(params)?;
        let after = self.conn.last_insert_rowid();

        Ok(Executed {
            last_insert_id: (rows_affected > 0 && after != before).then_some(after),
            rows_affected,
        })
    }

    /// Run `f` inside a transaction, committing only if it succeeds.
    pub fn transaction<T>(&mut self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let tx = self.conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}
