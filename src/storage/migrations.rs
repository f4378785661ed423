//! Versioned schema migrations, tracked with `PRAGMA user_version`.

use rusqlite::Connection;

use crate::error::Result;

pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

/// Applied in order. Every statement must be safe against a database that
/// already holds the `notes` table from an earlier release.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create initial schema",
        sql: "CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                order_index INTEGER NOT NULL DEFAULT 0
            )",
    },
    Migration {
        version: 2,
        description: "index notes by display order",
        sql: "CREATE INDEX IF NOT EXISTS idx_notes_order ON notes(order_index)",
    },
];

/// Bring the schema up to date. Returns the resulting schema version.
pub fn migrate(conn: &mut Connection) -> Result<i64> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    let mut version = current;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
        tx.commit()?;

        tracing::info!(
            version = migration.version,
            description = migration.description,
            "applied schema migration"
        );
        version = migration.version;
    }

    Ok(version)
}
