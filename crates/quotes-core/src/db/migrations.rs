//! Database migrations

use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;
    if !exists {
        return Ok(0);
    }

    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0)
        })
        .optional()?
        .flatten()
        .unwrap_or(0);
    Ok(version)
}

/// Migration to version 1: quotes and profiles, shaped like the hosted tables
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );
        CREATE TABLE IF NOT EXISTS quotes (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL CHECK (length(trim(content)) > 0),
            author TEXT NOT NULL CHECK (length(trim(author)) > 0),
            category TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            user_id TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_quotes_created ON quotes(created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_quotes_category ON quotes(category);
        CREATE INDEX IF NOT EXISTS idx_quotes_user ON quotes(user_id);
        CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY,
            name TEXT,
            avatar_url TEXT
        );
        INSERT INTO schema_version (version) VALUES (1);
        COMMIT;",
    )?;
    tracing::debug!("Applied local store migration v1");
    Ok(())
}
