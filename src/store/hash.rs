//! Hash primitives over a single SQLite table.
//!
//! Every function takes a `Connection`, so the same calls work on a plain
//! connection or inside a `Transaction` (which derefs to one).

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

/// Creates the `hashes` table if it does not already exist.
pub fn create_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS hashes (
            key   TEXT NOT NULL,
            field TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (key, field)
        );",
    )
    .context("Failed to create hashes table")?;
    Ok(())
}

/// Sets `field` of hash `key`, replacing any previous value.
pub fn hset(conn: &Connection, key: &str, field: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO hashes (key, field, value) VALUES (?1, ?2, ?3)
         ON CONFLICT(key, field) DO UPDATE SET value = excluded.value",
        params![key, field, value],
    )
    .with_context(|| format!("Failed to set {}[{}]", key, field))?;
    Ok(())
}

/// Returns the value of `field` in hash `key`.
pub fn hget(conn: &Connection, key: &str, field: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM hashes WHERE key = ?1 AND field = ?2",
        params![key, field],
        |row| row.get(0),
    )
    .optional()
    .with_context(|| format!("Failed to read {}[{}]", key, field))
}

/// Returns every `(field, value)` pair of hash `key`, ordered by field.
pub fn hgetall(conn: &Connection, key: &str) -> Result<Vec<(String, String)>> {
    let mut stmt = conn
        .prepare("SELECT field, value FROM hashes WHERE key = ?1 ORDER BY field")
        .context("Failed to prepare query")?;

    let pairs = stmt
        .query_map(params![key], |row| Ok((row.get(0)?, row.get(1)?)))
        .context("Failed to execute query")?
        .collect::<Result<Vec<(String, String)>, _>>()
        .with_context(|| format!("Failed to read hash {}", key))?;

    Ok(pairs)
}

/// Deletes hash `key` entirely. Returns the number of fields removed.
pub fn delete(conn: &Connection, key: &str) -> Result<usize> {
    conn.execute("DELETE FROM hashes WHERE key = ?1", params![key])
        .with_context(|| format!("Failed to delete hash {}", key))
}
