//! Park and experience records on top of the hash primitives.

use super::{experiences_key, hash, to_sorted_json, PARKS_KEY};
use crate::config::StoreConfig;
use crate::model::{Experience, ExperienceSet, ParkRecord};
use anyhow::{Context, Result};
use rusqlite::{Connection, TransactionBehavior};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Park data store backed by a SQLite file.
///
/// Holds only the location of the database. Every operation acquires a fresh
/// connection and releases it when the operation returns, error or not, so no
/// connection is shared between calls.
///
/// # Schema
/// ```sql
/// CREATE TABLE hashes (
///     key   TEXT NOT NULL,   -- "parks" or "{park_id}:experiences"
///     field TEXT NOT NULL,   -- park id or experience id
///     value TEXT NOT NULL,   -- JSON with sorted keys
///     PRIMARY KEY (key, field)
/// );
/// ```
#[derive(Debug, Clone)]
pub struct ParkStore {
    db_path: PathBuf,
    busy_timeout: Duration,
}

impl ParkStore {
    /// Opens (or creates) the store and ensures the schema exists.
    ///
    /// Switches the database to WAL mode so the query service can keep reading
    /// while a replacement transaction is in progress.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let store = Self {
            db_path: PathBuf::from(&config.db_path),
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
        };

        let conn = store.connect()?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })
        .context("Failed to enable WAL journal mode")?;
        hash::create_table(&conn)?;

        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path).with_context(|| {
            format!("Failed to open store at {}", self.db_path.display())
        })?;
        conn.busy_timeout(self.busy_timeout)
            .context("Failed to set busy timeout")?;
        Ok(conn)
    }

    /// Replaces every experience of `park_id` with `experiences`.
    ///
    /// The old hash is deleted and the new entries inserted inside one
    /// immediate transaction. Any failure rolls the whole replacement back,
    /// leaving the previous set in place.
    pub fn replace_experiences(&self, park_id: &str, experiences: &ExperienceSet) -> Result<()> {
        let key = experiences_key(park_id);
        let mut conn = self.connect()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("Failed to begin transaction")?;

        let removed = swap_experiences(&tx, &key, experiences)?;

        tx.commit()
            .with_context(|| format!("Failed to commit experiences for park {}", park_id))?;

        debug!(
            park_id = %park_id,
            removed = removed,
            inserted = experiences.len(),
            "Replaced experiences"
        );
        Ok(())
    }

    /// Stores `record` as the park record for `park_id` (upsert).
    pub fn put_park(&self, park_id: &str, record: &ParkRecord) -> Result<()> {
        let value = to_sorted_json(record)?;
        let conn = self.connect()?;
        hash::hset(&conn, PARKS_KEY, park_id, &value)?;

        debug!(park_id = %park_id, schedules = record.schedules.len(), "Stored park record");
        Ok(())
    }

    /// Reads one experience of a park.
    pub fn read_experience(
        &self,
        park_id: &str,
        experience_id: &str,
    ) -> Result<Option<Experience>> {
        let conn = self.connect()?;
        hash::hget(&conn, &experiences_key(park_id), experience_id)?
            .map(|value| decode(&value))
            .transpose()
    }

    /// Reads all experiences of a park, ordered by experience id.
    ///
    /// An unknown park yields an empty list.
    pub fn read_experiences(&self, park_id: &str) -> Result<Vec<Experience>> {
        let conn = self.connect()?;
        hash::hgetall(&conn, &experiences_key(park_id))?
            .iter()
            .map(|(_, value)| decode(value))
            .collect()
    }

    /// Reads the record of one park.
    pub fn read_park(&self, park_id: &str) -> Result<Option<ParkRecord>> {
        let conn = self.connect()?;
        hash::hget(&conn, PARKS_KEY, park_id)?
            .map(|value| decode(&value))
            .transpose()
    }

    /// Reads every stored park record, ordered by park id.
    pub fn read_parks(&self) -> Result<Vec<ParkRecord>> {
        let conn = self.connect()?;
        hash::hgetall(&conn, PARKS_KEY)?
            .iter()
            .map(|(_, value)| decode(value))
            .collect()
    }
}

/// Deletes the hash at `key` and inserts `experiences`. Returns the number of
/// fields removed. Must run inside a transaction.
fn swap_experiences(conn: &Connection, key: &str, experiences: &ExperienceSet) -> Result<usize> {
    let removed = hash::delete(conn, key)?;
    for (experience_id, experience) in experiences {
        let value = to_sorted_json(experience)?;
        hash::hset(conn, key, experience_id, &value)?;
    }
    Ok(removed)
}

fn decode<T: serde::de::DeserializeOwned>(value: &str) -> Result<T> {
    serde_json::from_str(value).context("Failed to decode stored record")
}
