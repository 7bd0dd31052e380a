//! Key-value store shared by the ETL worker and the query service.
//!
//! Data is laid out as named hashes (a key holding field → value pairs), persisted
//! in SQLite so every write can be made atomic with a transaction.
//!
//! # Layout
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  "{park_id}:experiences"                 │
//! │    field: experience id                  │
//! │    value: Experience as sorted JSON      │
//! └─────────────────────────────────────────┘
//! ┌─────────────────────────────────────────┐
//! │  "parks"                                 │
//! │    field: park id                        │
//! │    value: ParkRecord as sorted JSON      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use themepark_times::config::StoreConfig;
//! use themepark_times::store::ParkStore;
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = ParkStore::open(&StoreConfig::default())?;
//!
//! for park in store.read_parks()? {
//!     println!("{} ({} schedule entries)", park.name, park.schedules.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Guarantees
//!
//! - Replacing a park's experiences deletes and re-inserts the whole hash inside one
//!   transaction; readers see either the old set or the new set.
//! - Each operation opens its own connection and drops it before returning.

use anyhow::{Context, Result};
use serde::Serialize;

mod hash;
mod storage;

pub use storage::ParkStore;

/// Hash holding every park record, one field per park id.
pub const PARKS_KEY: &str = "parks";

/// Hash key holding the experiences of one park.
pub fn experiences_key(park_id: &str) -> String {
    format!("{}:experiences", park_id)
}

/// Serializes `value` as JSON with object keys in lexicographic order.
///
/// Goes through `serde_json::Value`, whose map is ordered by key, so nested
/// pass-through payloads are sorted as well.
pub fn to_sorted_json<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value).context("Failed to convert record to JSON")?;
    serde_json::to_string(&value).context("Failed to serialize record")
}
