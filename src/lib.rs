//! Theme-park times data access.
//!
//! Canonical park and experience records, the fixed set of tracked parks and
//! the key-value store that the ETL worker writes and the query service reads.

// Store connection settings
pub mod config;

// Canonical records
pub mod model;

// Tracked parks
pub mod parks;

// Hash store over SQLite
pub mod store;

pub use model::{Experience, ExperienceSet, ParkRecord, ScheduleEntry};
pub use parks::{TrackedPark, TRACKED_PARKS};
pub use store::ParkStore;
