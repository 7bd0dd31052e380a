//! Maps upstream payloads onto canonical records.

use crate::client::{RawExperience, RawParkSchedule};
use themepark_times::model::PARK_RECORD_TYPE;
use themepark_times::{Experience, ExperienceSet, ParkRecord};

/// Strips the `;key=value` suffix from a composite upstream id.
///
/// `12345678;entityType=Attraction` → `12345678`
pub fn normalize_id(raw_id: &str) -> &str {
    raw_id.split_once(';').map_or(raw_id, |(id, _)| id)
}

/// Builds the experience set of a park from wait-time entries.
///
/// Keyed by normalized id; a later entry with the same id replaces an earlier one.
pub fn transform_experiences(entries: &[RawExperience]) -> ExperienceSet {
    entries
        .iter()
        .map(|entry| {
            let id = normalize_id(&entry.id).to_string();
            let experience = Experience {
                id: id.clone(),
                name: entry.name.clone(),
                experience_type: entry.experience_type.clone(),
                status_info: entry.wait_time.clone(),
            };
            (id, experience)
        })
        .collect()
}

/// Builds a park record holding only the entries of the latest date present.
///
/// The schedule query asks for zero days ahead, so the latest date is the
/// park's current local day. Every entry of that day is kept with its type.
pub fn transform_park_schedule(raw: RawParkSchedule) -> ParkRecord {
    let today = raw.schedules.iter().map(|entry| entry.date).max();
    let schedules = raw
        .schedules
        .into_iter()
        .filter(|entry| Some(entry.date) == today)
        .collect();

    ParkRecord {
        record_type: PARK_RECORD_TYPE.to_string(),
        id: raw.id,
        name: raw.name,
        iso8601_time_zone: raw.iso8601_time_zone,
        schedules,
    }
}
