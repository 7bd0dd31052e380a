//! Canonical records written by the ETL worker and served by the query service.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `type` value carried by every stored park record.
pub const PARK_RECORD_TYPE: &str = "Theme-park";

/// An attraction or entertainment item with its live status payload.
///
/// `status_info` is passed through from upstream untouched; its shape is owned
/// by the upstream API and not interpreted here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub experience_type: String,
    #[serde(rename = "statusInfo")]
    pub status_info: serde_json::Value,
}

/// All experiences of one park, keyed by experience id.
pub type ExperienceSet = BTreeMap<String, Experience>;

/// One operating window of a park on a given date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub time_zone: String,
    #[serde(rename = "type")]
    pub schedule_type: String,
}

/// Park metadata plus today's schedule entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParkRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub id: String,
    pub name: String,
    #[serde(rename = "iSO8601TimeZone")]
    pub iso8601_time_zone: String,
    pub schedules: Vec<ScheduleEntry>,
}
