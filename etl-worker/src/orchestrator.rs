//! Sync orchestrator: fetch → transform → load for every tracked park.

use crate::client::{RawExperience, RawParkSchedule};
use crate::scheduler::{JobRunner, SyncJob};
use crate::transformer::{transform_experiences, transform_park_schedule};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use themepark_times::{ExperienceSet, ParkRecord, ParkStore, TrackedPark, TRACKED_PARKS};
use tracing::{error, info, warn};

/// Source of raw park data. `None` means no data this cycle.
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    async fn fetch_experiences(&self, park_id: &str) -> Option<Vec<RawExperience>>;

    async fn fetch_park_schedule(&self, park_id: &str) -> Option<RawParkSchedule>;
}

/// Destination for transformed records.
pub trait RecordSink: Send + Sync {
    /// Atomically replaces all experiences of a park. Never called with an empty set.
    fn replace_experiences(&self, park_id: &str, experiences: &ExperienceSet) -> Result<()>;

    fn put_park(&self, park_id: &str, record: &ParkRecord) -> Result<()>;
}

impl RecordSink for ParkStore {
    fn replace_experiences(&self, park_id: &str, experiences: &ExperienceSet) -> Result<()> {
        ParkStore::replace_experiences(self, park_id, experiences)
    }

    fn put_park(&self, park_id: &str, record: &ParkRecord) -> Result<()> {
        ParkStore::put_park(self, park_id, record)
    }
}

/// Outcome of one pass over the tracked parks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Parks whose records were written
    pub loaded: usize,
    /// Parks with no upstream data this cycle
    pub skipped: usize,
    /// Parks whose store write failed
    pub failed: usize,
}

/// Drives one sync cycle per job kind.
///
/// Parks are visited in order, one at a time. A park that yields no data or
/// fails to load is logged and counted, and the cycle moves on.
pub struct SyncOrchestrator {
    source: Arc<dyn UpstreamSource>,
    sink: Arc<dyn RecordSink>,
    parks: &'static [TrackedPark],
}

impl SyncOrchestrator {
    /// Creates an orchestrator over the tracked parks.
    pub fn new(source: Arc<dyn UpstreamSource>, sink: Arc<dyn RecordSink>) -> Self {
        Self::with_parks(source, sink, TRACKED_PARKS)
    }

    pub fn with_parks(
        source: Arc<dyn UpstreamSource>,
        sink: Arc<dyn RecordSink>,
        parks: &'static [TrackedPark],
    ) -> Self {
        Self {
            source,
            sink,
            parks,
        }
    }

    /// Refreshes the experiences of every park.
    ///
    /// An absent or empty fetch leaves the park's stored experiences as they are.
    pub async fn sync_experiences(&self) -> CycleReport {
        let mut report = CycleReport::default();

        for park in self.parks {
            let entries = match self.source.fetch_experiences(park.id).await {
                Some(entries) if !entries.is_empty() => entries,
                _ => {
                    warn!(
                        park_id = %park.id,
                        park = %park.name,
                        "No experience data, keeping stored set"
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            let experiences = transform_experiences(&entries);
            match self.sink.replace_experiences(park.id, &experiences) {
                Ok(()) => report.loaded += 1,
                Err(e) => {
                    error!(
                        park_id = %park.id,
                        error = %format!("{:#}", e),
                        "Failed to store experiences"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            loaded = report.loaded,
            skipped = report.skipped,
            failed = report.failed,
            "Experience sync cycle finished"
        );
        report
    }

    /// Refreshes the schedule record of every park.
    ///
    /// An absent fetch, or one without schedule entries, leaves the park's
    /// stored record as it is.
    pub async fn sync_parks(&self) -> CycleReport {
        let mut report = CycleReport::default();

        for park in self.parks {
            let record = match self.source.fetch_park_schedule(park.id).await {
                Some(raw) if !raw.schedules.is_empty() => transform_park_schedule(raw),
                _ => {
                    warn!(
                        park_id = %park.id,
                        park = %park.name,
                        "No schedule data, keeping stored record"
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            match self.sink.put_park(park.id, &record) {
                Ok(()) => report.loaded += 1,
                Err(e) => {
                    error!(
                        park_id = %park.id,
                        error = %format!("{:#}", e),
                        "Failed to store park record"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            loaded = report.loaded,
            skipped = report.skipped,
            failed = report.failed,
            "Schedule sync cycle finished"
        );
        report
    }
}

#[async_trait]
impl JobRunner for SyncOrchestrator {
    async fn run(&self, job: SyncJob) {
        match job {
            SyncJob::Experiences => {
                self.sync_experiences().await;
            }
            SyncJob::Schedules => {
                self.sync_parks().await;
            }
        }
    }
}
