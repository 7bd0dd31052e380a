//! Recurring sync jobs driven from a single loop.
//!
//! Jobs wait in a min-heap ordered by next due time. The loop pops the earliest
//! job, sleeps until it is due, runs it to completion and re-arms it at
//! `now + interval`. Cadence is therefore `interval + run duration`, and two
//! jobs never run at the same time.

use async_trait::async_trait;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

/// Re-arm delay used when `now + interval` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// The two kinds of sync cycle.
///
/// Ordering breaks ties between jobs due at the same instant: experiences first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SyncJob {
    Experiences,
    Schedules,
}

/// Runs one cycle of a job. Failures are handled inside; nothing is returned.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: SyncJob);
}

pub struct Scheduler {
    runner: Arc<dyn JobRunner>,
    experiences_interval: Duration,
    schedules_interval: Duration,
    queue: BinaryHeap<Reverse<(Instant, SyncJob)>>,
}

impl Scheduler {
    /// Creates a scheduler with both jobs due immediately.
    pub fn new(
        runner: Arc<dyn JobRunner>,
        experiences_interval: Duration,
        schedules_interval: Duration,
    ) -> Self {
        let now = Instant::now();
        let mut queue = BinaryHeap::new();
        queue.push(Reverse((now, SyncJob::Experiences)));
        queue.push(Reverse((now, SyncJob::Schedules)));

        Self {
            runner,
            experiences_interval,
            schedules_interval,
            queue,
        }
    }

    fn interval(&self, job: SyncJob) -> Duration {
        match job {
            SyncJob::Experiences => self.experiences_interval,
            SyncJob::Schedules => self.schedules_interval,
        }
    }

    /// Waits for the earliest due job, runs it and re-arms it.
    ///
    /// Returns the job that ran.
    pub async fn run_next(&mut self) -> Option<SyncJob> {
        let Reverse((due, job)) = self.queue.pop()?;
        sleep_until(due).await;

        debug!(?job, "Running sync job");
        self.runner.run(job).await;

        let now = Instant::now();
        let next_due = now.checked_add(self.interval(job)).unwrap_or(now + FAR_FUTURE);
        self.queue.push(Reverse((next_due, job)));
        debug!(
            ?job,
            next_in_secs = self.interval(job).as_secs(),
            "Sync job re-armed"
        );

        Some(job)
    }

    /// Runs jobs until the surrounding task is dropped.
    pub async fn run(mut self) {
        info!(
            experiences_interval_secs = self.experiences_interval.as_secs(),
            schedules_interval_secs = self.schedules_interval.as_secs(),
            "Scheduler started"
        );

        while self.run_next().await.is_some() {}
    }
}
