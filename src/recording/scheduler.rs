//! Daily recording scheduler
//!
//! Each [`ScheduleEntry`] fires at most once per calendar day, on the first
//! poll at or after its time. Jobs run one after another on the blocking
//! pool; a trigger that comes due while a job is running is picked up on the
//! first poll after that job finishes.

use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::clock::Clock;
use super::job::{JobOutcome, RecordingJob};
use crate::config::{RecordingConfig, ScheduleEntry};
use crate::error::Result;

/// Something that records one clip, blocking until done
pub trait RecordingRunner: Send + Sync + 'static {
    fn run_recording(&self) -> Result<JobOutcome>;
}

impl RecordingRunner for RecordingJob {
    fn run_recording(&self) -> Result<JobOutcome> {
        self.run()
    }
}

/// Trigger times with the day each one last fired
#[derive(Debug, Clone)]
pub struct DailySchedule {
    entries: Vec<(ScheduleEntry, Option<NaiveDate>)>,
}

impl DailySchedule {
    pub fn new(entries: &[ScheduleEntry]) -> Self {
        Self {
            entries: entries.iter().map(|entry| (*entry, None)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> Option<ScheduleEntry> {
        self.entries.get(index).map(|(entry, _)| *entry)
    }

    /// Mark every entry whose time has already passed today as fired, so a
    /// start in the middle of the day does not replay earlier triggers.
    pub fn prime(&mut self, now: NaiveDateTime) {
        for index in self.due_at(now) {
            self.mark_fired(index, now.date());
        }
    }

    /// Indices of entries that should fire at `now`, earliest time first
    pub fn due_at(&self, now: NaiveDateTime) -> Vec<usize> {
        let today = now.date();
        let mut due: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, (entry, last))| entry.time() <= now.time() && *last != Some(today))
            .map(|(index, _)| index)
            .collect();
        due.sort_by_key(|&index| self.entries[index].0);
        due
    }

    pub fn mark_fired(&mut self, index: usize, day: NaiveDate) {
        if let Some((_, last)) = self.entries.get_mut(index) {
            *last = Some(day);
        }
    }
}

/// Polls the clock and runs due recordings
pub struct DailyScheduler {
    schedule: DailySchedule,
    runner: Arc<dyn RecordingRunner>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
}

impl DailyScheduler {
    pub fn new(
        config: &RecordingConfig,
        runner: Arc<dyn RecordingRunner>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut schedule = DailySchedule::new(&config.schedule);
        schedule.prime(clock.local_now());

        Self {
            schedule,
            runner,
            clock,
            poll_interval: config.poll_interval(),
        }
    }

    /// Run every recording due now, in order. Returns how many were started.
    pub async fn tick(&mut self) -> usize {
        let now = self.clock.local_now();
        let due = self.schedule.due_at(now);

        for &index in &due {
            self.schedule.mark_fired(index, now.date());
            let trigger = self
                .schedule
                .entry(index)
                .map(|entry| entry.to_string())
                .unwrap_or_default();
            info!("Scheduled recording {} starting", trigger);

            let runner = self.runner.clone();
            match tokio::task::spawn_blocking(move || runner.run_recording()).await {
                Ok(Ok(JobOutcome::Completed(summary))) => {
                    debug!(
                        "Scheduled recording {} finished: {}",
                        trigger,
                        summary.path.display()
                    );
                }
                Ok(Ok(JobOutcome::CameraUnavailable)) => {
                    warn!("Scheduled recording {} skipped, camera unavailable", trigger);
                }
                Ok(Err(e)) => error!("Scheduled recording {} failed: {}", trigger, e),
                Err(e) => error!("Scheduled recording {} panicked: {}", trigger, e),
            }
        }

        due.len()
    }

    /// Poll forever
    pub async fn run(mut self) {
        info!(
            "Recording scheduler started: {} daily triggers, polling every {}s",
            self.schedule.len(),
            self.poll_interval.as_secs()
        );
        loop {
            self.tick().await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
