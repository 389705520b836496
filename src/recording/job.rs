//! One scheduled recording
//!
//! A job opens its own capture session, writes frames into a fresh file for
//! a fixed span of monotonic time, then releases the camera and finalizes the
//! file. The loop ends on elapsed time only: failed reads, a camera that has
//! stopped answering and frames the sink refuses are counted and skipped. A
//! failing sink aborts the job.

use chrono::NaiveDateTime;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::clock::Clock;
use super::naming::recording_file_name;
use super::writer::{SinkConfig, SinkFactory};
use crate::config::{AppConfig, RecordingCodec};
use crate::error::{AppError, Result};
use crate::utils::LogThrottler;
use crate::video::capture::{FrameRead, FrameSource};
use crate::warn_throttled;

/// Result of a job that did not fail outright
#[derive(Debug)]
pub enum JobOutcome {
    /// The camera could not be opened; no file was created
    CameraUnavailable,
    /// A file was written
    Completed(RecordingSummary),
}

/// What a finished recording contains
#[derive(Debug, Clone)]
pub struct RecordingSummary {
    pub path: PathBuf,
    pub started_at: NaiveDateTime,
    pub frames_written: u64,
    /// Reads that produced no frame
    pub frames_dropped: u64,
    /// Frames the sink refused (wrong size or format, corrupt JPEG)
    pub frames_rejected: u64,
    pub elapsed: Duration,
}

/// Records one clip per [`run`](RecordingJob::run)
pub struct RecordingJob {
    source: Arc<dyn FrameSource>,
    sinks: Arc<dyn SinkFactory>,
    clock: Arc<dyn Clock>,
    dir: PathBuf,
    extension: String,
    duration: Duration,
    fps: u32,
    codec: RecordingCodec,
    throttler: LogThrottler,
}

impl RecordingJob {
    pub fn new(
        config: &AppConfig,
        source: Arc<dyn FrameSource>,
        sinks: Arc<dyn SinkFactory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            sinks,
            clock,
            dir: config.recording.dir.clone(),
            extension: config.recording.extension.clone(),
            duration: config.recording.duration(),
            fps: config.camera.fps,
            codec: config.recording.codec,
            throttler: LogThrottler::with_secs(10),
        }
    }

    /// Record one clip. Blocks for the configured duration.
    pub fn run(&self) -> Result<JobOutcome> {
        let mut session = match self.source.open() {
            Ok(session) => session,
            Err(e @ AppError::DeviceUnavailable { .. }) => {
                error!("Recording skipped, could not open camera: {}", e);
                return Ok(JobOutcome::CameraUnavailable);
            }
            Err(e) => return Err(e),
        };

        let started_at = self.clock.local_now();
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(recording_file_name(started_at, &self.extension));

        let sink_config = SinkConfig {
            fps: self.fps,
            resolution: session.resolution(),
            input_format: session.format(),
            codec: self.codec,
        };
        let mut sink = self.sinks.create(&path, &sink_config)?;

        info!(
            "Recording started: {} for {}s",
            path.display(),
            self.duration.as_secs()
        );

        let mut summary = RecordingSummary {
            path,
            started_at,
            frames_written: 0,
            frames_dropped: 0,
            frames_rejected: 0,
            elapsed: Duration::ZERO,
        };
        let mut sink_error = None;
        let frame_interval = Duration::from_secs(1) / self.fps.max(1);

        let start = self.clock.monotonic();
        while self.clock.monotonic().saturating_sub(start) < self.duration {
            let frame = match session.next_frame() {
                Ok(FrameRead::Frame(frame)) => frame,
                Ok(FrameRead::EndOfStream) => {
                    summary.frames_dropped += 1;
                    warn_throttled!(
                        self.throttler,
                        "end",
                        "Camera delivered no frame, recording until {}s have passed",
                        self.duration.as_secs()
                    );
                    // A lost device answers at once; pace the retries
                    self.clock.sleep(frame_interval);
                    continue;
                }
                Err(e) => {
                    summary.frames_dropped += 1;
                    warn_throttled!(self.throttler, "read", "Skipping frame: {}", e);
                    continue;
                }
            };

            match sink.append(&frame) {
                Ok(()) => summary.frames_written += 1,
                Err(e) if e.is_per_frame() => {
                    summary.frames_rejected += 1;
                    warn_throttled!(self.throttler, "rejected", "{}", e);
                }
                Err(e) => {
                    sink_error = Some(e);
                    break;
                }
            }
        }
        summary.elapsed = self.clock.monotonic().saturating_sub(start);

        session.close();
        let finalized = sink.finalize();

        if let Some(e) = sink_error {
            error!("Recording {} aborted: {}", summary.path.display(), e);
            return Err(e);
        }
        finalized?;

        info!(
            "Recording saved: {} ({} frames, {} dropped, {} rejected, {:.1}s)",
            summary.path.display(),
            summary.frames_written,
            summary.frames_dropped,
            summary.frames_rejected,
            summary.elapsed.as_secs_f64()
        );
        Ok(JobOutcome::Completed(summary))
    }
}
