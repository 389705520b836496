//! Scheduled recording
//!
//! - [`scheduler`] fires [`job`]s at fixed times of day
//! - [`job`] captures one clip into a [`writer`] sink
//! - [`catalog`] lists what has been recorded

pub mod catalog;
pub mod clock;
pub mod job;
pub mod naming;
pub mod scheduler;
pub mod writer;

pub use catalog::{RecordingCatalog, RecordingEntry};
pub use clock::{Clock, SystemClock};
pub use job::{JobOutcome, RecordingJob, RecordingSummary};
pub use scheduler::{DailySchedule, DailyScheduler, RecordingRunner};
pub use writer::{FfmpegSinkFactory, FfmpegWriter, SinkConfig, SinkFactory, VideoSink};
