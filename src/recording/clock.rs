//! Time sources for the recorder and the scheduler

use chrono::{Local, NaiveDateTime};
use std::time::{Duration, Instant};

/// Wall clock plus a monotonic clock
pub trait Clock: Send + Sync {
    /// Local wall clock time, used for file names and schedule matching
    fn local_now(&self) -> NaiveDateTime;

    /// Monotonic time since an arbitrary origin, used for measuring durations
    fn monotonic(&self) -> Duration;

    /// Block the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// The real clock
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn local_now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
