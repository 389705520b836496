//! Rate limiting for repeated log lines
//!
//! A flaky camera can fail every frame; the recorder and the preview route
//! their per-frame warnings through a [`LogThrottler`] so one line per key per
//! interval reaches the log, with a count of what was swallowed in between.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct KeyState {
    last_logged: Instant,
    suppressed: u64,
}

/// Per-key log limiter
#[derive(Debug)]
pub struct LogThrottler {
    keys: Mutex<HashMap<String, KeyState>>,
    interval: Duration,
}

impl LogThrottler {
    pub fn new(interval: Duration) -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
            interval,
        }
    }

    pub fn with_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// Returns `Some(suppressed)` when a line for `key` may be written now,
    /// where `suppressed` is the number of calls swallowed since the last one.
    pub fn admit(&self, key: &str) -> Option<u64> {
        let now = Instant::now();
        let mut keys = self.keys.lock();
        match keys.get_mut(key) {
            Some(state) if now.duration_since(state.last_logged) < self.interval => {
                state.suppressed += 1;
                None
            }
            Some(state) => {
                let suppressed = std::mem::take(&mut state.suppressed);
                state.last_logged = now;
                Some(suppressed)
            }
            None => {
                keys.insert(
                    key.to_string(),
                    KeyState {
                        last_logged: now,
                        suppressed: 0,
                    },
                );
                Some(0)
            }
        }
    }
}

impl Default for LogThrottler {
    fn default() -> Self {
        Self::with_secs(5)
    }
}

/// `tracing::warn!` limited by a [`LogThrottler`] key
#[macro_export]
macro_rules! warn_throttled {
    ($throttler:expr, $key:expr, $($arg:tt)*) => {
        match $throttler.admit($key) {
            Some(0) => tracing::warn!($($arg)*),
            Some(n) => tracing::warn!("{} ({} similar messages suppressed)", format_args!($($arg)*), n),
            None => {}
        }
    };
}
