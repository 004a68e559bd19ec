//! Time sources for time-bound windows.

use crate::window::TimestampMs;
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Supplies "now" in milliseconds since the UNIX epoch.
pub trait Clock: Send + Sync + Debug {
    fn now_ms(&self) -> TimestampMs;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[allow(clippy::cast_possible_truncation)]
    fn now_ms(&self) -> TimestampMs {
        // A clock before the epoch reads as negative time.
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_millis() as TimestampMs,
            Err(e) => -(e.duration().as_millis() as TimestampMs),
        }
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: TimestampMs) -> Self {
        Self { now: Arc::new(AtomicI64::new(start)) }
    }

    pub fn set(&self, now: TimestampMs) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `by` and return the new time.
    #[allow(clippy::cast_possible_truncation)]
    pub fn advance(&self, by: Duration) -> TimestampMs {
        let by = by.as_millis() as TimestampMs;
        self.now.fetch_add(by, Ordering::SeqCst) + by
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> TimestampMs {
        self.now.load(Ordering::SeqCst)
    }
}
