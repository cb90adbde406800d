//! Clock sources for `last_updated` timestamps
//!
//! All timestamps written by widebench are milliseconds since the Unix epoch.
//! The populator takes the clock as an injected dependency so tests can pin
//! time and downstream consumers never see a unit mismatch.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of wall-clock time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Wall clock that never goes backward.
///
/// If the system clock steps back (e.g. NTP adjustment), the previous
/// high-water mark is returned instead. Unlike a sequence generator it does
/// not force strictly increasing values: rows populated within the same
/// millisecond share a timestamp.
#[derive(Debug, Default)]
pub struct SystemClock {
    /// Largest timestamp returned so far (millis)
    high_water_ms: AtomicI64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `chrono::DateTime<Utc>` for the current clock reading.
    pub fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.now_millis()).unwrap_or_default()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        let wall = Utc::now().timestamp_millis();
        let prev = self.high_water_ms.fetch_max(wall, Ordering::AcqRel);
        wall.max(prev)
    }
}

/// Clock pinned to a single instant.
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    /// Move the clock to a new instant.
    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::Release);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::Acquire)
    }
}
