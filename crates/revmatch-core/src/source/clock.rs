//! Timestamp sources

use std::cell::Cell;
use std::time::Instant;

use chrono::Utc;

/// Supplies sample timestamps in milliseconds
pub trait SampleClock {
    /// Current time in milliseconds
    fn now_millis(&self) -> i64;
}

/// Wall-clock epoch captured once, advanced monotonically
///
/// System clock adjustments after startup do not make timestamps go
/// backwards.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch_millis: i64,
    started: Instant,
}

impl MonotonicClock {
    /// Start a clock at the current wall-clock time
    pub fn new() -> Self {
        Self {
            epoch_millis: Utc::now().timestamp_millis(),
            started: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleClock for MonotonicClock {
    fn now_millis(&self) -> i64 {
        let elapsed = i64::try_from(self.started.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.epoch_millis.saturating_add(elapsed)
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<i64>,
}

impl ManualClock {
    /// Start at `millis`
    pub fn new(millis: i64) -> Self {
        Self {
            now: Cell::new(millis),
        }
    }

    /// Jump to `millis`
    pub fn set(&self, millis: i64) {
        self.now.set(millis);
    }

    /// Move forward by `millis`
    pub fn advance(&self, millis: i64) {
        self.now.set(self.now.get() + millis);
    }
}

impl SampleClock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.get()
    }
}

impl<K: SampleClock + ?Sized> SampleClock for &K {
    fn now_millis(&self) -> i64 {
        (**self).now_millis()
    }
}
