//! Short rolling sample history used for derivative estimation

use std::collections::VecDeque;

/// One (timestamp, rpm, speed) entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPoint {
    /// Acquisition time in milliseconds
    pub timestamp_millis: i64,
    /// Engine speed
    pub rpm: i32,
    /// Road speed in mph
    pub speed_mph: i32,
}

/// Mean per-millisecond rates of change over the fresh history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Derivatives {
    /// RPM per millisecond
    pub rpm_per_ms: f64,
    /// mph per millisecond
    pub speed_per_ms: f64,
}

/// Fixed-capacity ring buffer of recent samples
///
/// Never grows past its capacity: pushing into a full history drops the
/// oldest entry. Entries older than the freshness window, measured from
/// the newest timestamp, are evicted from the front.
#[derive(Debug, Clone)]
pub struct SampleHistory {
    points: VecDeque<HistoryPoint>,
    capacity: usize,
    freshness_ms: i64,
}

impl SampleHistory {
    /// Create an empty history; a zero capacity is raised to 1
    pub fn new(capacity: usize, freshness_ms: i64) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
            freshness_ms,
        }
    }

    /// Append a sample and evict stale entries relative to it
    pub fn record(&mut self, point: HistoryPoint) {
        if self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
        self.evict_stale(point.timestamp_millis);
    }

    /// Drop entries more than the freshness window older than `now_millis`
    pub fn evict_stale(&mut self, now_millis: i64) {
        let oldest_allowed = now_millis.saturating_sub(self.freshness_ms);
        while let Some(front) = self.points.front() {
            if front.timestamp_millis >= oldest_allowed {
                break;
            }
            self.points.pop_front();
        }
    }

    /// Mean rate of change across consecutive pairs
    ///
    /// Pairs whose timestamps do not advance are skipped. `None` when fewer
    /// than two entries are held or no pair advances in time.
    pub fn derivatives(&self) -> Option<Derivatives> {
        let mut rpm_sum = 0.0;
        let mut speed_sum = 0.0;
        let mut pairs = 0u32;

        for (prev, next) in self.points.iter().zip(self.points.iter().skip(1)) {
            let dt = next.timestamp_millis.saturating_sub(prev.timestamp_millis);
            if dt <= 0 {
                continue;
            }
            let dt = dt as f64;
            rpm_sum += f64::from(next.rpm - prev.rpm) / dt;
            speed_sum += f64::from(next.speed_mph - prev.speed_mph) / dt;
            pairs += 1;
        }

        (pairs > 0).then(|| Derivatives {
            rpm_per_ms: rpm_sum / f64::from(pairs),
            speed_per_ms: speed_sum / f64::from(pairs),
        })
    }

    /// Number of entries held
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the history is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Freshness window in milliseconds
    pub fn freshness_ms(&self) -> i64 {
        self.freshness_ms
    }

    /// Entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter()
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.points.clear();
    }
}
