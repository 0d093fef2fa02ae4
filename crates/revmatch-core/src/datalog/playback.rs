//! Log playback
//!
//! Replays a recorded CSV log as a sample source.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info};

use crate::protocol::EngineSample;
use crate::source::{AcquireError, TelemetrySource};

/// Columns in a recorded row
const COLUMN_COUNT: usize = 7;

/// Log file player
///
/// Yields recorded samples in file order with their original timestamps.
/// The recorded gear and rev-match columns are ignored; they are
/// recomputed by whichever estimator consumes the replay.
#[derive(Debug, Clone, Default)]
pub struct LogPlayer {
    samples: Vec<EngineSample>,
    position: usize,
}

impl LogPlayer {
    /// Create a player over samples already in memory
    pub fn new(samples: Vec<EngineSample>) -> Self {
        Self {
            samples,
            position: 0,
        }
    }

    /// Read a CSV log; header and malformed lines are skipped
    pub fn from_csv_reader<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut samples = Vec::new();
        let mut skipped = 0usize;

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_row(&line) {
                Some(sample) => samples.push(sample),
                None => {
                    if i > 0 {
                        debug!(line = i + 1, "skipping unparseable log row");
                    }
                    skipped += 1;
                }
            }
        }

        info!(rows = samples.len(), skipped, "loaded log for playback");
        Ok(Self::new(samples))
    }

    /// Open and read a CSV log file
    pub fn load_csv<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        Self::from_csv_reader(BufReader::new(file))
    }

    /// Get the number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the current position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Samples not yet played
    pub fn remaining(&self) -> usize {
        self.samples.len() - self.position
    }

    /// Seek to a position, clamped to the end
    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.samples.len());
    }

    /// Start over
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Every loaded sample
    pub fn samples(&self) -> &[EngineSample] {
        &self.samples
    }

    /// Advance and return the next sample
    pub fn next_sample(&mut self) -> Option<EngineSample> {
        let sample = self.samples.get(self.position).copied()?;
        self.position += 1;
        Some(sample)
    }
}

impl TelemetrySource for LogPlayer {
    fn acquire(&mut self) -> Result<Option<EngineSample>, AcquireError> {
        Ok(self.next_sample())
    }

    fn name(&self) -> &str {
        "log playback"
    }
}

/// `RPM,MPH,CurrentGear,RevMatch,Load,Throttle,Time`
fn parse_row(line: &str) -> Option<EngineSample> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != COLUMN_COUNT {
        return None;
    }

    let rpm: i32 = fields[0].parse().ok()?;
    let speed: f64 = fields[1].parse().ok()?;
    // Gear and rev-match must still be well-formed
    fields[2].parse::<i32>().ok()?;
    fields[3].parse::<i32>().ok()?;
    let load: i32 = fields[4].parse().ok()?;
    let throttle: i32 = fields[5].parse().ok()?;
    let timestamp: i64 = fields[6].parse().ok()?;

    if !speed.is_finite() {
        return None;
    }

    Some(EngineSample::new(rpm, speed as i32, timestamp).with_load_throttle(load, throttle))
}
