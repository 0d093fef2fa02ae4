//! Data Logging
//!
//! Writes estimator output rows and plays recorded logs back.

mod format;
mod playback;
mod recorder;

pub use format::LogFormat;
pub use playback::LogPlayer;
pub use recorder::{ConsoleSink, DataLogger};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::estimator::GearEstimate;
use crate::protocol::EngineSample;

/// Errors that can occur while writing log rows
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),
}

/// One output row: the sample plus the estimator's verdict
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogRow {
    /// Engine speed
    pub rpm: i32,
    /// Road speed in mph (whole mph, written with one decimal)
    pub speed_mph: f64,
    /// Estimated gear, 1-based
    pub gear: i32,
    /// Rev-match target, -1 when none
    pub rev_match_rpm: i32,
    /// Engine load %, -1 when unavailable
    pub load_percent: i32,
    /// Throttle %, -1 when unavailable
    pub throttle_percent: i32,
    /// Acquisition time in milliseconds
    pub timestamp_millis: i64,
}

impl LogRow {
    /// Combine a sample with its estimate
    pub fn new(sample: &EngineSample, estimate: &GearEstimate) -> Self {
        Self {
            rpm: sample.rpm,
            speed_mph: f64::from(sample.speed_mph),
            gear: estimate.gear,
            rev_match_rpm: estimate.rev_match_rpm,
            load_percent: sample.load_percent,
            throttle_percent: sample.throttle_percent,
            timestamp_millis: sample.timestamp_millis,
        }
    }
}

/// Destination for log rows
pub trait TelemetrySink {
    /// Accept one row; may buffer
    fn write_row(&mut self, row: &LogRow) -> Result<(), SinkError>;

    /// Push buffered rows to their destination
    fn flush(&mut self) -> Result<(), SinkError>;
}

/// Collects rows in memory
impl TelemetrySink for Vec<LogRow> {
    fn write_row(&mut self, row: &LogRow) -> Result<(), SinkError> {
        self.push(*row);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<K: TelemetrySink + ?Sized> TelemetrySink for Box<K> {
    fn write_row(&mut self, row: &LogRow) -> Result<(), SinkError> {
        (**self).write_row(row)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

/// Writes every row to both sinks
impl<A: TelemetrySink, B: TelemetrySink> TelemetrySink for (A, B) {
    fn write_row(&mut self, row: &LogRow) -> Result<(), SinkError> {
        self.0.write_row(row)?;
        self.1.write_row(row)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.0.flush()?;
        self.1.flush()
    }
}
