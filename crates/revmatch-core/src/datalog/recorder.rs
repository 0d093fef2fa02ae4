//! Data logger / recorder
//!
//! Buffers rendered rows and writes them out in batches.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{LogFormat, LogRow, SinkError, TelemetrySink};

/// Buffered bytes that trigger a flush
pub const FLUSH_THRESHOLD_BYTES: usize = 8192;

/// Maximum time between flushes while rows keep arriving
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Buffered row writer
///
/// Rows are rendered into an in-memory buffer which is written to the
/// underlying writer once it reaches [`FLUSH_THRESHOLD_BYTES`], once
/// [`FLUSH_INTERVAL`] has passed since the last flush, on [`flush`], and
/// when the logger is dropped.
///
/// [`flush`]: TelemetrySink::flush
pub struct DataLogger<W: Write> {
    writer: W,
    format: LogFormat,
    buffer: String,
    flush_threshold: usize,
    flush_interval: Duration,
    last_flush: Instant,
    rows_written: u64,
    flush_count: u64,
}

impl DataLogger<File> {
    /// Create a log file, including missing parent directories
    pub fn create<P: AsRef<Path>>(path: P, format: LogFormat) -> Result<Self, SinkError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        info!(path = %path.display(), ?format, "logging to file");
        Ok(Self::new(file, format))
    }
}

impl<W: Write> DataLogger<W> {
    /// Wrap a writer; the format's header is buffered immediately
    pub fn new(writer: W, format: LogFormat) -> Self {
        let mut buffer = String::with_capacity(FLUSH_THRESHOLD_BYTES * 2);
        buffer.push_str(format.preamble());
        Self {
            writer,
            format,
            buffer,
            flush_threshold: FLUSH_THRESHOLD_BYTES,
            flush_interval: FLUSH_INTERVAL,
            last_flush: Instant::now(),
            rows_written: 0,
            flush_count: 0,
        }
    }

    /// Override the flush thresholds
    pub fn with_flush_policy(mut self, threshold_bytes: usize, interval: Duration) -> Self {
        self.flush_threshold = threshold_bytes;
        self.flush_interval = interval;
        self
    }

    /// Output format
    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// Rows accepted so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Number of writes to the underlying writer
    pub fn flush_count(&self) -> u64 {
        self.flush_count
    }

    /// Bytes waiting in the buffer
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// The underlying writer
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    fn write_buffer(&mut self) -> Result<(), SinkError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.writer.write_all(self.buffer.as_bytes())?;
        self.writer.flush()?;
        debug!(bytes = self.buffer.len(), "flushed log buffer");
        self.buffer.clear();
        self.last_flush = Instant::now();
        self.flush_count += 1;
        Ok(())
    }
}

impl<W: Write> TelemetrySink for DataLogger<W> {
    fn write_row(&mut self, row: &LogRow) -> Result<(), SinkError> {
        self.format.render_row(row, &mut self.buffer)?;
        self.rows_written += 1;

        if self.buffer.len() >= self.flush_threshold
            || self.last_flush.elapsed() >= self.flush_interval
        {
            self.write_buffer()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.write_buffer()
    }
}

impl<W: Write> Drop for DataLogger<W> {
    fn drop(&mut self) {
        if let Err(e) = self.write_buffer() {
            warn!("Failed to flush log on close: {}", e);
        }
    }
}

/// Reports each row through `tracing`
#[derive(Debug, Default)]
pub struct ConsoleSink {
    rows: u64,
}

impl ConsoleSink {
    /// Create a console sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows reported so far
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

impl TelemetrySink for ConsoleSink {
    fn write_row(&mut self, row: &LogRow) -> Result<(), SinkError> {
        self.rows += 1;
        info!(
            rpm = row.rpm,
            mph = row.speed_mph,
            gear = row.gear,
            rev_match = row.rev_match_rpm,
            load = row.load_percent,
            throttle = row.throttle_percent,
            time = row.timestamp_millis,
            "sample"
        );
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}
