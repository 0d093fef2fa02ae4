//! Acquisition loop
//!
//! Pulls samples from a source, feeds the estimator, and writes one row per
//! estimated sample until the source ends, a sample limit is reached, or the
//! run is cancelled.

use std::thread;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::datalog::{LogRow, SinkError, TelemetrySink};
use crate::estimator::GearEstimator;
use crate::protocol::ProtocolError;
use crate::source::{AcquireError, TelemetrySource};

/// Errors that end a run early
#[derive(Error, Debug)]
pub enum LoopError {
    #[error("Transport failure: {0}")]
    Transport(#[from] ProtocolError),

    #[error("Log sink failure: {0}")]
    Sink(#[from] SinkError),
}

/// Loop settings
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Stop after this many logged rows
    pub max_samples: Option<u64>,
    /// Pause between cycles; live adapters pace themselves
    pub poll_interval: Option<Duration>,
}

/// What happened during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Samples taken from the source, including faulted and skipped ones
    pub samples_acquired: u64,
    /// Rows handed to the sink
    pub rows_logged: u64,
    /// Samples without positive rpm or non-negative speed
    pub samples_skipped: u64,
    /// Responses that failed to decode
    pub decode_faults: u64,
    /// Whether the run stopped because of cancellation
    pub cancelled: bool,
}

/// Run the acquisition loop
///
/// Decode faults are counted and the cycle skipped. Transport and sink
/// failures stop the loop. The sink is flushed on every exit path.
pub fn run<S, K>(
    source: &mut S,
    estimator: &mut GearEstimator,
    sink: &mut K,
    cancel: &CancellationToken,
    options: &RunOptions,
) -> Result<RunSummary, LoopError>
where
    S: TelemetrySource + ?Sized,
    K: TelemetrySink + ?Sized,
{
    info!(source = source.name(), max_samples = ?options.max_samples, "acquisition started");

    let outcome = drive(source, estimator, sink, cancel, options);
    let flushed = sink.flush();

    let summary = outcome?;
    flushed?;

    info!(
        acquired = summary.samples_acquired,
        logged = summary.rows_logged,
        skipped = summary.samples_skipped,
        decode_faults = summary.decode_faults,
        cancelled = summary.cancelled,
        "acquisition finished"
    );
    Ok(summary)
}

fn drive<S, K>(
    source: &mut S,
    estimator: &mut GearEstimator,
    sink: &mut K,
    cancel: &CancellationToken,
    options: &RunOptions,
) -> Result<RunSummary, LoopError>
where
    S: TelemetrySource + ?Sized,
    K: TelemetrySink + ?Sized,
{
    let mut summary = RunSummary::default();

    loop {
        if cancel.is_cancelled() {
            summary.cancelled = true;
            break;
        }
        if options
            .max_samples
            .is_some_and(|limit| summary.rows_logged >= limit)
        {
            break;
        }

        let sample = match source.acquire() {
            Ok(Some(sample)) => {
                summary.samples_acquired += 1;
                sample
            }
            Ok(None) => {
                debug!("source exhausted");
                break;
            }
            Err(AcquireError::Decode(fault)) => {
                summary.samples_acquired += 1;
                summary.decode_faults += 1;
                debug!("skipping cycle: {}", fault);
                pause(options);
                continue;
            }
            Err(AcquireError::Transport(e)) => {
                warn!("transport failed: {}", e);
                return Err(LoopError::Transport(e));
            }
        };

        if !sample.is_estimable() {
            summary.samples_skipped += 1;
            debug!(rpm = sample.rpm, speed = sample.speed_mph, "sample not estimable");
            pause(options);
            continue;
        }

        let estimate = estimator.update(sample.rpm, sample.speed_mph, sample.timestamp_millis);
        sink.write_row(&LogRow::new(&sample, &estimate))?;
        summary.rows_logged += 1;

        pause(options);
    }

    Ok(summary)
}

fn pause(options: &RunOptions) {
    if let Some(interval) = options.poll_interval {
        thread::sleep(interval);
    }
}
