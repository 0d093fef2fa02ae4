//! Sample sources
//!
//! Anything that yields [`EngineSample`]s: a live ELM327 adapter, the demo
//! simulator, or a recorded log.

mod clock;

pub use clock::{ManualClock, MonotonicClock, SampleClock};

use std::io::{Read, Write};

use thiserror::Error;
use tracing::debug;

use crate::protocol::{decode, DecodeFault, Elm327, EngineSample, ProtocolError};

/// Failure to produce one sample
#[derive(Error, Debug)]
pub enum AcquireError {
    /// The response was received but could not be decoded; the next
    /// cycle may succeed
    #[error("Decode fault: {0}")]
    Decode(#[from] DecodeFault),

    /// The link to the vehicle failed
    #[error("Transport error: {0}")]
    Transport(#[from] ProtocolError),
}

/// A producer of engine samples
pub trait TelemetrySource {
    /// Produce the next sample
    ///
    /// `Ok(None)` means the source is exhausted.
    fn acquire(&mut self) -> Result<Option<EngineSample>, AcquireError>;

    /// Short name for log messages
    fn name(&self) -> &str {
        "source"
    }
}

impl<S: TelemetrySource + ?Sized> TelemetrySource for Box<S> {
    fn acquire(&mut self) -> Result<Option<EngineSample>, AcquireError> {
        (**self).acquire()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Live source polling an ELM327 adapter
pub struct Elm327Source<C = Box<dyn serialport::SerialPort>, K = MonotonicClock> {
    adapter: Elm327<C>,
    clock: K,
}

impl<C: Read + Write, K: SampleClock> Elm327Source<C, K> {
    /// Poll an initialized adapter, stamping samples with `clock`
    pub fn new(adapter: Elm327<C>, clock: K) -> Self {
        Self { adapter, clock }
    }

    /// The adapter
    pub fn adapter(&mut self) -> &mut Elm327<C> {
        &mut self.adapter
    }

    /// Release the adapter
    pub fn into_inner(self) -> Elm327<C> {
        self.adapter
    }
}

impl<C: Read + Write, K: SampleClock> TelemetrySource for Elm327Source<C, K> {
    fn acquire(&mut self) -> Result<Option<EngineSample>, AcquireError> {
        let raw = self.adapter.request_engine_data()?;
        let timestamp = self.clock.now_millis();
        debug!(response = %raw.trim(), timestamp, "engine data response");
        Ok(Some(decode(&raw, timestamp)?))
    }

    fn name(&self) -> &str {
        "ELM327"
    }
}
