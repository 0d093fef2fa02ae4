//! # RevMatch Core Library
//!
//! Engine telemetry interpretation for manual-transmission vehicles.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - ELM327 adapter communication and OBD-II response decoding
//! - Gear estimation with clutch-in (HOLD) detection
//! - Rev-match targets for the next lower gear
//! - Gear profile configuration files
//! - Buffered CSV / JSON-lines logging and log playback
//! - A simulated drive cycle for running without a vehicle
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use revmatch_core::prelude::*;
//!
//! let profile = Arc::new(load_gear_profile("gearbox.cfg")?);
//! let adapter = Elm327::open("/dev/ttyUSB0", 38400)?;
//! let mut source = Elm327Source::new(adapter, MonotonicClock::new());
//! let mut estimator = GearEstimator::new(profile);
//! let mut sink = DataLogger::create("logs/drive.csv", LogFormat::Csv)?;
//!
//! let summary = run(&mut source, &mut estimator, &mut sink, &cancel, &RunOptions::default())?;
//! println!("{} rows logged", summary.rows_logged);
//! ```

pub mod config;
pub mod datalog;
pub mod demo;
pub mod estimator;
pub mod protocol;
pub mod runner;
pub mod source;
pub mod unit_conversion;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{load_gear_profile, parse_gear_profile, ConfigError};
    pub use crate::datalog::{ConsoleSink, DataLogger, LogFormat, LogPlayer, LogRow, TelemetrySink};
    pub use crate::demo::DemoSimulator;
    pub use crate::estimator::{GearEstimate, GearEstimator, GearProfile, Phase};
    pub use crate::protocol::{decode, DecodeFault, Elm327, EngineSample, Pid};
    pub use crate::runner::{run, LoopError, RunOptions, RunSummary};
    pub use crate::source::{Elm327Source, MonotonicClock, SampleClock, TelemetrySource};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
