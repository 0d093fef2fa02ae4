//! OBD-II Protocol Communication
//!
//! Implements the ELM327 text protocol used by OBD-II adapters: commands are
//! ASCII lines terminated by `\r`, replies are hex byte pairs followed by the
//! `>` prompt.

mod decoder;
pub mod elm327;
mod error;
pub mod serial;

pub use decoder::{clean_response, decode, DecodeFault, EngineSample, Pid};
pub use elm327::Elm327;
pub use error::ProtocolError;
pub use serial::{configure_port, list_ports, open_port, PortInfo};

/// Default baud rate for ELM327 adapters
pub const DEFAULT_BAUD_RATE: u32 = 38400;

/// Default timeout for a single adapter reply in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Prompt character the adapter prints when it is ready for the next command
pub const PROMPT: u8 = b'>';

/// Combined mode 01 request for RPM, speed, load, throttle (and coolant),
/// expecting four response frames
pub const ENGINE_DATA_REQUEST: &str = "01 0C 0D 04 11 05 4";

/// Adapter initialisation sequence: reset, echo off, linefeeds off,
/// ISO 15765-4 CAN 11-bit 500 kbaud, headers off, allow long messages
pub const INIT_SEQUENCE: [&str; 6] = ["ATZ", "ATE0", "ATL0", "ATSP6", "ATH0", "ATAL"];
