//! Engine data response decoding
//!
//! Turns one ELM327 reply to [`ENGINE_DATA_REQUEST`](super::ENGINE_DATA_REQUEST)
//! into an [`EngineSample`].
//!
//! Fields are located by scanning forward from the end of the previous field,
//! so extra framing bytes inserted by different CAN/K-line variants are
//! skipped. The price is a fixed field order (0C, 0D, 04, 11): a PID that
//! appears before the previous field is reported as not found.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::unit_conversion::{byte_to_percent, speed_byte_to_mph};

/// Mode 01 parameter identifiers carried in the engine data reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pid {
    /// 0C - engine speed, two bytes, quarter RPM
    EngineRpm,
    /// 0D - vehicle speed, one byte, km/h
    VehicleSpeed,
    /// 04 - calculated engine load, one byte
    EngineLoad,
    /// 11 - absolute throttle position, one byte
    ThrottlePosition,
}

impl Pid {
    /// Fields in the order they must appear in a reply
    pub const DECODE_ORDER: [Pid; 4] = [
        Pid::EngineRpm,
        Pid::VehicleSpeed,
        Pid::EngineLoad,
        Pid::ThrottlePosition,
    ];

    /// Raw PID byte
    pub const fn code(self) -> u8 {
        match self {
            Pid::EngineRpm => 0x0C,
            Pid::VehicleSpeed => 0x0D,
            Pid::EngineLoad => 0x04,
            Pid::ThrottlePosition => 0x11,
        }
    }

    /// PID as it appears in the hex text of a reply
    pub const fn as_str(self) -> &'static str {
        match self {
            Pid::EngineRpm => "0C",
            Pid::VehicleSpeed => "0D",
            Pid::EngineLoad => "04",
            Pid::ThrottlePosition => "11",
        }
    }

    /// Number of data bytes following the PID
    pub const fn data_len(self) -> usize {
        match self {
            Pid::EngineRpm => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a reply could not be decoded
///
/// A fault never carries partial data; the caller drops the cycle.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFault {
    #[error("PID {0} not found in response")]
    FieldNotFound(Pid),

    #[error("Malformed hex data for PID {0}")]
    MalformedHex(Pid),
}

impl DecodeFault {
    /// The field that failed to decode
    pub fn pid(&self) -> Pid {
        match self {
            DecodeFault::FieldNotFound(pid) | DecodeFault::MalformedHex(pid) => *pid,
        }
    }
}

/// One decoded engine reading
///
/// Integer fields use [`EngineSample::UNAVAILABLE`] (-1) when a value is not
/// known. A sample with an unavailable RPM or speed must not reach the
/// estimator; unavailable load or throttle is informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSample {
    /// Engine speed in RPM
    pub rpm: i32,
    /// Road speed in whole mph
    pub speed_mph: i32,
    /// Calculated engine load, 0-100 %
    pub load_percent: i32,
    /// Throttle position, 0-100 %
    pub throttle_percent: i32,
    /// Monotonic acquisition time in milliseconds
    pub timestamp_millis: i64,
}

impl EngineSample {
    /// Sentinel for a value that was not received
    pub const UNAVAILABLE: i32 = -1;

    /// Sample with RPM and speed only; load and throttle unavailable
    pub fn new(rpm: i32, speed_mph: i32, timestamp_millis: i64) -> Self {
        Self {
            rpm,
            speed_mph,
            load_percent: Self::UNAVAILABLE,
            throttle_percent: Self::UNAVAILABLE,
            timestamp_millis,
        }
    }

    /// Set load and throttle
    pub fn with_load_throttle(mut self, load_percent: i32, throttle_percent: i32) -> Self {
        self.load_percent = load_percent;
        self.throttle_percent = throttle_percent;
        self
    }

    /// Whether the sample may be passed to the gear estimator
    ///
    /// The engine must be turning and the speed known.
    pub fn is_estimable(&self) -> bool {
        self.rpm > 0 && self.speed_mph >= 0
    }
}

/// Strip adapter padding from a raw reply
///
/// Splits on whitespace (including `\r`), drops multi-frame labels such as
/// `0:` and discards every token that is not pure hex, so prompts, `SEARCHING...`
/// and `NO DATA` disappear. The remaining tokens are concatenated.
pub fn clean_response(raw: &str) -> String {
    raw.split_whitespace()
        .map(|token| token.rsplit(':').next().unwrap_or(token))
        .filter(|token| !token.is_empty() && token.bytes().all(|b| b.is_ascii_hexdigit()))
        .collect()
}

/// Decode one engine data reply
///
/// `timestamp_millis` is the acquisition time supplied by the caller's clock.
///
/// # Errors
/// [`DecodeFault::FieldNotFound`] when a PID is missing (or out of order),
/// [`DecodeFault::MalformedHex`] when RPM data bytes are absent or not hex.
pub fn decode(raw: &str, timestamp_millis: i64) -> Result<EngineSample, DecodeFault> {
    let cleaned = clean_response(raw);
    let mut scanner = FieldScanner::new(&cleaned);

    let (a, b) = scanner.read_rpm()?;
    let speed = scanner.read_byte(Pid::VehicleSpeed)?;
    let load = scanner.read_byte(Pid::EngineLoad)?;
    let throttle = scanner.read_byte(Pid::ThrottlePosition)?;

    Ok(EngineSample {
        rpm: (i32::from(a) * 256 + i32::from(b)) / 4,
        speed_mph: speed_byte_to_mph(speed),
        load_percent: byte_to_percent(load),
        throttle_percent: byte_to_percent(throttle),
        timestamp_millis,
    })
}

/// Forward-only cursor over cleaned hex text
struct FieldScanner<'a> {
    data: &'a str,
    cursor: usize,
}

impl<'a> FieldScanner<'a> {
    fn new(data: &'a str) -> Self {
        Self { data, cursor: 0 }
    }

    /// Offset of the first data digit after `pid`, searching from the cursor
    fn seek(&self, pid: Pid) -> Option<usize> {
        let rest = self.data.get(self.cursor..)?;
        rest.find(pid.as_str()).map(|i| self.cursor + i + 2)
    }

    fn hex_byte(&self, offset: usize, pid: Pid) -> Result<u8, DecodeFault> {
        let digits = self
            .data
            .get(offset..offset + 2)
            .ok_or(DecodeFault::MalformedHex(pid))?;
        u8::from_str_radix(digits, 16).map_err(|_| DecodeFault::MalformedHex(pid))
    }

    fn read_rpm(&mut self) -> Result<(u8, u8), DecodeFault> {
        let pid = Pid::EngineRpm;
        let start = self.seek(pid).ok_or(DecodeFault::FieldNotFound(pid))?;
        let a = self.hex_byte(start, pid)?;
        let b = self.hex_byte(start + 2, pid)?;
        self.cursor = start + 4;
        Ok((a, b))
    }

    fn read_byte(&mut self, pid: Pid) -> Result<u8, DecodeFault> {
        let start = self.seek(pid).ok_or(DecodeFault::FieldNotFound(pid))?;
        // PID without room for its data byte counts as absent
        if start + 2 > self.data.len() {
            return Err(DecodeFault::FieldNotFound(pid));
        }
        let value = self.hex_byte(start, pid)?;
        self.cursor = start + 2;
        Ok(value)
    }
}
