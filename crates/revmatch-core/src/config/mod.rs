//! Gear Profile Configuration
//!
//! Loads a [`GearProfile`] from a `key = value` file:
//!
//! ```text
//! # teeth counts as input,output (ratio = output / input) or a plain ratio
//! final_drive = 15,61
//! gear_ratio = 11,37
//! gear_ratio = 22,41
//! gear_ratio = 28,37
//! gear_ratio = 34,35
//! gear_ratio = 0.82
//! min_rpm = 1200
//! max_rpm = 6800
//! wheel_circumference = 74.384
//! ```
//!
//! `gear_ratio` lines are taken in order, first gear first. All missing
//! fields are reported together.

mod error;
pub mod properties;

pub use error::ConfigError;
pub use properties::{Entry, Properties};

use std::path::Path;

use crate::estimator::GearProfile;

/// Final drive ratio key
pub const KEY_FINAL_DRIVE: &str = "final_drive";
/// Per-gear ratio key, repeated
pub const KEY_GEAR_RATIO: &str = "gear_ratio";
/// Lower rev-match bound key
pub const KEY_MIN_RPM: &str = "min_rpm";
/// Upper rev-match bound key
pub const KEY_MAX_RPM: &str = "max_rpm";
/// Wheel circumference key (inches)
pub const KEY_WHEEL_CIRCUMFERENCE: &str = "wheel_circumference";

const KNOWN_KEYS: [&str; 5] = [
    KEY_FINAL_DRIVE,
    KEY_GEAR_RATIO,
    KEY_MIN_RPM,
    KEY_MAX_RPM,
    KEY_WHEEL_CIRCUMFERENCE,
];

/// Load and validate a gear profile from a file
pub fn load_gear_profile<P: AsRef<Path>>(path: P) -> Result<GearProfile, ConfigError> {
    let path = path.as_ref();
    let props = Properties::load(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    gear_profile_from_properties(&props)
}

/// Parse and validate a gear profile from file contents
pub fn parse_gear_profile(content: &str) -> Result<GearProfile, ConfigError> {
    gear_profile_from_properties(&Properties::parse(content))
}

/// Build a gear profile from parsed properties
pub fn gear_profile_from_properties(props: &Properties) -> Result<GearProfile, ConfigError> {
    for entry in props.entries() {
        if !KNOWN_KEYS.contains(&entry.key.as_str()) {
            tracing::debug!(key = %entry.key, line = entry.line, "ignoring unknown config key");
        }
    }

    let final_drive = last_entry(props, KEY_FINAL_DRIVE)
        .map(parse_ratio)
        .transpose()?;
    let gear_ratios = props
        .get_all(KEY_GEAR_RATIO)
        .map(parse_ratio)
        .collect::<Result<Vec<_>, _>>()?;
    let min_rpm = last_entry(props, KEY_MIN_RPM).map(parse_int).transpose()?;
    let max_rpm = last_entry(props, KEY_MAX_RPM).map(parse_int).transpose()?;
    let wheel = last_entry(props, KEY_WHEEL_CIRCUMFERENCE)
        .map(parse_float)
        .transpose()?;

    let mut missing = Vec::new();
    if final_drive.is_none() {
        missing.push(KEY_FINAL_DRIVE);
    }
    if gear_ratios.is_empty() {
        missing.push(KEY_GEAR_RATIO);
    }
    if min_rpm.is_none() {
        missing.push(KEY_MIN_RPM);
    }
    if max_rpm.is_none() {
        missing.push(KEY_MAX_RPM);
    }
    if wheel.is_none() {
        missing.push(KEY_WHEEL_CIRCUMFERENCE);
    }

    match (final_drive, min_rpm, max_rpm, wheel) {
        (Some(final_drive), Some(min_rpm), Some(max_rpm), Some(wheel)) if missing.is_empty() => {
            GearProfile::new(final_drive, gear_ratios, min_rpm, max_rpm, wheel)
        }
        _ => Err(ConfigError::Missing(missing)),
    }
}

fn last_entry<'a>(props: &'a Properties, key: &'a str) -> Option<&'a Entry> {
    props.get_all(key).last()
}

fn invalid(entry: &Entry, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: entry.key.clone(),
        line: entry.line,
        message: message.into(),
    }
}

/// `input,output` teeth counts or a decimal ratio
fn parse_ratio(entry: &Entry) -> Result<f64, ConfigError> {
    let value: String = entry.value.chars().filter(|c| !c.is_whitespace()).collect();

    match value.split_once(',') {
        Some((input, output)) => {
            let input: u32 = input
                .parse()
                .map_err(|_| invalid(entry, format!("bad input teeth count '{}'", input)))?;
            let output: u32 = output
                .parse()
                .map_err(|_| invalid(entry, format!("bad output teeth count '{}'", output)))?;
            if input == 0 || output == 0 {
                return Err(invalid(entry, "teeth counts must be positive"));
            }
            Ok(f64::from(output) / f64::from(input))
        }
        None => value
            .parse()
            .map_err(|_| invalid(entry, "expected 'input,output' teeth counts or a ratio")),
    }
}

fn parse_int(entry: &Entry) -> Result<i32, ConfigError> {
    entry
        .value
        .parse()
        .map_err(|_| invalid(entry, "expected an integer"))
}

fn parse_float(entry: &Entry) -> Result<f64, ConfigError> {
    entry
        .value
        .parse()
        .map_err(|_| invalid(entry, "expected a number"))
}
