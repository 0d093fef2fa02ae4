//! Unit Conversion Functions
//!
//! Conversions used when turning OBD-II response bytes into engineering units:
//! - Speed: km/h ↔ mph
//! - Percentages: raw byte (0-255) → 0-100 %
//!
//! Integer results are truncated toward zero, never rounded, so that values
//! written to the log match the adapter's own integer decoding.

/// Miles per kilometre
pub const KMH_TO_MPH: f64 = 0.621371;

/// Convert km/h to mph
pub fn kmh_to_mph(kmh: f64) -> f64 {
    kmh * KMH_TO_MPH
}

/// Convert mph to km/h
pub fn mph_to_kmh(mph: f64) -> f64 {
    mph / KMH_TO_MPH
}

/// Convert a raw speed byte (km/h) to whole mph, truncating
pub fn speed_byte_to_mph(byte: u8) -> i32 {
    kmh_to_mph(f64::from(byte)) as i32
}

/// Convert a raw byte (0-255) to a whole percentage, truncating
///
/// Used for calculated engine load (PID 04) and throttle position (PID 11).
pub fn byte_to_percent(byte: u8) -> i32 {
    (f64::from(byte) * 100.0 / 255.0) as i32
}

/// Convert a percentage back to the nearest raw byte that decodes to it
///
/// Useful for synthesising adapter responses. The result is the smallest
/// byte whose truncated percentage equals `percent`.
pub fn percent_to_byte(percent: i32) -> u8 {
    let percent = percent.clamp(0, 100);
    (0..=u8::MAX)
        .find(|&b| byte_to_percent(b) >= percent)
        .unwrap_or(u8::MAX)
}
