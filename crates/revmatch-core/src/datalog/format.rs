//! Log file formats
//!
//! Rows are rendered either as CSV or as one JSON object per line.

use std::fmt::Write as _;
use std::path::Path;

use super::{LogRow, SinkError};

macro_rules! csv_header {
    () => {
        "RPM,MPH,CurrentGear,RevMatch,Load,Throttle,Time"
    };
}

/// CSV header line, without the trailing newline
pub const CSV_HEADER: &str = csv_header!();

/// Supported log file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Comma-separated values
    #[default]
    Csv,
    /// Newline-delimited JSON
    JsonLines,
}

impl LogFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_lowercase().as_str() {
            "csv" => Some(LogFormat::Csv),
            "jsonl" | "json" => Some(LogFormat::JsonLines),
            _ => None,
        }
    }

    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            LogFormat::Csv => "csv",
            LogFormat::JsonLines => "jsonl",
        }
    }

    /// Text written once at the start of a file
    pub fn preamble(&self) -> &'static str {
        match self {
            LogFormat::Csv => concat!(csv_header!(), "\n"),
            LogFormat::JsonLines => "",
        }
    }

    /// Append one rendered row, including its newline, to `out`
    pub fn render_row(&self, row: &LogRow, out: &mut String) -> Result<(), SinkError> {
        match self {
            LogFormat::Csv => {
                // Writing into a String cannot fail
                let _ = writeln!(
                    out,
                    "{},{:.1},{},{},{},{},{}",
                    row.rpm,
                    row.speed_mph,
                    row.gear,
                    row.rev_match_rpm,
                    row.load_percent,
                    row.throttle_percent,
                    row.timestamp_millis
                );
            }
            LogFormat::JsonLines => {
                out.push_str(&serde_json::to_string(row)?);
                out.push('\n');
            }
        }
        Ok(())
    }
}
