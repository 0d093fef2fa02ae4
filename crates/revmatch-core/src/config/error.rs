//! Configuration errors

use thiserror::Error;

/// Errors that can occur while loading the gear profile
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Error opening config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for '{key}' at line {line}: {message}")]
    InvalidValue {
        key: String,
        line: usize,
        message: String,
    },

    #[error("Missing: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("Invalid gear profile: {0}")]
    Invariant(String),
}
