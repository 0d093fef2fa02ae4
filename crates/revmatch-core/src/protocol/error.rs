//! Protocol errors

use thiserror::Error;

/// Errors that can occur while talking to the OBD-II adapter
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("Timed out after {0} ms waiting for adapter prompt")]
    Timeout(u64),

    #[error("Not connected to adapter")]
    NotConnected,

    #[error("Adapter response exceeded {0} bytes without a prompt")]
    BufferOverflow(usize),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
