//! ELM327 adapter connection
//!
//! Sends AT and OBD commands and collects the reply up to the `>` prompt.

use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use super::{
    configure_port, open_port, ProtocolError, DEFAULT_TIMEOUT_MS, ENGINE_DATA_REQUEST,
    INIT_SEQUENCE, PROMPT,
};

/// Longest reply accepted before the prompt is seen
pub const MAX_RESPONSE_LEN: usize = 1024;

/// Connection to an ELM327 adapter over any byte channel
///
/// The channel is a serial port in production and an in-memory script in
/// tests. Reads that time out are retried until the command deadline.
pub struct Elm327<C = Box<dyn SerialPort>> {
    channel: C,
    timeout: Duration,
}

impl Elm327 {
    /// Open a serial port, configure it and run the adapter init sequence
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self, ProtocolError> {
        let mut port = open_port(port_name, Some(baud_rate))?;
        configure_port(port.as_mut())?;

        let mut elm = Self::new(port, Duration::from_millis(DEFAULT_TIMEOUT_MS));
        elm.initialize()?;
        tracing::info!(port = port_name, baud = baud_rate, "ELM327 adapter ready");
        Ok(elm)
    }
}

impl<C: Read + Write> Elm327<C> {
    /// Wrap an already open channel
    pub fn new(channel: C, timeout: Duration) -> Self {
        Self { channel, timeout }
    }

    /// Response timeout for a single command
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Set the response timeout for subsequent commands
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Run the adapter initialisation sequence
    pub fn initialize(&mut self) -> Result<(), ProtocolError> {
        for cmd in INIT_SEQUENCE {
            let reply = self.command(cmd)?;
            tracing::debug!(command = cmd, reply = %reply.trim(), "adapter init");
        }
        Ok(())
    }

    /// Request RPM, speed, load and throttle in one round trip
    pub fn request_engine_data(&mut self) -> Result<String, ProtocolError> {
        self.command(ENGINE_DATA_REQUEST)
    }

    /// Send `cmd` followed by `\r` and return the raw reply without the prompt
    pub fn command(&mut self, cmd: &str) -> Result<String, ProtocolError> {
        let mut line = Vec::with_capacity(cmd.len() + 1);
        line.extend_from_slice(cmd.as_bytes());
        line.push(b'\r');

        self.channel.write_all(&line)?;
        self.channel.flush()?;
        self.read_until_prompt()
    }

    fn read_until_prompt(&mut self) -> Result<String, ProtocolError> {
        let deadline = Instant::now() + self.timeout;
        let mut response = Vec::with_capacity(64);
        let mut buf = [0u8; 64];

        loop {
            if Instant::now() >= deadline {
                return Err(ProtocolError::Timeout(self.timeout.as_millis() as u64));
            }

            match self.channel.read(&mut buf) {
                Ok(0) => return Err(ProtocolError::NotConnected),
                Ok(n) => {
                    for &byte in &buf[..n] {
                        if byte == PROMPT {
                            return Ok(String::from_utf8_lossy(&response).into_owned());
                        }
                        response.push(byte);
                    }
                    if response.len() > MAX_RESPONSE_LEN {
                        return Err(ProtocolError::BufferOverflow(MAX_RESPONSE_LEN));
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) =>
                {
                    continue
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Give the channel back, e.g. to close the port explicitly
    pub fn into_inner(self) -> C {
        self.channel
    }
}
