use pretty_assertions::assert_eq;
use revmatch_core::protocol::{
    DecodeFault, Elm327, EngineSample, Pid, ProtocolError, ENGINE_DATA_REQUEST, INIT_SEQUENCE,
};
use revmatch_core::source::{AcquireError, Elm327Source, ManualClock, TelemetrySource};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::Duration;

/// Mock serial port: each command written queues the next scripted reply
struct MockSerial {
    sent: Vec<u8>,
    replies: VecDeque<Vec<u8>>,
    pending: VecDeque<u8>,
    closed: bool,
    fail_on_send: bool,
}

impl MockSerial {
    fn new() -> Self {
        Self {
            sent: Vec::new(),
            replies: VecDeque::new(),
            pending: VecDeque::new(),
            closed: false,
            fail_on_send: false,
        }
    }

    fn with_replies(replies: &[&str]) -> Self {
        let mut mock = Self::new();
        mock.replies = replies.iter().map(|r| r.as_bytes().to_vec()).collect();
        mock
    }

    fn sent_commands(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.sent)
            .split_terminator('\r')
            .map(str::to_string)
            .collect()
    }
}

impl Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_on_send {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "Serial write failed"));
        }
        self.sent.extend_from_slice(buf);
        if buf.contains(&b'\r') {
            if let Some(reply) = self.replies.pop_front() {
                self.pending.extend(reply);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            if self.closed {
                return Ok(0);
            }
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        }
        // Deliver in small chunks like a real UART
        let n = buf.len().min(self.pending.len()).min(7);
        for slot in buf.iter_mut().take(n) {
            *slot = self.pending.pop_front().unwrap_or_default();
        }
        Ok(n)
    }
}

fn adapter(mock: MockSerial) -> Elm327<MockSerial> {
    Elm327::new(mock, Duration::from_millis(50))
}

#[test]
fn test_init_sequence_order() {
    let mut replies = vec!["ELM327 v1.5\r\r>"];
    replies.extend(std::iter::repeat("OK\r\r>").take(INIT_SEQUENCE.len() - 1));
    let mut elm = adapter(MockSerial::with_replies(&replies));

    elm.initialize().unwrap();

    let mock = elm.into_inner();
    assert_eq!(
        mock.sent_commands(),
        vec!["ATZ", "ATE0", "ATL0", "ATSP6", "ATH0", "ATAL"]
    );
}

#[test]
fn test_engine_data_request() {
    let mut elm = adapter(MockSerial::with_replies(&[
        "41 0C 1A F8 0D 3C 04 80 11 33 \r\r>",
    ]));

    let reply = elm.request_engine_data().unwrap();
    assert_eq!(reply, "41 0C 1A F8 0D 3C 04 80 11 33 \r\r");

    let mock = elm.into_inner();
    assert_eq!(mock.sent_commands(), vec![ENGINE_DATA_REQUEST]);
}

#[test]
fn test_timeout_without_prompt() {
    let mut elm = adapter(MockSerial::with_replies(&["41 0C 1A"]));
    match elm.command("01 0C") {
        Err(ProtocolError::Timeout(ms)) => assert_eq!(ms, 50),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[test]
fn test_closed_port() {
    let mut mock = MockSerial::new();
    mock.closed = true;
    let mut elm = adapter(mock);
    assert!(matches!(elm.command("ATZ"), Err(ProtocolError::NotConnected)));
}

#[test]
fn test_runaway_reply() {
    let flood = "A".repeat(4096);
    let mut elm = adapter(MockSerial::with_replies(&[flood.as_str()]));
    assert!(matches!(
        elm.command("ATZ"),
        Err(ProtocolError::BufferOverflow(_))
    ));
}

#[test]
fn test_write_failure() {
    let mut mock = MockSerial::new();
    mock.fail_on_send = true;
    let mut elm = adapter(mock);
    assert!(matches!(elm.command("ATZ"), Err(ProtocolError::IoError(_))));
}

#[test]
fn test_timeout_setting() {
    let mut elm = adapter(MockSerial::new());
    assert_eq!(elm.timeout(), Duration::from_millis(50));
    elm.set_timeout(Duration::from_millis(10));
    assert_eq!(elm.timeout(), Duration::from_millis(10));
}

#[test]
fn test_source_stamps_with_clock() {
    let clock = ManualClock::new(5_000);
    let mock = MockSerial::with_replies(&[
        "41 0C 1A F8 0D 3C 04 80 11 33 \r\r>",
        "NO DATA\r\r>",
    ]);
    let mut source = Elm327Source::new(adapter(mock), &clock);

    let sample = source.acquire().unwrap().unwrap();
    assert_eq!(
        sample,
        EngineSample::new(1726, 37, 5_000).with_load_throttle(50, 20)
    );

    clock.advance(50);
    match source.acquire() {
        Err(AcquireError::Decode(fault)) => {
            assert_eq!(fault, DecodeFault::FieldNotFound(Pid::EngineRpm))
        }
        other => panic!("expected decode fault, got {:?}", other),
    }

    // Script exhausted: the adapter stops answering
    assert!(matches!(
        source.acquire(),
        Err(AcquireError::Transport(ProtocolError::Timeout(_)))
    ));
}

#[test]
fn test_protocol_error_display() {
    let err = ProtocolError::Timeout(1000);
    assert!(err.to_string().contains("1000"));
    assert!(!format!("{:?}", ProtocolError::NotConnected).is_empty());
}
