//! Scripted in-memory link.
//!
//! Replies are queued up front in the order the device would send them. A
//! reply is served across as many reads as it takes; once it is exhausted the
//! next reply starts. An explicit timeout entry (or an empty script) makes a
//! read fail with `TimedOut`, which is how a silent sensor looks on a real
//! port.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::serial::{DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT};
use crate::traits::SensorLink;

/// Something that happened on a [`MockLink`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Bytes written by the host (one entry per `write` call).
    Write(Vec<u8>),
    /// Line rate switched.
    SetBaudRate(u32),
    /// Read timeout changed.
    SetReadTimeout(Duration),
    /// Link closed.
    Close,
}

#[derive(Debug)]
enum Reply {
    Bytes(VecDeque<u8>),
    Timeout,
    Fail(ErrorKind),
}

#[derive(Debug)]
struct MockLinkInner {
    replies: VecDeque<Reply>,
    events: Vec<LinkEvent>,
    baud_rate: u32,
    read_timeout: Duration,
    closed: bool,
}

/// Scripted link for tests and dry runs.
///
/// Clones share state, so a test can keep one handle for inspection while a
/// session owns the other.
#[derive(Debug, Clone)]
pub struct MockLink {
    inner: Arc<Mutex<MockLinkInner>>,
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLink {
    /// Create an open link at the power-up rate with nothing scripted.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockLinkInner {
                replies: VecDeque::new(),
                events: Vec::new(),
                baud_rate: DEFAULT_BAUD_RATE,
                read_timeout: DEFAULT_READ_TIMEOUT,
                closed: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockLinkInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue bytes the device sends next.
    pub fn push_reply(&self, bytes: &[u8]) -> &Self {
        if !bytes.is_empty() {
            self.lock()
                .replies
                .push_back(Reply::Bytes(bytes.iter().copied().collect()));
        }
        self
    }

    /// Queue a read timeout (the device stays silent).
    pub fn push_timeout(&self) -> &Self {
        self.lock().replies.push_back(Reply::Timeout);
        self
    }

    /// Queue a hard I/O failure, e.g. `BrokenPipe` for an unplugged adapter.
    pub fn push_failure(&self, kind: ErrorKind) -> &Self {
        self.lock().replies.push_back(Reply::Fail(kind));
        self
    }

    /// Everything recorded so far.
    pub fn events(&self) -> Vec<LinkEvent> {
        self.lock().events.clone()
    }

    /// Concatenation of every write.
    pub fn written(&self) -> Vec<u8> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                LinkEvent::Write(bytes) => Some(bytes.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    /// Number of scripted replies not yet consumed.
    pub fn pending_replies(&self) -> usize {
        self.lock().replies.len()
    }

    /// Returns true once the host has closed the link.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl Read for MockLink {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        if inner.closed {
            return Err(std::io::Error::new(ErrorKind::NotConnected, "mock link closed"));
        }
        if buf.is_empty() {
            return Ok(0);
        }

        match inner.replies.front_mut() {
            None => Err(std::io::Error::from(ErrorKind::TimedOut)),
            Some(Reply::Timeout) => {
                inner.replies.pop_front();
                Err(std::io::Error::from(ErrorKind::TimedOut))
            }
            Some(Reply::Fail(kind)) => {
                let kind = *kind;
                inner.replies.pop_front();
                Err(std::io::Error::from(kind))
            }
            Some(Reply::Bytes(bytes)) => {
                let n = bytes.len().min(buf.len());
                for (slot, byte) in buf.iter_mut().zip(bytes.drain(..n)) {
                    *slot = byte;
                }
                if bytes.is_empty() {
                    inner.replies.pop_front();
                }
                Ok(n)
            }
        }
    }
}

impl Write for MockLink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(std::io::Error::new(ErrorKind::NotConnected, "mock link closed"));
        }
        inner.events.push(LinkEvent::Write(buf.to_vec()));
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SensorLink for MockLink {
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(TransportError::Closed);
        }
        inner.baud_rate = baud_rate;
        inner.events.push(LinkEvent::SetBaudRate(baud_rate));
        Ok(())
    }

    fn baud_rate(&self) -> u32 {
        self.lock().baud_rate
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(TransportError::Closed);
        }
        inner.read_timeout = timeout;
        inner.events.push(LinkEvent::SetReadTimeout(timeout));
        Ok(())
    }

    fn read_timeout(&self) -> Duration {
        self.lock().read_timeout
    }

    fn close(&mut self) -> Result<()> {
        let mut inner = self.lock();
        if !inner.closed {
            inner.closed = true;
            inner.events.push(LinkEvent::Close);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_spans_multiple_reads() {
        let mut link = MockLink::new();
        link.push_reply(&[1, 2, 3, 4, 5]);

        let mut buf = [0u8; 3];
        assert_eq!(link.read(&mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(link.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[4, 5]);
        assert_eq!(link.pending_replies(), 0);
    }

    #[test]
    fn empty_script_times_out() {
        let mut link = MockLink::new();
        let mut buf = [0u8; 4];
        let err = link.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimedOut);
    }

    #[test]
    fn timeout_entry_separates_replies() {
        let mut link = MockLink::new();
        link.push_reply(&[7]).push_timeout().push_reply(&[8]);

        let mut buf = [0u8; 4];
        assert_eq!(link.read(&mut buf).unwrap(), 1);
        assert_eq!(link.read(&mut buf).unwrap_err().kind(), ErrorKind::TimedOut);
        assert_eq!(link.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 8);
    }

    #[test]
    fn injected_failure_surfaces_once() {
        let mut link = MockLink::new();
        link.push_failure(ErrorKind::BrokenPipe).push_reply(&[1]);

        let mut buf = [0u8; 1];
        assert_eq!(link.read(&mut buf).unwrap_err().kind(), ErrorKind::BrokenPipe);
        assert_eq!(link.read(&mut buf).unwrap(), 1);
    }

    #[test]
    fn records_writes_baud_changes_and_close_in_order() {
        let mut link = MockLink::new();
        let probe = link.clone();

        link.write_all(b"INIT").unwrap();
        link.set_baud_rate(2_000_000).unwrap();
        link.close().unwrap();
        link.close().unwrap();

        assert_eq!(
            probe.events(),
            vec![
                LinkEvent::Write(b"INIT".to_vec()),
                LinkEvent::SetBaudRate(2_000_000),
                LinkEvent::Close,
            ]
        );
        assert!(probe.is_closed());
        assert_eq!(probe.baud_rate(), 2_000_000);
    }

    #[test]
    fn io_after_close_is_rejected() {
        let mut link = MockLink::new();
        link.close().unwrap();

        assert_eq!(link.write(b"x").unwrap_err().kind(), ErrorKind::NotConnected);
        assert!(matches!(
            link.set_baud_rate(9600),
            Err(TransportError::Closed)
        ));
    }
}
