use std::io::{ErrorKind, Read};

use crate::ack::{decode_ack, ACK_LEN};
use crate::detection::{decode_detection, DetectionHeader, Target, DETECTION_HEADER_LEN};
use crate::error::{FrameError, Result};

/// Read up to `len` bytes, stopping early on a read timeout.
///
/// This is the "read(n) → up to n bytes, short or empty on timeout" contract
/// the protocol is built on. Partial reads are accumulated; `Interrupted` is
/// retried; a zero-byte read or a `TimedOut`/`WouldBlock` error ends the read
/// with whatever has arrived. Every other I/O error is returned.
pub fn read_up_to<R: Read + ?Sized>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    let mut filled = 0usize;

    while filled < len {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => break,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }

    buf.truncate(filled);
    Ok(buf)
}

/// Reads sensor responses from any `Read` link.
///
/// Handles partial reads internally; callers get whole acknowledgments and
/// headers or a typed error saying how much was missing.
pub struct ResponseReader<T> {
    inner: T,
}

impl<T: Read> ResponseReader<T> {
    /// Create a new response reader.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Read and validate one 9-byte acknowledgment.
    pub fn read_ack(&mut self) -> Result<()> {
        let bytes = read_up_to(&mut self.inner, ACK_LEN)?;
        tracing::trace!(len = bytes.len(), "ack bytes");
        decode_ack(&bytes).map_err(FrameError::Ack)
    }

    /// Read the 8-byte detection header.
    pub fn read_header(&mut self) -> Result<DetectionHeader> {
        let bytes = read_up_to(&mut self.inner, DETECTION_HEADER_LEN)?;
        DetectionHeader::from_bytes(&bytes)
    }

    /// Read a detection header and, if it announces one, the target payload.
    pub fn read_detection(&mut self) -> Result<Option<Target>> {
        let header = self.read_header()?;
        decode_detection(&header, &mut self.inner)
    }

    /// Borrow the underlying link.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner link.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
