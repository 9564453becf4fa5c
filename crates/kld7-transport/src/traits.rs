use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// A byte link to the sensor, implementing Read + Write.
///
/// Reads follow the serial-port convention the protocol relies on: a read
/// that hits the configured read timeout returns zero bytes (or an error of
/// kind `TimedOut`) instead of blocking forever. Callers that need `n` bytes
/// must loop and treat an empty read as "timed out".
///
/// The link is exclusively owned by one session; nothing here is shared.
pub trait SensorLink: Read + Write {
    /// Switch the line to a new bit rate. Takes effect for the next byte.
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()>;

    /// Current line bit rate.
    fn baud_rate(&self) -> u32;

    /// Set the per-read timeout.
    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Current per-read timeout.
    fn read_timeout(&self) -> Duration;

    /// Release the underlying port. Further I/O fails with `NotConnected`.
    fn close(&mut self) -> Result<()>;
}

impl<L: SensorLink + ?Sized> SensorLink for &mut L {
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        (**self).set_baud_rate(baud_rate)
    }

    fn baud_rate(&self) -> u32 {
        (**self).baud_rate()
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        (**self).set_read_timeout(timeout)
    }

    fn read_timeout(&self) -> Duration {
        (**self).read_timeout()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

impl<L: SensorLink + ?Sized> SensorLink for Box<L> {
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        (**self).set_baud_rate(baud_rate)
    }

    fn baud_rate(&self) -> u32 {
        (**self).baud_rate()
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        (**self).set_read_timeout(timeout)
    }

    fn read_timeout(&self) -> Duration {
        (**self).read_timeout()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
