use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::error::{Result, TransportError};
use crate::traits::SensorLink;

/// Rate the sensor listens on after power-up.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Read timeout used while the link runs at the power-up rate.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Line settings for opening the sensor port.
///
/// The K-LD7 speaks 8E1 (8 data bits, even parity, one stop bit) with no
/// flow control. Only the port name, initial rate and timeout are tunable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// OS port name (e.g. `/dev/ttyUSB0`, `COM10`).
    pub port: String,
    /// Initial bit rate.
    pub baud_rate: u32,
    /// Per-read timeout.
    pub read_timeout: Duration,
}

impl SerialConfig {
    /// Default line settings for the given port.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Serial link to the sensor over a `serialport` handle.
pub struct SerialLink {
    port: Option<Box<dyn SerialPort>>,
    name: String,
    baud_rate: u32,
    read_timeout: Duration,
}

impl SerialLink {
    /// Open the port with 8E1 framing and the configured rate and timeout.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(config.port.as_str(), config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::Even)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: config.port.clone(),
                source,
            })?;

        tracing::info!(
            port = %config.port,
            baud_rate = config.baud_rate,
            "opened serial port"
        );

        Ok(Self {
            port: Some(port),
            name: config.port.clone(),
            baud_rate: config.baud_rate,
            read_timeout: config.read_timeout,
        })
    }

    /// Port name this link was opened on.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn port_mut(&mut self) -> std::io::Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| std::io::Error::new(ErrorKind::NotConnected, "serial port closed"))
    }
}

impl Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.port_mut()?.read(buf) {
            Ok(n) => Ok(n),
            Err(err) if err.kind() == ErrorKind::TimedOut => Ok(0),
            Err(err) => Err(err),
        }
    }
}

impl Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port_mut()?.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port_mut()?.flush()
    }
}

impl SensorLink for SerialLink {
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        let port = self.port.as_mut().ok_or(TransportError::Closed)?;
        port.set_baud_rate(baud_rate)?;
        tracing::debug!(port = %self.name, from = self.baud_rate, to = baud_rate, "baud rate changed");
        self.baud_rate = baud_rate;
        Ok(())
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        let port = self.port.as_mut().ok_or(TransportError::Closed)?;
        port.set_timeout(timeout)?;
        self.read_timeout = timeout;
        Ok(())
    }

    fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            // Pending bytes are dropped with the handle otherwise.
            let flushed = port.flush();
            drop(port);
            tracing::info!(port = %self.name, "closed serial port");
            flushed?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("port", &self.name)
            .field("open", &self.port.is_some())
            .field("baud_rate", &self.baud_rate)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_power_up_settings() {
        let cfg = SerialConfig::new("/dev/ttyUSB0");
        assert_eq!(cfg.port, "/dev/ttyUSB0");
        assert_eq!(cfg.baud_rate, 115_200);
        assert_eq!(cfg.read_timeout, Duration::from_secs(2));
    }

    #[test]
    #[cfg(unix)]
    fn open_missing_port_reports_port_name() {
        let cfg = SerialConfig::new("/dev/kld7-does-not-exist");
        let err = SerialLink::open(&cfg).unwrap_err();
        match err {
            TransportError::Open { port, .. } => assert_eq!(port, "/dev/kld7-does-not-exist"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
