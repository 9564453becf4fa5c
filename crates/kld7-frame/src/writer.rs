use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{CommandFrame, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};
use crate::opcode::Opcode;

/// Writes complete command frames to any `Write` link.
pub struct CommandWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> CommandWriter<T> {
    /// Create a new command writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new command writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(HEADER_SIZE + config.max_payload_size.min(64)),
            config,
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &CommandFrame) -> Result<()> {
        self.send(frame.opcode, frame.payload.as_ref())
    }

    /// Encode and send a command.
    pub fn send(&mut self, opcode: Opcode, payload: &[u8]) -> Result<()> {
        if payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            });
        }

        self.buf.clear();
        CommandFrame::new(opcode, payload.to_vec()).encode(&mut self.buf)?;
        tracing::debug!(%opcode, command = opcode.describe(), len = payload.len(), "sending command");

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying link.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying link.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying link.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner link.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::decode_command;
    use crate::opcode::{GBYE, GNFD, INIT, RRAI};

    #[test]
    fn write_single_frame() {
        let mut writer = CommandWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_frame(&CommandFrame::with_value(INIT, 3)).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire, b"INIT\x04\x00\x00\x00\x03\x00\x00\x00");
    }

    #[test]
    fn write_session_sequence() {
        let mut writer = CommandWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_frame(&CommandFrame::with_value(RRAI, 1)).unwrap();
        writer.write_frame(&CommandFrame::with_value(GNFD, 8)).unwrap();
        writer.write_frame(&CommandFrame::empty(GBYE)).unwrap();

        let mut wire = BytesMut::from(writer.into_inner().into_inner().as_slice());
        let opcodes: Vec<Opcode> = std::iter::from_fn(|| decode_command(&mut wire, 64).unwrap())
            .map(|frame| frame.opcode)
            .collect();
        assert_eq!(opcodes, vec![RRAI, GNFD, GBYE]);
    }

    #[test]
    fn rejects_oversized_payload() {
        let cfg = FrameConfig {
            max_payload_size: 4,
        };
        let mut writer = CommandWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);
        let err = writer.send(GNFD, &[0u8; 5]).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 5, max: 4 }));
        assert!(writer.get_ref().get_ref().is_empty());
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn zero_length_write_is_connection_closed() {
        let mut writer = CommandWriter::new(ZeroWriter);
        let err = writer.send(GBYE, &[]).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    /// Accepts two bytes per call after one interruption.
    struct ChunkyWriter {
        out: Vec<u8>,
        interrupted: bool,
    }

    impl Write for ChunkyWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let n = buf.len().min(2);
            self.out.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn partial_writes_complete_the_frame() {
        let mut writer = CommandWriter::new(ChunkyWriter {
            out: Vec::new(),
            interrupted: false,
        });
        writer.send(INIT, &3u32.to_le_bytes()).unwrap();
        assert_eq!(writer.get_mut().out.len(), 12);
        assert_eq!(writer.config().max_payload_size, 1024);
    }
}
