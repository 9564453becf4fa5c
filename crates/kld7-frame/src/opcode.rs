//! Command opcodes.
//!
//! Opcodes are four ASCII characters sent verbatim at the start of every
//! command frame.

use std::fmt;

use crate::error::{FrameError, Result};

/// Validated 4-byte ASCII opcode.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode([u8; 4]);

/// Initialize the connection and select the high-speed baud rate.
pub const INIT: Opcode = Opcode(*b"INIT");

/// Set the maximum speed preset.
pub const RSPI: Opcode = Opcode(*b"RSPI");

/// Set the maximum range preset.
pub const RRAI: Opcode = Opcode(*b"RRAI");

/// Request the next frame of data.
pub const GNFD: Opcode = Opcode(*b"GNFD");

/// Disconnect from the sensor.
pub const GBYE: Opcode = Opcode(*b"GBYE");

impl Opcode {
    /// Validate a tag. Fails with `InvalidOpcode` unless it is exactly four
    /// ASCII bytes.
    pub fn new(tag: &[u8]) -> Result<Self> {
        let bytes: [u8; 4] = tag
            .try_into()
            .map_err(|_| FrameError::InvalidOpcode(tag.to_vec()))?;
        if !bytes.is_ascii() {
            return Err(FrameError::InvalidOpcode(tag.to_vec()));
        }
        Ok(Self(bytes))
    }

    /// Raw tag bytes as sent on the wire.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Tag as text.
    pub fn as_str(&self) -> &str {
        // Constructed from ASCII only.
        std::str::from_utf8(&self.0).unwrap_or("????")
    }

    /// Human-readable description of a known opcode.
    pub fn describe(&self) -> &'static str {
        match *self {
            INIT => "initialize",
            RSPI => "set max speed",
            RRAI => "set max range",
            GNFD => "get next frame data",
            GBYE => "disconnect",
            _ => "unknown",
        }
    }
}

impl TryFrom<&str> for Opcode {
    type Error = FrameError;

    fn try_from(tag: &str) -> Result<Self> {
        Self::new(tag.as_bytes())
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opcode({})", self.as_str())
    }
}
