use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::opcode::Opcode;

/// Command header: opcode (4) + length (4) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Default maximum payload accepted by [`decode_command`] and the writer.
///
/// Every command the host sends carries at most a 4-byte parameter; the cap
/// only guards the decoder against garbage length fields.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024;

/// A command frame ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    /// Command tag.
    pub opcode: Opcode,
    /// Command parameter bytes.
    pub payload: Bytes,
}

impl CommandFrame {
    /// Create a new frame.
    pub fn new(opcode: Opcode, payload: impl Into<Bytes>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    /// Frame with a single little-endian `u32` parameter (the shape of every
    /// configuration command).
    pub fn with_value(opcode: Opcode, value: u32) -> Self {
        Self::new(opcode, Bytes::copy_from_slice(&value.to_le_bytes()))
    }

    /// Frame with no parameter.
    pub fn empty(opcode: Opcode) -> Self {
        Self::new(opcode, Bytes::new())
    }

    /// Parameter as a little-endian `u32`, if the payload is exactly 4 bytes.
    pub fn value(&self) -> Option<u32> {
        let bytes: [u8; 4] = self.payload.as_ref().try_into().ok()?;
        Some(u32::from_le_bytes(bytes))
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Append the wire encoding to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        encode_into(&self.opcode, self.payload.as_ref(), dst)
    }
}

/// Encode a command into its wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬───────────┬─────────────────┐
/// │ Opcode (4B)  │ Length    │ Payload         │
/// │ ASCII        │ (4B LE)   │ (Length bytes)  │
/// └──────────────┴───────────┴─────────────────┘
/// ```
///
/// Fails with `InvalidOpcode` unless `opcode` is exactly four ASCII bytes.
pub fn encode_command(opcode: &[u8], payload: &[u8]) -> Result<Bytes> {
    let opcode = Opcode::new(opcode)?;
    let mut dst = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    encode_into(&opcode, payload, &mut dst)?;
    Ok(dst.freeze())
}

fn encode_into(opcode: &Opcode, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(opcode.as_bytes());
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a command frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_command(src: &mut BytesMut, max_payload: usize) -> Result<Option<CommandFrame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    let opcode = Opcode::new(&src[0..4])?;
    let mut len_field = &src[4..8];
    let payload_len = len_field.get_u32_le() as usize;

    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(CommandFrame { opcode, payload }))
}

/// Configuration for the command codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 1 KiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}
