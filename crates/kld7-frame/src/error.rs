use crate::ack::AckError;

/// Errors that can occur while encoding commands or decoding responses.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The opcode is not exactly four ASCII bytes.
    #[error("invalid opcode {0:?} (expected 4 ASCII bytes)")]
    InvalidOpcode(Vec<u8>),

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The acknowledgment was missing, short or negative.
    #[error(transparent)]
    Ack(#[from] AckError),

    /// The detection header ended before its 8 bytes arrived.
    #[error("detection header truncated ({got} of 8 bytes)")]
    TruncatedHeader { got: usize },

    /// The target payload ended before all fields arrived.
    #[error("target payload truncated ({got} of {expected} bytes)")]
    TruncatedPayload { expected: usize, got: usize },

    /// An I/O error other than a read timeout.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link accepted no more bytes while a command was being written.
    #[error("link closed while writing a command")]
    ConnectionClosed,
}

impl FrameError {
    /// Returns true for errors raised by the link itself rather than by the
    /// bytes the device sent.
    pub fn is_io(&self) -> bool {
        matches!(self, FrameError::Io(_) | FrameError::ConnectionClosed)
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
