//! Acknowledgment frames.
//!
//! The sensor answers every command with exactly nine bytes; the last one is
//! the status. Anything other than nine bytes with a zero status is a
//! failure, and the failure kind says whether the device was silent, cut
//! off, or actively refused.

use std::fmt;

/// Length of an acknowledgment frame.
pub const ACK_LEN: usize = 9;

/// Offset of the status byte within an acknowledgment.
pub const ACK_STATUS_OFFSET: usize = 8;

/// Status codes reported in byte 8 of an acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckStatus {
    Ok,
    UnknownCommand,
    InvalidParameter,
    InvalidRpstVersion,
    UartError,
    SensorBusy,
    Timeout,
    Other(u8),
}

impl AckStatus {
    /// Map a raw status byte.
    pub fn from_byte(code: u8) -> Self {
        match code {
            0 => AckStatus::Ok,
            1 => AckStatus::UnknownCommand,
            2 => AckStatus::InvalidParameter,
            3 => AckStatus::InvalidRpstVersion,
            4 => AckStatus::UartError,
            5 => AckStatus::SensorBusy,
            6 => AckStatus::Timeout,
            other => AckStatus::Other(other),
        }
    }

    /// Raw status byte.
    pub fn code(self) -> u8 {
        match self {
            AckStatus::Ok => 0,
            AckStatus::UnknownCommand => 1,
            AckStatus::InvalidParameter => 2,
            AckStatus::InvalidRpstVersion => 3,
            AckStatus::UartError => 4,
            AckStatus::SensorBusy => 5,
            AckStatus::Timeout => 6,
            AckStatus::Other(code) => code,
        }
    }
}

impl fmt::Display for AckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AckStatus::Ok => f.write_str("ok"),
            AckStatus::UnknownCommand => f.write_str("unknown command"),
            AckStatus::InvalidParameter => f.write_str("invalid parameter value"),
            AckStatus::InvalidRpstVersion => f.write_str("invalid RPST version"),
            AckStatus::UartError => f.write_str("UART error (parity, framing or noise)"),
            AckStatus::SensorBusy => f.write_str("sensor busy"),
            AckStatus::Timeout => f.write_str("sensor timeout"),
            AckStatus::Other(code) => write!(f, "status {code:#04x}"),
        }
    }
}

/// Why an acknowledgment was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AckError {
    /// Nothing arrived before the read timeout.
    #[error("no acknowledgment before timeout")]
    Timeout,

    /// The acknowledgment stopped short of nine bytes.
    #[error("short acknowledgment ({got} of 9 bytes)")]
    ShortRead { got: usize },

    /// A well-formed acknowledgment carrying a failure status.
    #[error("command not acknowledged: {status}")]
    NotAcknowledged { status: AckStatus },

    /// More than nine bytes were handed in as one acknowledgment.
    #[error("acknowledgment overrun ({got} bytes, expected 9)")]
    Overrun { got: usize },
}

/// Validate an acknowledgment.
///
/// Succeeds only for exactly nine bytes with a zero status byte. Zero bytes is
/// the transport's timeout sentinel; excess bytes are a protocol violation
/// and are reported rather than trimmed.
pub fn decode_ack(bytes: &[u8]) -> Result<(), AckError> {
    match bytes.len() {
        0 => Err(AckError::Timeout),
        got if got < ACK_LEN => Err(AckError::ShortRead { got }),
        ACK_LEN => match AckStatus::from_byte(bytes[ACK_STATUS_OFFSET]) {
            AckStatus::Ok => Ok(()),
            status => Err(AckError::NotAcknowledged { status }),
        },
        got => Err(AckError::Overrun { got }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ack(status: u8) -> [u8; ACK_LEN] {
        [b'R', b'E', b'S', b'P', 1, 0, 0, 0, status]
    }

    #[test]
    fn zero_status_is_accepted() {
        assert_eq!(decode_ack(&ack(0)), Ok(()));
    }

    #[test]
    fn any_nine_byte_frame_with_zero_status_is_accepted() {
        let mut frame = [0xFFu8; ACK_LEN];
        frame[ACK_STATUS_OFFSET] = 0;
        assert_eq!(decode_ack(&frame), Ok(()));
    }

    #[test]
    fn every_nonzero_status_is_rejected() {
        for status in 1..=u8::MAX {
            let err = decode_ack(&ack(status)).unwrap_err();
            assert_eq!(
                err,
                AckError::NotAcknowledged {
                    status: AckStatus::from_byte(status)
                }
            );
        }
    }

    #[test]
    fn empty_read_is_timeout() {
        assert_eq!(decode_ack(&[]), Err(AckError::Timeout));
    }

    #[test]
    fn partial_reads_are_short() {
        let full = ack(0);
        for got in 1..ACK_LEN {
            assert_eq!(decode_ack(&full[..got]), Err(AckError::ShortRead { got }));
        }
    }

    #[test]
    fn excess_bytes_are_flagged() {
        let mut long = ack(0).to_vec();
        long.push(0);
        assert_eq!(decode_ack(&long), Err(AckError::Overrun { got: 10 }));
    }

    #[test]
    fn status_codes_roundtrip_and_describe() {
        for code in 0..=u8::MAX {
            assert_eq!(AckStatus::from_byte(code).code(), code);
        }
        assert_eq!(AckStatus::from_byte(5).to_string(), "sensor busy");
        assert_eq!(AckStatus::from_byte(0x42).to_string(), "status 0x42");
    }
}
