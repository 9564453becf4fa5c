//! Wire formats of the K-LD7 command/response protocol.
//!
//! Every command the host sends is framed as:
//! - a 4-byte ASCII opcode (`INIT`, `RSPI`, `RRAI`, `GNFD`, `GBYE`)
//! - a 4-byte little-endian payload length
//! - the payload itself
//!
//! The sensor answers each command with a 9-byte acknowledgment and, for
//! `GNFD`, an 8-byte detection header optionally followed by an 8-byte
//! tracked-target payload. Reads are bounded and length-checked: a short or
//! silent device is always a distinguishable error, never a partial value.

pub mod ack;
pub mod codec;
pub mod detection;
pub mod error;
pub mod opcode;
pub mod reader;
pub mod writer;

pub use ack::{decode_ack, AckError, AckStatus, ACK_LEN, ACK_STATUS_OFFSET};
pub use codec::{
    decode_command, encode_command, CommandFrame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE,
};
pub use detection::{
    decode_detection, DetectionHeader, RawTarget, Target, DETECTION_HEADER_LEN,
    TARGET_FLAG_OFFSET, TARGET_PAYLOAD_LEN,
};
pub use error::{FrameError, Result};
pub use opcode::{Opcode, GBYE, GNFD, INIT, RRAI, RSPI};
pub use reader::{read_up_to, ResponseReader};
pub use writer::CommandWriter;
