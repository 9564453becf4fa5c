//! Tracked-target telemetry.
//!
//! A `GNFD` request for target data is answered with an 8-byte header. Byte 4
//! carries the target flag (the device reports the payload length there), so
//! a value above one means an 8-byte target payload follows:
//!
//! ```text
//! ┌──────────────┬────────────┬────────────┬──────────────┐
//! │ Distance     │ Speed      │ Angle      │ Magnitude    │
//! │ u16 LE, cm   │ i16 LE,    │ i16 LE,    │ u16 LE       │
//! │              │ km/h x 100 │ deg x 100  │              │
//! └──────────────┴────────────┴────────────┴──────────────┘
//! ```

use std::io::Read;

use bytes::Buf;
use serde::{Deserialize, Serialize};

use crate::error::{FrameError, Result};
use crate::reader::read_up_to;

/// Length of the detection header.
pub const DETECTION_HEADER_LEN: usize = 8;

/// Offset of the target flag within the header.
pub const TARGET_FLAG_OFFSET: usize = 4;

/// Length of the target payload.
pub const TARGET_PAYLOAD_LEN: usize = 8;

/// The 8-byte header preceding an optional target payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionHeader([u8; DETECTION_HEADER_LEN]);

impl DetectionHeader {
    /// Wrap exactly eight header bytes. Shorter input fails with
    /// `TruncatedHeader`; only the first eight bytes of longer input are used.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; DETECTION_HEADER_LEN] = bytes
            .get(..DETECTION_HEADER_LEN)
            .and_then(|head| head.try_into().ok())
            .ok_or(FrameError::TruncatedHeader { got: bytes.len() })?;
        Ok(Self(raw))
    }

    /// Raw header bytes.
    pub fn as_bytes(&self) -> &[u8; DETECTION_HEADER_LEN] {
        &self.0
    }

    /// Target count/flag byte.
    pub fn target_flag(&self) -> u8 {
        self.0[TARGET_FLAG_OFFSET]
    }

    /// Returns true when a target payload follows.
    pub fn has_target(&self) -> bool {
        self.target_flag() > 1
    }
}

/// Target fields exactly as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTarget {
    pub distance: u16,
    pub speed: i16,
    pub angle: i16,
    pub magnitude: u16,
}

impl RawTarget {
    /// Parse the four little-endian fields in wire order.
    pub fn parse(payload: &[u8; TARGET_PAYLOAD_LEN]) -> Self {
        let mut buf = &payload[..];
        Self {
            distance: buf.get_u16_le(),
            speed: buf.get_i16_le(),
            angle: buf.get_i16_le(),
            magnitude: buf.get_u16_le(),
        }
    }
}

/// One decoded detection in physical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Radial distance in centimeters.
    pub distance_cm: f64,
    /// Radial speed in km/h (positive when receding).
    pub speed_kmh: f64,
    /// Azimuth in degrees.
    pub angle_deg: f64,
    /// Signal magnitude.
    pub magnitude: f64,
    /// Lateral position in centimeters.
    pub x_cm: f64,
    /// Forward position in centimeters.
    pub y_cm: f64,
}

impl Target {
    /// Convert wire fields and project onto the sensor plane.
    pub fn from_raw(raw: RawTarget) -> Self {
        let distance_cm = f64::from(raw.distance);
        let speed_kmh = f64::from(raw.speed) / 100.0;
        let angle_deg = f64::from(raw.angle) / 100.0;
        let angle_rad = angle_deg.to_radians();

        Self {
            distance_cm,
            speed_kmh,
            angle_deg,
            magnitude: f64::from(raw.magnitude),
            x_cm: -(distance_cm * angle_rad.sin()),
            y_cm: distance_cm * angle_rad.cos(),
        }
    }

    /// Returns true if the target moves away from the sensor.
    pub fn is_receding(&self) -> bool {
        self.speed_kmh > 0.0
    }
}

/// Decode the target announced by `header`, reading its payload from
/// `payload`.
///
/// Returns `Ok(None)` without touching `payload` when the header flag is 0 or
/// 1. Otherwise reads exactly eight bytes; fewer fails with
/// `TruncatedPayload` and no target is produced.
pub fn decode_detection<R: Read>(
    header: &DetectionHeader,
    payload: &mut R,
) -> Result<Option<Target>> {
    if !header.has_target() {
        return Ok(None);
    }

    let bytes = read_up_to(payload, TARGET_PAYLOAD_LEN)?;
    let raw: &[u8; TARGET_PAYLOAD_LEN] =
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| FrameError::TruncatedPayload {
                expected: TARGET_PAYLOAD_LEN,
                got: bytes.len(),
            })?;

    let target = Target::from_raw(RawTarget::parse(raw));
    tracing::trace!(?target, "decoded target");
    Ok(Some(target))
}
