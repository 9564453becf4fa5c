//! Session configuration and device presets.
//!
//! Each configuration command carries a 4-byte little-endian preset index.
//! The enums below name the indices the sensor accepts.

use std::fmt;
use std::time::Duration;

use kld7_frame::{CommandFrame, GBYE, GNFD, INIT, RRAI, RSPI};

use crate::state::Command;

/// Pause between the `INIT` acknowledgment and the baud rate switch.
pub const SETTLE_DELAY: Duration = Duration::from_millis(75);

/// `GNFD` request bit selecting tracked-target data.
pub const TDAT_REQUEST: u32 = 0x08;

/// Line rate requested in `INIT` and used for the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BaudRate {
    B115200,
    B460800,
    B921600,
    #[default]
    B2000000,
}

impl BaudRate {
    /// All selectable rates, in index order.
    pub const ALL: [BaudRate; 4] = [
        BaudRate::B115200,
        BaudRate::B460800,
        BaudRate::B921600,
        BaudRate::B2000000,
    ];

    /// Preset index sent in the `INIT` payload.
    pub fn index(self) -> u32 {
        match self {
            BaudRate::B115200 => 0,
            BaudRate::B460800 => 1,
            BaudRate::B921600 => 2,
            BaudRate::B2000000 => 3,
        }
    }

    /// Bits per second.
    pub fn bits_per_second(self) -> u32 {
        match self {
            BaudRate::B115200 => 115_200,
            BaudRate::B460800 => 460_800,
            BaudRate::B921600 => 921_600,
            BaudRate::B2000000 => 2_000_000,
        }
    }

    /// Look up a rate by bits per second.
    pub fn from_bits_per_second(bps: u32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|rate| rate.bits_per_second() == bps)
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} baud", self.bits_per_second())
    }
}

/// Maximum measurable speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaxSpeed {
    Kmh12_5,
    #[default]
    Kmh25,
    Kmh50,
    Kmh100,
}

impl MaxSpeed {
    /// Preset index sent in the `RSPI` payload.
    pub fn index(self) -> u32 {
        match self {
            MaxSpeed::Kmh12_5 => 0,
            MaxSpeed::Kmh25 => 1,
            MaxSpeed::Kmh50 => 2,
            MaxSpeed::Kmh100 => 3,
        }
    }

    /// Limit in km/h.
    pub fn kmh(self) -> f64 {
        match self {
            MaxSpeed::Kmh12_5 => 12.5,
            MaxSpeed::Kmh25 => 25.0,
            MaxSpeed::Kmh50 => 50.0,
            MaxSpeed::Kmh100 => 100.0,
        }
    }
}

/// Maximum detection range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaxRange {
    M5,
    #[default]
    M10,
    M30,
    M100,
}

impl MaxRange {
    /// Preset index sent in the `RRAI` payload.
    pub fn index(self) -> u32 {
        match self {
            MaxRange::M5 => 0,
            MaxRange::M10 => 1,
            MaxRange::M30 => 2,
            MaxRange::M100 => 3,
        }
    }

    /// Limit in meters.
    pub fn meters(self) -> u32 {
        match self {
            MaxRange::M5 => 5,
            MaxRange::M10 => 10,
            MaxRange::M30 => 30,
            MaxRange::M100 => 100,
        }
    }
}

/// Configuration for a sensor session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Rate negotiated by `INIT`.
    pub baud_rate: BaudRate,
    /// Speed preset applied with `RSPI`.
    pub max_speed: MaxSpeed,
    /// Range preset applied with `RRAI`.
    pub max_range: MaxRange,
    /// Wait between the `INIT` acknowledgment and the rate switch.
    pub settle_delay: Duration,
    /// Read timeout applied together with the rate switch. `None` keeps the
    /// link's current timeout.
    pub streaming_timeout: Option<Duration>,
    /// Pause after each streaming cycle. Zero runs cycles back-to-back.
    pub pace: Duration,
    /// Stop after this many streaming cycles.
    pub max_cycles: Option<u64>,
    /// Give up after this many missed cycles in a row. `None` never gives up.
    pub max_consecutive_misses: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            baud_rate: BaudRate::default(),
            max_speed: MaxSpeed::default(),
            max_range: MaxRange::default(),
            settle_delay: SETTLE_DELAY,
            streaming_timeout: None,
            pace: Duration::ZERO,
            max_cycles: None,
            max_consecutive_misses: None,
        }
    }
}

impl SessionConfig {
    /// Build the wire frame for a command under this configuration.
    pub fn frame_for(&self, command: Command) -> CommandFrame {
        match command {
            Command::Init => CommandFrame::with_value(INIT, self.baud_rate.index()),
            Command::SetMaxSpeed => CommandFrame::with_value(RSPI, self.max_speed.index()),
            Command::SetMaxRange => CommandFrame::with_value(RRAI, self.max_range.index()),
            Command::NextFrame => CommandFrame::with_value(GNFD, TDAT_REQUEST),
            Command::Goodbye => CommandFrame::empty(GBYE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_frames_match_device_defaults() {
        let cfg = SessionConfig::default();

        let init = cfg.frame_for(Command::Init);
        assert_eq!(init.opcode, INIT);
        assert_eq!(init.value(), Some(3));

        assert_eq!(cfg.frame_for(Command::SetMaxSpeed).value(), Some(1));
        assert_eq!(cfg.frame_for(Command::SetMaxRange).value(), Some(1));
        assert_eq!(cfg.frame_for(Command::NextFrame).value(), Some(8));

        let bye = cfg.frame_for(Command::Goodbye);
        assert_eq!(bye.opcode, GBYE);
        assert!(bye.payload.is_empty());
    }

    #[test]
    fn default_rate_is_two_megabaud() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.baud_rate.bits_per_second(), 2_000_000);
        assert_eq!(cfg.settle_delay, Duration::from_millis(75));
    }

    #[test]
    fn baud_lookup() {
        assert_eq!(
            BaudRate::from_bits_per_second(921_600),
            Some(BaudRate::B921600)
        );
        assert_eq!(BaudRate::from_bits_per_second(9_600), None);
        for (index, rate) in BaudRate::ALL.into_iter().enumerate() {
            assert_eq!(rate.index() as usize, index);
        }
    }

    #[test]
    fn presets_follow_index_order() {
        assert_eq!(MaxSpeed::Kmh50.index(), 2);
        assert_eq!(MaxSpeed::Kmh12_5.kmh(), 12.5);
        assert_eq!(MaxRange::M30.index(), 2);
        assert_eq!(MaxRange::M100.meters(), 100);
    }
}
