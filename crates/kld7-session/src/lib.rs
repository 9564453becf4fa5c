//! Session management for the K-LD7 radar.
//!
//! This is the layer that talks to the sensor: it initializes the link,
//! renegotiates the baud rate, applies the speed and range presets, polls
//! tracked-target frames and says goodbye. The sequencing is an explicit
//! state machine ([`state::transition`]) so each step can be exercised
//! without a device.

pub mod cancel;
pub mod capture;
pub mod config;
pub mod error;
pub mod session;
pub mod state;

pub use cancel::Cancellation;
pub use capture::Capture;
pub use config::{BaudRate, MaxRange, MaxSpeed, SessionConfig, SETTLE_DELAY, TDAT_REQUEST};
pub use error::{Result, SessionError};
pub use session::{run_session, CycleMiss, PollOutcome, SensorSession, SessionReport, SessionStats};
pub use state::{transition, Command, Effect, Event, SessionState, Transition};
