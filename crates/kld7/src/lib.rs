//! Host-side driver for the RFbeam K-LD7 24 GHz radar.
//!
//! kld7 talks to the sensor over its serial protocol: it brings the link up,
//! applies the speed and range presets, polls tracked-target telemetry and
//! shuts the sensor down cleanly.
//!
//! # Crate Structure
//!
//! - [`transport`]: Serial link abstraction (serialport backend, scripted mock)
//! - [`frame`]: Command frames, acknowledgments and target decoding
//! - [`session`]: Session state machine and streaming loop
//!
//! # Example
//!
//! ```no_run
//! use kld7::session::{run_session, Cancellation, PollOutcome, SessionConfig};
//! use kld7::transport::{SerialConfig, SerialLink};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let link = SerialLink::open(&SerialConfig::new("/dev/ttyUSB0"))?;
//! let cancel = Cancellation::new();
//! let report = run_session(link, SessionConfig::default(), &cancel, |outcome| {
//!     if let PollOutcome::Target(capture) = outcome {
//!         println!("{:.0} cm", capture.target.distance_cm);
//!     }
//! });
//! report.outcome?;
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use kld7_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use kld7_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use kld7_session::*;
}
