//! Serial link abstraction for the RFbeam K-LD7 radar.
//!
//! This is the lowest layer of kld7. It exposes the [`SensorLink`] trait the
//! session drives (byte I/O plus in-session baud rate and timeout control)
//! and two implementations:
//! - [`SerialLink`] backed by the `serialport` crate
//! - [`MockLink`], a scripted in-memory link for tests and dry runs

pub mod error;
pub mod mock;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use mock::{LinkEvent, MockLink};
pub use serial::{SerialConfig, SerialLink, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT};
pub use traits::SensorLink;
