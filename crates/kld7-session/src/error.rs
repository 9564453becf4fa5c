use kld7_frame::{AckError, FrameError};
use kld7_transport::TransportError;

use crate::state::SessionState;

/// Errors that can end a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The sensor did not acknowledge `INIT`.
    #[error("sensor initialization failed: {0}")]
    InitializationFailed(AckError),

    /// An operation was requested in a state that does not allow it.
    #[error("{event} is not valid in state {state}")]
    InvalidTransition {
        state: SessionState,
        event: &'static str,
    },

    /// The caller-configured limit of consecutive missed cycles was reached.
    #[error("{count} consecutive cycles missed")]
    MissedCycleLimit { count: u32 },
}

impl SessionError {
    /// Returns true if the link can still carry a goodbye exchange.
    pub fn link_usable(&self) -> bool {
        match self {
            SessionError::Transport(err) => !err.is_link_lost(),
            SessionError::Frame(err) => !err.is_io(),
            _ => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
