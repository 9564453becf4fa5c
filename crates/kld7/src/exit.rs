use std::fmt;
use std::io;

use kld7_frame::{AckError, FrameError};
use kld7_session::SessionError;
use kld7_transport::TransportError;

use crate::persist::PersistError;

// Exit codes follow the sysexits-style table used across the CLI.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INIT_FAILED: i32 = 70;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotConnected | io::ErrorKind::BrokenPipe | io::ErrorKind::NotFound => {
            TRANSPORT_ERROR
        }
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::Ack(AckError::Timeout) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        FrameError::Ack(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        FrameError::ConnectionClosed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        FrameError::InvalidOpcode(_)
        | FrameError::PayloadTooLarge { .. }
        | FrameError::TruncatedHeader { .. }
        | FrameError::TruncatedPayload { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::Frame(err) => frame_error(context, err),
        SessionError::InitializationFailed(_) => {
            CliError::new(INIT_FAILED, format!("{context}: {err}"))
        }
        SessionError::MissedCycleLimit { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn persist_error(context: &str, err: PersistError) -> CliError {
    let code = match &err {
        PersistError::Missing(_) => FAILURE,
        PersistError::Empty(_) | PersistError::InvalidRow { .. } | PersistError::Read { .. } => {
            DATA_INVALID
        }
        PersistError::Write { .. } => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use kld7_frame::AckStatus;

    use super::*;

    #[test]
    fn init_failure_has_its_own_code() {
        let err = session_error(
            "session failed",
            SessionError::InitializationFailed(AckError::Timeout),
        );
        assert_eq!(err.code, INIT_FAILED);
        assert!(err.message.starts_with("session failed: "));
    }

    #[test]
    fn lost_link_is_a_transport_error() {
        let err = session_error(
            "session failed",
            SessionError::Frame(FrameError::Io(io::Error::from(io::ErrorKind::BrokenPipe))),
        );
        assert_eq!(err.code, TRANSPORT_ERROR);

        let err = transport_error("open failed", TransportError::Closed);
        assert_eq!(err.code, TRANSPORT_ERROR);
    }

    #[test]
    fn ack_errors_map_by_kind() {
        assert_eq!(
            frame_error("x", FrameError::Ack(AckError::Timeout)).code,
            TIMEOUT
        );
        assert_eq!(
            frame_error(
                "x",
                FrameError::Ack(AckError::NotAcknowledged {
                    status: AckStatus::SensorBusy
                })
            )
            .code,
            FAILURE
        );
    }

    #[test]
    fn miss_limit_is_a_timeout() {
        let err = session_error("x", SessionError::MissedCycleLimit { count: 5 });
        assert_eq!(err.code, TIMEOUT);
    }
}
