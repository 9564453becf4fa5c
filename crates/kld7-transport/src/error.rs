/// Errors that can occur on the serial link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the specified port.
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// The port rejected a line setting (baud rate, timeout).
    #[error("failed to configure serial port: {0}")]
    Configure(#[from] serialport::Error),

    /// An I/O error occurred on the link.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link has already been closed.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Returns true if the error leaves the link unusable for further exchanges.
    pub fn is_link_lost(&self) -> bool {
        match self {
            TransportError::Closed | TransportError::Open { .. } => true,
            TransportError::Io(err) => !matches!(
                err.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::Interrupted
            ),
            TransportError::Configure(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
