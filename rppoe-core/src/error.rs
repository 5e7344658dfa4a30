//! Error types for the rppoe client

use thiserror::Error;

/// Result type alias for rppoe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the rppoe client.
///
/// Only caller-facing failures live here. Malformed or suspicious wire
/// input is never surfaced as an error: such packets are silently
/// dropped by the worker, matching the protocol's best-effort
/// discovery semantics.
#[derive(Error, Debug)]
pub enum Error {
    /// Network I/O error
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid parameter error
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Interface not found
    #[error("Interface '{0}' not found")]
    InterfaceNotFound(String),

    /// Interface error
    #[error("Interface error: {0}")]
    Interface(String),

    /// Operation requires an established session
    #[error("Session not established")]
    SessionNotEstablished,

    /// Connect called while discovery is in progress or a session is
    /// already active
    #[error("Invalid session state: discovery in progress or session active")]
    InvalidSessionState,

    /// The caller-supplied connect timeout elapsed
    #[error("Session connect timed out")]
    ConnectTimeout,

    /// Discovery retries were exhausted without a response
    #[error("Session connect failed: discovery retries exhausted")]
    ConnectFailed,

    /// No free transmit buffer
    #[error("No transmit buffer available")]
    NoTxBuffer,

    /// Outbound payload does not fit the transmit buffer
    #[error("Packet payload error: {0}")]
    Payload(#[from] rppoe_packet::CodecError),

    /// The client worker has shut down
    #[error("Client is shut down")]
    Closed,
}

impl Error {
    /// Create an invalid parameter error
    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an interface error with a custom message
    pub fn interface<S: Into<String>>(msg: S) -> Self {
        Error::Interface(msg.into())
    }
}
