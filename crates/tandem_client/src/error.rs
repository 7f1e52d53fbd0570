//! Error types for the client.

use std::fmt;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Why a connection stopped carrying calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// `MuxHandle::close` was called.
    ClosedByClient,
    /// The peer closed the connection.
    PeerClosed,
    /// The transport failed.
    Transport(String),
    /// Every handle to the multiplexer was dropped.
    HandleDropped,
    /// The multiplexer task ended without recording a reason.
    Stopped,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::ClosedByClient => f.write_str("closed by client"),
            CloseReason::PeerClosed => f.write_str("closed by peer"),
            CloseReason::Transport(message) => write!(f, "transport failed: {message}"),
            CloseReason::HandleDropped => f.write_str("all handles dropped"),
            CloseReason::Stopped => f.write_str("multiplexer stopped"),
        }
    }
}

/// Errors that can occur during calls and session operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The connection closed before or while the call was outstanding.
    #[error("connection closed: {0}")]
    Closed(CloseReason),

    /// The response did not have the shape the call expects.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Frame or change handling failed.
    #[error("codec error: {0}")]
    Codec(#[from] tandem_protocol::ProtocolError),

    /// The call payload could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// No response arrived within the configured call timeout.
    #[error("call timed out")]
    Timeout,

    /// The transport failed to send or receive.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },
}

impl ClientError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a protocol error for a response of the wrong kind.
    pub fn unexpected(expected: &str, actual: &str) -> Self {
        Self::Protocol(format!("expected a {expected} response, got {actual}"))
    }

    /// Returns true if the same call may succeed on the same connection.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport { retryable, .. } => *retryable,
            ClientError::Timeout => true,
            _ => false,
        }
    }

    /// Returns true if the connection is gone and a new session is needed.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, ClientError::Closed(_))
    }
}
