//! Error types for the protocol crate.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while applying changes or decoding frames.
///
/// Reconciliation itself never fails; these only come from checking caller
/// preconditions against concrete text and from malformed wire data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// An insert points past the end of the document.
    #[error("insert at {position} is past the end of a {len}-character document")]
    PositionOutOfRange {
        /// Requested character offset.
        position: usize,
        /// Document length in characters.
        len: usize,
    },

    /// A delete extends past the end of the document.
    #[error("delete of {amount} at {position} extends past the end of a {len}-character document")]
    RangeOutOfBounds {
        /// Start of the deleted range.
        position: usize,
        /// Number of characters to delete.
        amount: usize,
        /// Document length in characters.
        len: usize,
    },

    /// JSON decoding failed.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A frame parsed as JSON but has neither a response nor an event shape.
    #[error("unexpected frame: {0}")]
    UnexpectedFrame(String),
}
