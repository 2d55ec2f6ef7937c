//! Error types for chatrelay.

use thiserror::Error;

/// Common error type for chatrelay.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Join handshake event was missing a required field or had the wrong type.
    #[error("malformed join request: {0}")]
    MalformedJoinRequest(String),

    /// Room identifier was empty or otherwise disallowed.
    #[error("invalid room id: {0:?}")]
    InvalidRoomId(String),

    /// Post-join event with a wrong or missing type.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Publish/subscribe call to the distribution bus failed.
    #[error("distribution bus unavailable: {0}")]
    BridgeUnavailable(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for chatrelay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
