//! Error types for MocapLink

use std::time::Duration;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// MocapLink error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket-level send/receive failure. Fatal to the session.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A received datagram is not a single well-formed protocol element.
    /// Logged and dropped; the session continues.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Decoded response carries a tag no handler knows.
    /// Logged; the session continues.
    #[error("unrecognized response tag: {0}")]
    UnrecognizedResponse(String),

    /// No activity from the remote engine within the disconnect window.
    /// Fatal to the session.
    #[error("session timed out after {0:?} without activity")]
    SessionTimeout(Duration),

    /// A command value cannot be represented on the wire
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
