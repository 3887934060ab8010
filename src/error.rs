//! Error types for serialwire.

use thiserror::Error;

/// Main error type for all serialwire operations.
#[derive(Debug, Error)]
pub enum SerialwireError {
    /// I/O error outside of the transport write path (config files, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while loading configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The named serial channel could not be opened.
    #[error("Error opening serial port at {port}: {source}")]
    TransportOpen {
        port: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing a framed command to the transport failed.
    #[error("Error writing data: {0}")]
    TransportWrite(#[source] std::io::Error),

    /// Reading from the transport failed.
    #[error("Serial communication error: {0}")]
    TransportRead(#[source] std::io::Error),

    /// The transport accepted fewer bytes than the framed command holds.
    #[error("Cannot write all data: wrote {written} of {expected} bytes")]
    PartialWrite { written: usize, expected: usize },

    /// No transport is attached (never connected, or the last open failed).
    #[error("Serial port not connected")]
    NotConnected,

    /// The peer closed the byte stream.
    #[error("Connection closed")]
    ConnectionClosed,

    /// `extract_command` was called with no complete line buffered.
    #[error("No complete command available")]
    NoCommandAvailable,

    /// Field index past the end of a command.
    #[error("Field index {index} out of range for command with {len} fields")]
    IndexOutOfRange { index: usize, len: usize },

    /// Field text does not parse as the requested type.
    #[error("Field {index} ({value:?}) is not a valid {expected}")]
    MalformedField {
        index: usize,
        value: String,
        expected: &'static str,
    },

    /// The session task has stopped.
    #[error("Link session closed")]
    SessionClosed,
}

/// Result type alias using SerialwireError.
pub type Result<T> = std::result::Result<T, SerialwireError>;
