//! Error types for the bridge.
//!
//! Each concern gets its own error so callers can decide between retrying,
//! skipping the cycle, or dropping a single client. None of these are fatal
//! to the process.

use std::path::PathBuf;

use thiserror::Error;

/// The serial device could not be opened or read.
///
/// Recovered by reopening the transport on the next cycle.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Opening the device failed.
    #[error("Failed to open {device}: {reason}")]
    Open { device: String, reason: String },

    /// Reading from an open device failed.
    #[error("Read from {device} failed: {source}")]
    Read {
        device: String,
        #[source]
        source: std::io::Error,
    },

    /// The transport was read while closed.
    #[error("Transport is not open")]
    NotOpen,

    /// The line producer went away.
    #[error("Line source closed")]
    Closed,
}

/// The `EXC` or `ALARM` field could not be turned into a bitmask.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BitmaskError {
    /// The field is absent from the line.
    #[error("Missing {0} field")]
    Missing(&'static str),

    /// The field is not hexadecimal.
    #[error("{field} is not hexadecimal: '{value}'")]
    NotHex { field: &'static str, value: String },
}

/// A device line could not be decoded.
///
/// The cycle is treated as having no data; alarm state carries forward.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The line has no room for the two timestamp tokens.
    #[error("Line too short for a timestamp: '{0}'")]
    Truncated(String),

    /// A field token is not `KEY=VALUE`.
    #[error("Malformed token '{0}'")]
    MalformedToken(String),

    #[error(transparent)]
    Bitmask(#[from] BitmaskError),
}

/// Alarm history could not be read from or written to disk.
///
/// The in-memory history stays authoritative.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not a valid history list.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize history: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Talking to a feed client failed.
///
/// Ends that client's connection only.
#[derive(Debug, Error)]
pub enum SendError {
    /// The websocket failed while sending or reading.
    #[error("Websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The peer is gone.
    #[error("Connection closed")]
    Closed,
}
