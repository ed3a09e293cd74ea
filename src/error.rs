//! Error types for the frame streaming pipeline

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::registry::ObjectId;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Connect error: {0}")]
    Connect(#[from] ConnectError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which end of a connection an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Sink,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => f.write_str("source"),
            Side::Sink => f.write_str("sink"),
        }
    }
}

/// Reasons a `connect` call can fail
///
/// None of these are fatal: the manager state is left exactly as it was
/// before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("Connection {src} -> {sink} already exists")]
    AlreadyConnected { src: ObjectId, sink: ObjectId },

    #[error("Object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("Object {0} is not a stream source of the requested type")]
    NotASource(ObjectId),

    #[error("Object {0} is not a stream sink of the requested type")]
    NotASink(ObjectId),

    #[error("Frame type mismatch: source produces {source_type}, sink accepts {sink_type}")]
    FrameTypeMismatch {
        source_type: &'static str,
        sink_type: &'static str,
    },

    #[error("The {side} {endpoint} refused a new subscriber")]
    SubscriptionFailed { endpoint: ObjectId, side: Side },

    #[error("Failed to spawn pump worker: {0}")]
    WorkerSpawn(String),
}

impl ConnectError {
    /// Whether the request was rejected before any subscription was attempted
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            ConnectError::AlreadyConnected { .. }
                | ConnectError::ObjectNotFound(_)
                | ConnectError::NotASource(_)
                | ConnectError::NotASink(_)
                | ConnectError::FrameTypeMismatch { .. }
        )
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;
