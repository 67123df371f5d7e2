//! Error types for the countdown engine and its collaborators

use thiserror::Error;

/// Failures of the storage collaborator.
///
/// Any of these leaves the engine `Idle`: a record that cannot be read or
/// written is treated as "no active timer".
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The backend could not be read or written
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be decoded or violates the record invariants
    #[error("malformed record under '{key}': {message}")]
    Malformed { key: String, message: String },

    /// A value could not be encoded before writing
    #[error("failed to encode '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        PersistenceError::Unavailable(err.to_string())
    }
}

/// Failures while scheduling or delivering a notification/alarm.
///
/// Non-fatal: the countdown keeps running.
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with failure: {stderr}")]
    CommandFailed { program: String, stderr: String },

    #[error("notification command '{0}' is not available")]
    Unavailable(String),
}

/// Errors surfaced by the countdown engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("countdown duration must be greater than zero")]
    InvalidDuration,

    #[error("a countdown is already running with {remaining}s left")]
    AlreadyRunning { remaining: u64 },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Invalid command line configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid hour range {min}..={max}: minimum must be at least 1 and not above the maximum")]
    InvalidHourRange { min: u32, max: u32 },

    #[error("seconds per hour must be greater than zero")]
    InvalidHourLength,
}
