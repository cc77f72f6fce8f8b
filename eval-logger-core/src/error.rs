//! Errors in the library.
use std::path::PathBuf;
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug)]
pub enum EvalLoggerError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// An episode without frames was given to a configured visualizer.
    #[error("Episode {0} has no frames to visualize")]
    EmptyFrames(usize),

    /// Metrics can not be logged without a prefix.
    #[error("Logging prefix of episode {0} is empty")]
    EmptyPrefix(usize),

    /// A configuration value is out of its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Metadata has already been written for the session.
    #[error("Metadata already exists at {0:?}")]
    MetadataExists(PathBuf),

    /// No episode with the given index in the session directory.
    #[error("Episode {0} not found")]
    EpisodeNotFound(usize),

    /// Robot type is not one of the known types.
    #[error("Unknown robot type: {0}")]
    UnknownRobotType(String),
}
