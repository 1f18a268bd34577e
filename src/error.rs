//! Error types for memsculpt.

use std::fmt;
use thiserror::Error;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Preprocess,
    Analysis,
    Timeline,
    Generation,
    Export,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Config => "config",
            Stage::Preprocess => "preprocess",
            Stage::Analysis => "analysis",
            Stage::Timeline => "timeline",
            Stage::Generation => "generation",
            Stage::Export => "export",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum SculptError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Failed to read configuration file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    ConfigDirUnavailable,

    // Audio input errors
    #[error("Failed to read recording {path}: {source}")]
    RecordingRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid audio: {message}")]
    InvalidAudio { message: String },

    #[error("Failed to decode recording: {message}")]
    AudioDecode { message: String },

    // Analysis errors
    #[error("Failed to encode segment audio: {message}")]
    AudioEncode { message: String },

    #[error("Analysis worker pool failed: {0}")]
    WorkerPool(#[from] crate::analysis::pool::PoolError),

    #[error(
        "Partial analysis: {completed} of {total} segments finished before the run deadline"
    )]
    PartialAnalysis { completed: usize, total: usize },

    // Timeline errors
    #[error("Invalid timeline: {message}")]
    InvalidTimeline { message: String },

    // Geometry errors
    #[error("Geometry construction failed at sample {sample_index} (t={time_secs:.2}s): {reason}")]
    GeometryConstruction {
        sample_index: usize,
        time_secs: f64,
        reason: String,
    },

    // Export/import errors
    #[error("Export failed: {message}")]
    Export { message: String },

    #[error("Import failed: {message}")]
    Import { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Export I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SculptError {
    /// Stage the error is attributed to.
    pub fn stage(&self) -> Stage {
        match self {
            SculptError::ConfigFileNotFound { .. }
            | SculptError::ConfigInvalidValue { .. }
            | SculptError::Config(_)
            | SculptError::ConfigRead { .. }
            | SculptError::ConfigSerialize(_)
            | SculptError::ConfigDirUnavailable => Stage::Config,
            SculptError::RecordingRead { .. }
            | SculptError::InvalidAudio { .. }
            | SculptError::AudioDecode { .. } => Stage::Preprocess,
            SculptError::AudioEncode { .. }
            | SculptError::WorkerPool(_)
            | SculptError::PartialAnalysis { .. } => Stage::Analysis,
            SculptError::InvalidTimeline { .. } => Stage::Timeline,
            SculptError::GeometryConstruction { .. } => Stage::Generation,
            SculptError::Export { .. }
            | SculptError::Import { .. }
            | SculptError::Serialization(_)
            | SculptError::Io(_) => Stage::Export,
        }
    }

    /// Whether re-running the whole pipeline on the same input may succeed.
    ///
    /// Deadline and output I/O failures depend on the environment; everything
    /// else is a deterministic function of the input and the configuration.
    pub fn is_transient(&self) -> bool {
        matches!(self, SculptError::PartialAnalysis { .. } | SculptError::Io(_))
    }

    /// Recording time (seconds) the error points at, if any.
    pub fn time_secs(&self) -> Option<f64> {
        match self {
            SculptError::GeometryConstruction { time_secs, .. } => Some(*time_secs),
            _ => None,
        }
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, SculptError>;
