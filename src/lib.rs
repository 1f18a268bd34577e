//! memsculpt - Turn spoken recordings into printable emotion sculptures
//!
//! A recording is cut into utterances, each utterance is transcribed and
//! scored for emotion by external services, the scores become a timeline,
//! and the timeline is lofted into a closed solid.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod analysis;
pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod pipeline;
pub mod sculpture;
pub mod timeline;

// Collaborator seams
pub use analysis::service::{EmotionScorer, ServiceError, SpeechToText};

// Stages
pub use analysis::analyzer::TranscriptAnalyzer;
pub use audio::preprocessor::AudioPreprocessor;
pub use sculpture::SculptureGenerator;
pub use timeline::TimelineBuilder;

// Pipeline
pub use pipeline::{PipelineOutput, SculpturePipeline};

// Error handling
pub use error::{Result, SculptError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
