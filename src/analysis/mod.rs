//! Transcript analysis: speech-to-text and emotion scoring per segment.

pub mod analyzer;
pub mod emotion;
#[cfg(feature = "remote")]
pub mod http;
pub mod mock;
pub mod pool;
pub mod record;
pub mod retry;
pub mod service;

pub use analyzer::{AnalysisConfig, TranscriptAnalyzer};
pub use emotion::{EmotionDimension, EmotionVector};
pub use pool::WorkerPool;
pub use record::{RecordOutcome, TranscriptRecord};
pub use retry::RetryPolicy;
pub use service::{EmotionScorer, EmotionScores, ServiceError, SpeechToText, Transcription};
