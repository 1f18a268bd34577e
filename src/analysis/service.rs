//! Contracts for the external speech-to-text and emotion-scoring collaborators.
//!
//! Both are fallible remote calls. Implementations map every failure onto
//! [`ServiceError`] so the retry policy can tell transient from permanent
//! failures without knowing the transport.

use crate::analysis::emotion::EmotionVector;
use crate::audio::types::AudioSegment;
use std::sync::Arc;
use thiserror::Error;

/// Uniform failure signal from a remote collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Authentication or quota error: {0}")]
    Auth(String),

    #[error("Unsupported audio: {0}")]
    UnsupportedAudio(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Call cancelled")]
    Cancelled,
}

impl ServiceError {
    /// Whether repeating the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ServiceError::Network(_)
                | ServiceError::Timeout(_)
                | ServiceError::RateLimited(_)
                | ServiceError::Unavailable(_)
        )
    }
}

/// Output of the speech-to-text collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    pub text: String,
    /// Word-level confidence aggregated over the utterance (0.0 to 1.0).
    pub confidence: f64,
}

impl Transcription {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Output of the emotion-scoring collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionScores {
    pub emotion: EmotionVector,
    /// Document-level confidence (0.0 to 1.0).
    pub confidence: f64,
}

impl EmotionScores {
    pub fn new(emotion: EmotionVector, confidence: f64) -> Self {
        Self {
            emotion,
            confidence,
        }
    }
}

/// Speech-to-text collaborator.
///
/// This trait allows swapping implementations (remote service vs mock).
#[async_trait::async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe one utterance segment.
    async fn transcribe(&self, segment: &AudioSegment) -> Result<Transcription, ServiceError>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

/// Emotion-scoring (NLU) collaborator.
#[async_trait::async_trait]
pub trait EmotionScorer: Send + Sync {
    /// Score the emotions expressed in `text`.
    async fn score(&self, text: &str) -> Result<EmotionScores, ServiceError>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

#[async_trait::async_trait]
impl<T: SpeechToText + ?Sized> SpeechToText for Arc<T> {
    async fn transcribe(&self, segment: &AudioSegment) -> Result<Transcription, ServiceError> {
        (**self).transcribe(segment).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait::async_trait]
impl<T: EmotionScorer + ?Sized> EmotionScorer for Arc<T> {
    async fn score(&self, text: &str) -> Result<EmotionScores, ServiceError> {
        (**self).score(text).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
