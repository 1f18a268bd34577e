//! Scriptable in-process collaborators for tests and offline runs.

use crate::analysis::emotion::EmotionVector;
use crate::analysis::service::{
    EmotionScorer, EmotionScores, ServiceError, SpeechToText, Transcription,
};
use crate::audio::types::AudioSegment;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type TranscribeFn = dyn Fn(&AudioSegment) -> Result<Transcription, ServiceError> + Send + Sync;
type ScoreFn = dyn Fn(&str) -> Result<EmotionScores, ServiceError> + Send + Sync;

/// Mock speech-to-text collaborator.
#[derive(Clone)]
pub struct MockSpeechToText {
    name: String,
    response: String,
    confidence: f64,
    failure: Option<ServiceError>,
    fail_first: usize,
    handler: Option<Arc<TranscribeFn>>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockSpeechToText {
    /// Create a mock that returns "mock transcription" with confidence 1.0.
    pub fn new() -> Self {
        Self {
            name: "mock-stt".to_string(),
            response: "mock transcription".to_string(),
            confidence: 1.0,
            failure: None,
            fail_first: 0,
            handler: None,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Configure the mock to return a specific transcript.
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Configure the mock to fail every call with `error`.
    pub fn with_failure(mut self, error: ServiceError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Fail the first `times` calls with `error`, then answer normally.
    pub fn failing_times(mut self, times: usize, error: ServiceError) -> Self {
        self.fail_first = times;
        self.failure = Some(error);
        self
    }

    /// Answer every call with `handler` (overrides fixed responses).
    pub fn from_fn<F>(handler: F) -> Self
    where
        F: Fn(&AudioSegment) -> Result<Transcription, ServiceError> + Send + Sync + 'static,
    {
        Self {
            handler: Some(Arc::new(handler)),
            ..Self::new()
        }
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `transcribe` calls made so far (shared across clones).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockSpeechToText {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SpeechToText for MockSpeechToText {
    async fn transcribe(&self, segment: &AudioSegment) -> Result<Transcription, ServiceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = &self.failure
            && (self.fail_first == 0 || call < self.fail_first)
        {
            return Err(error.clone());
        }
        if let Some(handler) = &self.handler {
            return handler(segment);
        }
        Ok(Transcription::new(self.response.clone(), self.confidence))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Mock emotion-scoring collaborator.
#[derive(Clone)]
pub struct MockEmotionScorer {
    name: String,
    scores: EmotionVector,
    confidence: f64,
    failure: Option<ServiceError>,
    fail_first: usize,
    handler: Option<Arc<ScoreFn>>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockEmotionScorer {
    /// Create a mock that returns the neutral vector with confidence 1.0.
    pub fn new() -> Self {
        Self {
            name: "mock-nlu".to_string(),
            scores: EmotionVector::neutral(),
            confidence: 1.0,
            failure: None,
            fail_first: 0,
            handler: None,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_scores(mut self, scores: EmotionVector) -> Self {
        self.scores = scores;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Configure the mock to fail every call with `error`.
    pub fn with_failure(mut self, error: ServiceError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Fail the first `times` calls with `error`, then answer normally.
    pub fn failing_times(mut self, times: usize, error: ServiceError) -> Self {
        self.fail_first = times;
        self.failure = Some(error);
        self
    }

    /// Answer every call with `handler` (overrides fixed scores).
    pub fn from_fn<F>(handler: F) -> Self
    where
        F: Fn(&str) -> Result<EmotionScores, ServiceError> + Send + Sync + 'static,
    {
        Self {
            handler: Some(Arc::new(handler)),
            ..Self::new()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `score` calls made so far (shared across clones).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockEmotionScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EmotionScorer for MockEmotionScorer {
    async fn score(&self, text: &str) -> Result<EmotionScores, ServiceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = &self.failure
            && (self.fail_first == 0 || call < self.fail_first)
        {
            return Err(error.clone());
        }
        if let Some(handler) = &self.handler {
            return handler(text);
        }
        Ok(EmotionScores::new(self.scores, self.confidence))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
