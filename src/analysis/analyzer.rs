//! Stage two: transcribe each segment and score its emotions.

use crate::analysis::pool::WorkerPool;
use crate::analysis::record::{RecordOutcome, TranscriptRecord};
use crate::analysis::retry::{RetryPolicy, retry_transient};
use crate::analysis::service::{EmotionScorer, ServiceError, SpeechToText};
use crate::audio::types::{AudioSegment, TimeSpan};
use crate::defaults;
use crate::error::{Result, SculptError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

/// Analysis configuration (the `[analysis]` config section).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Concurrent segment jobs.
    pub workers: usize,
    /// Jobs that may wait in the queue before submission blocks.
    pub queue_capacity: usize,
    /// Whole-run analysis deadline in seconds (0 disables).
    pub run_timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            workers: defaults::WORKERS,
            queue_capacity: defaults::QUEUE_CAPACITY,
            run_timeout_secs: defaults::RUN_TIMEOUT_SECS,
        }
    }
}

/// Turns audio segments into transcript records through the two collaborators.
///
/// Per-segment failures never fail the run: they become failed records.
/// Only cancellation of the run aborts [`TranscriptAnalyzer::analyze_all`].
#[derive(Clone)]
pub struct TranscriptAnalyzer {
    stt: Arc<dyn SpeechToText>,
    nlu: Arc<dyn EmotionScorer>,
    config: AnalysisConfig,
    pool: Option<WorkerPool>,
}

impl TranscriptAnalyzer {
    /// Creates an analyzer that runs its jobs on the process-wide pool.
    pub fn new(
        stt: Arc<dyn SpeechToText>,
        nlu: Arc<dyn EmotionScorer>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            stt,
            nlu,
            config,
            pool: None,
        }
    }

    /// Run jobs on `pool` instead of the process-wide pool.
    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn pool(&self) -> WorkerPool {
        match &self.pool {
            Some(pool) => pool.clone(),
            None => WorkerPool::shared(self.config.workers, self.config.queue_capacity),
        }
    }

    /// Analyze one segment on the calling task.
    pub async fn analyze(&self, segment: &AudioSegment) -> TranscriptRecord {
        match self.process(segment, &CancellationToken::new()).await {
            Ok(record) => record,
            Err(err) => TranscriptRecord::failed(segment.span(), err.to_string()),
        }
    }

    /// Analyze every segment on the worker pool.
    ///
    /// Records come back in input order regardless of completion order.
    /// Cancelling `cancel` stops in-flight jobs at their next await point
    /// and returns [`SculptError::PartialAnalysis`].
    pub async fn analyze_all(
        &self,
        segments: Vec<AudioSegment>,
        cancel: &CancellationToken,
    ) -> Result<Vec<TranscriptRecord>> {
        let total = segments.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let pool = self.pool();
        let completed = Arc::new(AtomicUsize::new(0));
        let partial = || SculptError::PartialAnalysis {
            completed: completed.load(Ordering::SeqCst),
            total,
        };

        tracing::debug!(segments = total, workers = pool.workers(), "Submitting analysis jobs");

        let mut pending: Vec<(TimeSpan, _)> = Vec::with_capacity(total);
        for segment in segments {
            let span = segment.span();
            let analyzer = self.clone();
            let token = cancel.clone();
            let counter = Arc::clone(&completed);
            let job = async move {
                let result = analyzer.process(&segment, &token).await;
                if result.is_ok() {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                result
            };

            let receiver = tokio::select! {
                submitted = pool.submit(job) => submitted?,
                _ = cancel.cancelled() => return Err(partial()),
            };
            pending.push((span, receiver));
        }

        let mut records = Vec::with_capacity(total);
        for (span, receiver) in pending {
            let outcome = tokio::select! {
                outcome = receiver => outcome,
                _ = cancel.cancelled() => return Err(partial()),
            };
            match outcome {
                Ok(Ok(record)) => records.push(record),
                Ok(Err(_)) => return Err(partial()),
                Err(_) => {
                    tracing::warn!(
                        start = span.start,
                        end = span.end,
                        "Analysis job lost, recording segment as failed"
                    );
                    records.push(TranscriptRecord::failed(span, "analysis job panicked"));
                }
            }
        }

        log_summary(&records);
        Ok(records)
    }

    /// Full per-segment flow. Only cancellation is returned as an error.
    async fn process(
        &self,
        segment: &AudioSegment,
        cancel: &CancellationToken,
    ) -> std::result::Result<TranscriptRecord, ServiceError> {
        let span = segment.span();

        let transcription = match retry_transient(
            self.stt.name(),
            &self.config.retry,
            cancel,
            || self.stt.transcribe(segment),
        )
        .await
        {
            Ok(transcription) => transcription,
            Err(ServiceError::Cancelled) => return Err(ServiceError::Cancelled),
            Err(err) => {
                tracing::warn!(
                    start = span.start,
                    end = span.end,
                    error = %err,
                    "Speech-to-text failed, segment excluded"
                );
                return Ok(TranscriptRecord::failed(span, format!("speech-to-text: {err}")));
            }
        };

        let text = transcription.text.trim().to_string();
        if text.is_empty() {
            tracing::debug!(start = span.start, end = span.end, "Blank transcript, neutral emotion");
            return Ok(TranscriptRecord::neutralized(
                span,
                text,
                transcription.confidence,
            ));
        }

        let scores = match retry_transient(
            self.nlu.name(),
            &self.config.retry,
            cancel,
            || self.nlu.score(&text),
        )
        .await
        {
            Ok(scores) => scores,
            Err(ServiceError::Cancelled) => return Err(ServiceError::Cancelled),
            Err(err) => {
                tracing::warn!(
                    start = span.start,
                    end = span.end,
                    error = %err,
                    "Emotion scoring failed, segment excluded"
                );
                return Ok(TranscriptRecord::failed(span, format!("emotion scoring: {err}")));
            }
        };

        let confidence = transcription.confidence.min(scores.confidence);
        Ok(TranscriptRecord::scored(span, text, scores.emotion, confidence))
    }
}

fn log_summary(records: &[TranscriptRecord]) {
    let mut scored = 0;
    let mut neutral = 0;
    let mut failed = 0;
    for record in records {
        match record.outcome {
            RecordOutcome::Scored => scored += 1,
            RecordOutcome::Neutralized => neutral += 1,
            RecordOutcome::Failed { .. } => failed += 1,
        }
    }
    tracing::info!(scored, neutral, failed, "Transcript analysis finished");
}
