//! Recording-to-sculpture pipeline.
//!
//! Orchestrates the complete flow:
//! preprocess → analyze → timeline → generate
//!
//! Every stage runs sequentially except analysis, which fans segments out to
//! the worker pool under a run-level deadline.

use crate::analysis::analyzer::TranscriptAnalyzer;
use crate::analysis::pool::WorkerPool;
use crate::analysis::record::TranscriptRecord;
use crate::analysis::service::{EmotionScorer, SpeechToText};
use crate::audio::envelope::WaveformEnvelope;
use crate::audio::preprocessor::AudioPreprocessor;
use crate::audio::types::{AudioSegment, RawAudio};
use crate::config::Config;
use crate::error::Result;
use crate::sculpture::{SculptureGenerator, SculptureModel};
use crate::timeline::{EmotionTimeline, TimelineBuilder};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Result of the first three stages.
#[derive(Debug, Clone)]
pub struct TimelineRun {
    /// Number of voiced segments found in the recording.
    pub segments: usize,
    pub records: Vec<TranscriptRecord>,
    pub timeline: EmotionTimeline,
    pub envelope: WaveformEnvelope,
}

/// Everything a full run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub segments: usize,
    pub records: Vec<TranscriptRecord>,
    pub timeline: EmotionTimeline,
    pub model: SculptureModel,
}

impl PipelineOutput {
    /// Records that carry a measured emotion.
    pub fn measured(&self) -> usize {
        self.records.iter().filter(|r| r.emotion.is_some()).count()
    }

    pub fn failed(&self) -> usize {
        self.records.iter().filter(|r| r.is_failed()).count()
    }
}

/// Composition root: one instance per configuration, reusable across runs.
#[derive(Clone)]
pub struct SculpturePipeline {
    config: Config,
    preprocessor: AudioPreprocessor,
    analyzer: TranscriptAnalyzer,
    timeline: TimelineBuilder,
    generator: SculptureGenerator,
    run_timeout: Option<Duration>,
}

impl SculpturePipeline {
    /// Validates `config` and wires the four stages.
    pub fn new(
        config: Config,
        stt: Arc<dyn SpeechToText>,
        nlu: Arc<dyn EmotionScorer>,
    ) -> Result<Self> {
        config.validate()?;
        let run_timeout = match config.analysis.run_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Ok(Self {
            preprocessor: AudioPreprocessor::new(config.audio.clone()),
            analyzer: TranscriptAnalyzer::new(stt, nlu, config.analysis.clone()),
            timeline: TimelineBuilder::new(config.timeline.clone()),
            generator: SculptureGenerator::new(config.sculpture.clone()),
            run_timeout,
            config,
        })
    }

    /// Run analysis jobs on `pool` instead of the process-wide pool.
    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.analyzer = self.analyzer.with_pool(pool);
        self
    }

    /// Overrides the configured analysis deadline (`None` disables it).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the whole pipeline on one recording.
    pub async fn run(&self, raw: &RawAudio) -> Result<PipelineOutput> {
        self.run_with_cancel(raw, &CancellationToken::new()).await
    }

    /// Like [`run`](Self::run), aborting analysis when `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        raw: &RawAudio,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutput> {
        let TimelineRun {
            segments,
            records,
            timeline,
            envelope,
        } = self.run_timeline_with_cancel(raw, cancel).await?;

        let model = self
            .generator
            .generate_with_envelope(&timeline, Some(&envelope))?;

        tracing::info!(
            segments,
            samples = timeline.len(),
            profiles = model.profiles().len(),
            height_mm = model.height(),
            "Sculpture pipeline finished"
        );
        Ok(PipelineOutput {
            segments,
            records,
            timeline,
            model,
        })
    }

    /// Runs preprocessing, analysis and timeline construction only.
    pub async fn run_timeline(&self, raw: &RawAudio) -> Result<TimelineRun> {
        self.run_timeline_with_cancel(raw, &CancellationToken::new())
            .await
    }

    async fn run_timeline_with_cancel(
        &self,
        raw: &RawAudio,
        cancel: &CancellationToken,
    ) -> Result<TimelineRun> {
        let duration = raw.duration_secs();
        let segments = self.preprocessor.normalize(raw)?;
        let envelope = self.preprocessor.envelope(raw)?;
        let segment_count = segments.len();

        let records = self.analyze(segments, cancel).await?;
        let timeline = self.timeline.build(&records, duration)?;

        Ok(TimelineRun {
            segments: segment_count,
            records,
            timeline,
            envelope,
        })
    }

    async fn analyze(
        &self,
        segments: Vec<AudioSegment>,
        cancel: &CancellationToken,
    ) -> Result<Vec<TranscriptRecord>> {
        let token = cancel.child_token();
        let deadline = self.run_timeout.map(|timeout| {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Analysis deadline reached, cancelling");
                token.cancel();
            })
        });

        let result = self.analyzer.analyze_all(segments, &token).await;

        if let Some(timer) = deadline {
            timer.abort();
        }
        if let Err(err) = &result {
            tracing::error!(error = %err, "Analysis aborted");
        }
        result
    }
}
