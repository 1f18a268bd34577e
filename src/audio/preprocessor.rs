//! Recording normalization and utterance segmentation.
//!
//! Converts a recording to canonical mono, normalizes its level, and cuts it
//! into voiced segments bounded by silence. Segment times always refer to the
//! original recording timeline; trimmed silence is excluded from segment
//! boundaries but never removed from the source.

use crate::audio::energy::{classify_frames, frame_energies, peak_normalize};
use crate::audio::envelope::WaveformEnvelope;
use crate::audio::types::{AudioSegment, RawAudio};
use crate::audio::wav::{downmix, resample};
use crate::defaults;
use crate::error::{Result, SculptError};
use serde::{Deserialize, Serialize};

/// Preprocessing configuration (the `[audio]` config section).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Canonical sample rate segments are produced at.
    pub sample_rate: u32,
    /// Peak level after normalization (0.0 to 1.0).
    pub target_peak: f32,
    /// Energy analysis frame length in milliseconds.
    pub frame_ms: u32,
    /// RMS threshold separating voiced from quiet frames.
    pub silence_threshold: f32,
    /// Quiet runs shorter than this never count as silence.
    pub min_silence_ms: u32,
    /// Silence gaps at least this long split utterances.
    pub split_silence_ms: u32,
    /// Voiced regions shorter than this are merged into a neighbour.
    pub min_segment_ms: u32,
    /// Longer segments are split evenly (0 disables).
    pub max_segment_secs: f64,
    /// Bins of the base waveform envelope.
    pub envelope_bins: usize,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            target_peak: defaults::TARGET_PEAK,
            frame_ms: defaults::FRAME_MS,
            silence_threshold: defaults::SILENCE_THRESHOLD,
            min_silence_ms: defaults::MIN_SILENCE_MS,
            split_silence_ms: defaults::SPLIT_SILENCE_MS,
            min_segment_ms: defaults::MIN_SEGMENT_MS,
            max_segment_secs: defaults::MAX_SEGMENT_SECS,
            envelope_bins: defaults::ENVELOPE_BINS,
        }
    }
}

/// Half-open frame range `[start, end)`.
type FrameRange = (usize, usize);

/// Stage one of the pipeline: recording in, ordered utterance segments out.
#[derive(Debug, Clone, Default)]
pub struct AudioPreprocessor {
    config: PreprocessConfig,
}

impl AudioPreprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Split a recording into ordered, non-overlapping voiced segments.
    ///
    /// Returns an empty vector when the recording has no voiced region.
    pub fn normalize(&self, raw: &RawAudio) -> Result<Vec<AudioSegment>> {
        let mono = self.mono_at_rate(raw)?;
        let rate = self.config.sample_rate;
        let duration = raw.duration_secs();

        // Thresholding sees the recorded level; gain is applied to segments only.
        let frame_len = ((rate as u64 * self.config.frame_ms as u64) / 1000).max(1) as usize;
        let energies = frame_energies(&mono, frame_len);
        let voiced = classify_frames(&energies, self.config.silence_threshold);

        let regions = self.voiced_regions(&voiced);
        if regions.is_empty() {
            tracing::info!(duration_secs = duration, "No speech detected in recording");
            return Ok(Vec::new());
        }
        let mono = peak_normalize(&mono, self.config.target_peak);

        let mut segments = Vec::new();
        for (start_frame, end_frame) in regions {
            let start_sample = start_frame * frame_len;
            let end_sample = (end_frame * frame_len).min(mono.len());
            for (start, end) in self.split_long(start_sample, end_sample) {
                let start_time = start as f64 / rate as f64;
                let end_time = (end as f64 / rate as f64).min(duration);
                if start_time >= end_time {
                    continue;
                }
                segments.push(AudioSegment::new(
                    start_time,
                    end_time,
                    mono[start..end].to_vec(),
                    rate,
                )?);
            }
        }

        tracing::debug!(
            segments = segments.len(),
            duration_secs = duration,
            "Recording segmented"
        );
        Ok(segments)
    }

    /// Waveform envelope of the normalized recording, for the sculpture base.
    pub fn envelope(&self, raw: &RawAudio) -> Result<WaveformEnvelope> {
        let mono = self.canonical_mono(raw)?;
        Ok(WaveformEnvelope::compute(
            &mono,
            self.config.envelope_bins,
            defaults::ENVELOPE_AMPLITUDE,
            defaults::ENVELOPE_OUTLIER_MADS,
        ))
    }

    /// Validate, downmix, resample and peak-normalize a recording.
    pub fn canonical_mono(&self, raw: &RawAudio) -> Result<Vec<f32>> {
        let mono = self.mono_at_rate(raw)?;
        Ok(peak_normalize(&mono, self.config.target_peak))
    }

    /// Validated mono signal at the canonical rate, level untouched.
    fn mono_at_rate(&self, raw: &RawAudio) -> Result<Vec<f32>> {
        if raw.samples.is_empty() {
            return Err(SculptError::InvalidAudio {
                message: "recording contains no samples".to_string(),
            });
        }
        if raw.sample_rate == 0 {
            return Err(SculptError::InvalidAudio {
                message: "recording declares a sample rate of 0".to_string(),
            });
        }
        if raw.channels == 0 {
            return Err(SculptError::InvalidAudio {
                message: "recording declares zero channels".to_string(),
            });
        }
        if raw.frames() == 0 {
            return Err(SculptError::InvalidAudio {
                message: format!(
                    "recording has {} samples, fewer than its {} channels",
                    raw.samples.len(),
                    raw.channels
                ),
            });
        }

        let mono = downmix(&raw.samples, raw.channels);
        let mono = if raw.sample_rate != self.config.sample_rate {
            tracing::debug!(
                from = raw.sample_rate,
                to = self.config.sample_rate,
                "Resampling recording"
            );
            resample(&mono, raw.sample_rate, self.config.sample_rate)
        } else {
            mono
        };
        Ok(mono)
    }

    fn frames_for_ms(&self, ms: u32) -> usize {
        let frame_ms = self.config.frame_ms.max(1);
        ms.div_ceil(frame_ms) as usize
    }

    /// Voiced frame ranges after edge trimming, gap splitting and short-region merging.
    fn voiced_regions(&self, voiced: &[bool]) -> Vec<FrameRange> {
        let mut runs: Vec<FrameRange> = Vec::new();
        let mut current: Option<usize> = None;
        for (i, &is_voiced) in voiced.iter().enumerate() {
            match (is_voiced, current) {
                (true, None) => current = Some(i),
                (false, Some(start)) => {
                    runs.push((start, i));
                    current = None;
                }
                _ => {}
            }
        }
        if let Some(start) = current {
            runs.push((start, voiced.len()));
        }
        if runs.is_empty() {
            return runs;
        }

        let min_silence = self.frames_for_ms(self.config.min_silence_ms);
        let split = self
            .frames_for_ms(self.config.split_silence_ms)
            .max(min_silence);

        // Gaps shorter than the split threshold stay inside one utterance.
        let mut regions: Vec<FrameRange> = Vec::with_capacity(runs.len());
        for run in runs {
            match regions.last_mut() {
                Some(last) if run.0 - last.1 < split => last.1 = run.1,
                _ => regions.push(run),
            }
        }

        // Quiet edges too short to be silence belong to the utterance.
        if let Some(first) = regions.first_mut()
            && first.0 < min_silence
        {
            first.0 = 0;
        }
        if let Some(last) = regions.last_mut()
            && voiced.len() - last.1 < min_silence
        {
            last.1 = voiced.len();
        }

        self.merge_short(regions)
    }

    /// Merge regions shorter than `min_segment_ms` into their nearest neighbour.
    fn merge_short(&self, mut regions: Vec<FrameRange>) -> Vec<FrameRange> {
        let min_frames = self.frames_for_ms(self.config.min_segment_ms);
        while regions.len() > 1 {
            let Some(i) = regions.iter().position(|(s, e)| e - s < min_frames) else {
                break;
            };
            let prev_gap = (i > 0).then(|| regions[i].0 - regions[i - 1].1);
            let next_gap = regions.get(i + 1).map(|next| next.0 - regions[i].1);
            let merge_prev = match (prev_gap, next_gap) {
                (Some(p), Some(n)) => p <= n,
                (Some(_), None) => true,
                _ => false,
            };
            if merge_prev {
                let (_, end) = regions.remove(i);
                regions[i - 1].1 = end;
            } else {
                let (start, _) = regions.remove(i);
                regions[i].0 = start;
            }
        }
        regions
    }

    /// Split a sample range into equal parts no longer than `max_segment_secs`.
    fn split_long(&self, start: usize, end: usize) -> Vec<(usize, usize)> {
        let max_samples = (self.config.max_segment_secs * self.config.sample_rate as f64) as usize;
        let len = end.saturating_sub(start);
        if self.config.max_segment_secs <= 0.0 || max_samples == 0 || len <= max_samples {
            return vec![(start, end)];
        }
        let parts = len.div_ceil(max_samples);
        (0..parts)
            .map(|p| (start + p * len / parts, start + (p + 1) * len / parts))
            .collect()
    }
}
