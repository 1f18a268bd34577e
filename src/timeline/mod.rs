//! Emotion time series built from transcript records.
//!
//! A timeline always spans the whole recording: its first sample sits at
//! `0`, its last at the recording duration, and timestamps strictly increase.

use crate::analysis::emotion::EmotionVector;
use crate::analysis::record::TranscriptRecord;
use crate::defaults;
use crate::error::{Result, SculptError};
use serde::{Deserialize, Serialize};

/// What to do with records whose analysis failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Drop failed records; neighbours are interpolated across the hole.
    #[default]
    Exclude,
    /// Keep failed records as neutral samples.
    Neutral,
}

/// Timeline configuration (the `[timeline]` config section).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimelineConfig {
    /// Gaps strictly longer than this are filled by interpolation.
    pub max_gap_secs: f64,
    /// Centered moving-average width; 1 disables smoothing.
    pub smoothing_window: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            max_gap_secs: defaults::MAX_GAP_SECS,
            smoothing_window: defaults::SMOOTHING_WINDOW,
            failure_policy: FailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelineSample {
    pub time_secs: f64,
    pub emotion: EmotionVector,
}

impl TimelineSample {
    pub fn new(time_secs: f64, emotion: EmotionVector) -> Self {
        Self { time_secs, emotion }
    }

    fn neutral(time_secs: f64) -> Self {
        Self::new(time_secs, EmotionVector::neutral())
    }
}

/// Validated emotion time series covering `[0, duration]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionTimeline {
    duration_secs: f64,
    samples: Vec<TimelineSample>,
}

impl EmotionTimeline {
    /// Creates a timeline, checking every structural invariant.
    pub fn new(samples: Vec<TimelineSample>, duration_secs: f64) -> Result<Self> {
        check_duration(duration_secs)?;
        if samples.len() < 2 {
            return Err(invalid(format!(
                "a timeline needs at least 2 samples, got {}",
                samples.len()
            )));
        }
        if let Some(bad) = samples.iter().find(|s| !s.time_secs.is_finite()) {
            return Err(invalid(format!("non-finite timestamp {}", bad.time_secs)));
        }
        if samples[0].time_secs != 0.0 {
            return Err(invalid(format!(
                "first sample must be at 0, found {}",
                samples[0].time_secs
            )));
        }
        let last = samples[samples.len() - 1].time_secs;
        if last != duration_secs {
            return Err(invalid(format!(
                "last sample must be at {duration_secs}, found {last}"
            )));
        }
        if let Some(pair) = samples.windows(2).find(|w| w[1].time_secs <= w[0].time_secs) {
            return Err(invalid(format!(
                "timestamps must strictly increase ({} then {})",
                pair[0].time_secs, pair[1].time_secs
            )));
        }
        Ok(Self {
            duration_secs,
            samples,
        })
    }

    /// Two neutral samples at `0` and `duration`.
    pub fn neutral(duration_secs: f64) -> Result<Self> {
        Self::new(
            vec![
                TimelineSample::neutral(0.0),
                TimelineSample::neutral(duration_secs),
            ],
            duration_secs,
        )
    }

    pub fn samples(&self) -> &[TimelineSample] {
        &self.samples
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false: a timeline has at least two samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The bare boundary pair, which generates a plain cylinder.
    pub fn is_minimal(&self) -> bool {
        self.samples.len() == 2
    }

    /// Largest distance between consecutive samples.
    pub fn max_gap(&self) -> f64 {
        self.samples
            .windows(2)
            .map(|w| w[1].time_secs - w[0].time_secs)
            .fold(0.0, f64::max)
    }
}

fn invalid(message: String) -> SculptError {
    SculptError::InvalidTimeline { message }
}

fn check_duration(duration_secs: f64) -> Result<()> {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err(invalid(format!(
            "recording duration must be positive and finite, got {duration_secs}"
        )));
    }
    Ok(())
}

/// Stage three: records in, validated timeline out.
#[derive(Debug, Clone, Default)]
pub struct TimelineBuilder {
    config: TimelineConfig,
}

impl TimelineBuilder {
    pub fn new(config: TimelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Builds the timeline for a recording of `duration_secs`.
    ///
    /// Steps: select records, place them at segment midpoints, pad the
    /// boundaries with neutral samples, fill long gaps, then smooth.
    pub fn build(&self, records: &[TranscriptRecord], duration_secs: f64) -> Result<EmotionTimeline> {
        check_duration(duration_secs)?;

        let mut samples = self.select(records, duration_secs);
        if samples.is_empty() {
            tracing::debug!(duration_secs, "No usable records, neutral timeline");
            return EmotionTimeline::neutral(duration_secs);
        }

        samples.sort_by(|a, b| a.time_secs.total_cmp(&b.time_secs));
        let mut samples = merge_coincident(samples);

        if samples[0].time_secs > 0.0 {
            samples.insert(0, TimelineSample::neutral(0.0));
        }
        if samples[samples.len() - 1].time_secs < duration_secs {
            samples.push(TimelineSample::neutral(duration_secs));
        }

        let samples = fill_gaps(&samples, self.config.max_gap_secs);
        let samples = smooth(samples, self.config.smoothing_window);

        tracing::debug!(
            samples = samples.len(),
            duration_secs,
            "Emotion timeline built"
        );
        EmotionTimeline::new(samples, duration_secs)
    }

    fn select(&self, records: &[TranscriptRecord], duration_secs: f64) -> Vec<TimelineSample> {
        records
            .iter()
            .filter_map(|record| {
                let emotion = match (record.emotion, self.config.failure_policy) {
                    (Some(emotion), _) => emotion,
                    (None, FailurePolicy::Neutral) => EmotionVector::neutral(),
                    (None, FailurePolicy::Exclude) => return None,
                };
                let time = record.midpoint();
                if !(0.0..=duration_secs).contains(&time) {
                    tracing::warn!(time, duration_secs, "Record outside the recording, skipped");
                    return None;
                }
                Some(TimelineSample::new(time, emotion))
            })
            .collect()
    }
}

/// Collapses samples sharing a timestamp into their mean.
fn merge_coincident(samples: Vec<TimelineSample>) -> Vec<TimelineSample> {
    let mut merged: Vec<TimelineSample> = Vec::with_capacity(samples.len());
    let mut group: Vec<EmotionVector> = Vec::new();
    for sample in samples {
        if let Some(last) = merged.last_mut()
            && last.time_secs == sample.time_secs
        {
            group.push(sample.emotion);
            last.emotion = EmotionVector::mean(&group);
            continue;
        }
        group.clear();
        group.push(sample.emotion);
        merged.push(sample);
    }
    merged
}

/// Inserts evenly spaced, linearly interpolated samples into every gap
/// strictly longer than `max_gap`.
fn fill_gaps(samples: &[TimelineSample], max_gap: f64) -> Vec<TimelineSample> {
    if !(max_gap.is_finite() && max_gap > 0.0) {
        return samples.to_vec();
    }
    let mut filled = Vec::with_capacity(samples.len());
    for pair in samples.windows(2) {
        let (left, right) = (pair[0], pair[1]);
        filled.push(left);
        let gap = right.time_secs - left.time_secs;
        if gap > max_gap {
            let pieces = (gap / max_gap).ceil() as usize;
            for k in 1..pieces {
                let t = k as f64 / pieces as f64;
                filled.push(TimelineSample::new(
                    left.time_secs + gap * t,
                    left.emotion.lerp(&right.emotion, t),
                ));
            }
        }
    }
    if let Some(last) = samples.last() {
        filled.push(*last);
    }
    filled
}

/// Centered moving average, truncated at the ends. Timestamps are kept.
fn smooth(samples: Vec<TimelineSample>, window: usize) -> Vec<TimelineSample> {
    if window < 3 || window % 2 == 0 || window >= samples.len() {
        return samples;
    }
    let half = window / 2;
    let emotions: Vec<EmotionVector> = samples.iter().map(|s| s.emotion).collect();
    samples
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(emotions.len());
            TimelineSample::new(sample.time_secs, EmotionVector::mean(&emotions[lo..hi]))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::emotion::EmotionDimension;
    use crate::audio::types::TimeSpan;

    fn joy(score: f64) -> EmotionVector {
        EmotionVector::from_pairs([(EmotionDimension::Joy, score)])
    }

    fn scored(start: f64, end: f64, emotion: EmotionVector) -> TranscriptRecord {
        TranscriptRecord::scored(TimeSpan::new(start, end), "text".into(), emotion, 1.0)
    }

    fn no_smoothing() -> TimelineBuilder {
        TimelineBuilder::new(TimelineConfig {
            smoothing_window: 1,
            ..TimelineConfig::default()
        })
    }

    fn times(timeline: &EmotionTimeline) -> Vec<f64> {
        timeline.samples().iter().map(|s| s.time_secs).collect()
    }

    #[test]
    fn single_utterance_gives_three_samples() {
        let records = vec![scored(3.5, 6.5, joy(0.8))];
        let timeline = TimelineBuilder::default().build(&records, 10.0).unwrap();

        assert_eq!(times(&timeline), vec![0.0, 5.0, 10.0]);
        let samples = timeline.samples();
        assert!(samples[0].emotion.is_neutral());
        assert_eq!(samples[1].emotion, joy(0.8));
        assert!(samples[2].emotion.is_neutral());
    }

    #[test]
    fn no_records_gives_neutral_pair() {
        let timeline = TimelineBuilder::default().build(&[], 12.0).unwrap();
        assert_eq!(times(&timeline), vec![0.0, 12.0]);
        assert!(timeline.is_minimal());
        assert!(timeline.samples().iter().all(|s| s.emotion.is_neutral()));
    }

    #[test]
    fn failed_records_are_excluded_by_default() {
        let records = vec![
            scored(1.0, 2.0, joy(0.4)),
            TranscriptRecord::failed(TimeSpan::new(3.0, 4.0), "timeout"),
            scored(5.0, 6.0, joy(0.6)),
        ];
        let timeline = no_smoothing().build(&records, 7.0).unwrap();
        assert_eq!(times(&timeline), vec![0.0, 1.5, 5.5, 7.0]);
    }

    #[test]
    fn failed_records_can_be_neutral() {
        let builder = TimelineBuilder::new(TimelineConfig {
            smoothing_window: 1,
            failure_policy: FailurePolicy::Neutral,
            ..TimelineConfig::default()
        });
        let records = vec![
            scored(1.0, 2.0, joy(0.4)),
            TranscriptRecord::failed(TimeSpan::new(3.0, 4.0), "timeout"),
        ];
        let timeline = builder.build(&records, 5.0).unwrap();
        assert_eq!(times(&timeline), vec![0.0, 1.5, 3.5, 5.0]);
        assert!(timeline.samples()[2].emotion.is_neutral());
    }

    #[test]
    fn all_failed_gives_neutral_pair() {
        let records = vec![TranscriptRecord::failed(TimeSpan::new(1.0, 2.0), "auth")];
        let timeline = TimelineBuilder::default().build(&records, 3.0).unwrap();
        assert!(timeline.is_minimal());
    }

    #[test]
    fn long_gaps_are_interpolated() {
        let records = vec![scored(0.0, 2.0, joy(0.0)), scored(20.0, 22.0, joy(1.0))];
        let timeline = no_smoothing().build(&records, 22.0).unwrap();

        assert!(timeline.max_gap() <= 5.0 + 1e-9);
        // 1 -> 21 spans 20s, split into four 5s pieces.
        let inner: Vec<f64> = times(&timeline)
            .into_iter()
            .filter(|t| *t > 1.0 && *t < 21.0)
            .collect();
        assert_eq!(inner, vec![6.0, 11.0, 16.0]);
        let mid = timeline.samples().iter().find(|s| s.time_secs == 11.0).unwrap();
        assert!((mid.emotion.get(EmotionDimension::Joy) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn gap_equal_to_max_is_not_filled() {
        let records = vec![scored(4.0, 6.0, joy(0.5))];
        let timeline = no_smoothing().build(&records, 10.0).unwrap();
        assert_eq!(timeline.len(), 3);
    }

    #[test]
    fn smoothing_averages_neighbours() {
        let records = vec![
            scored(0.5, 1.5, joy(0.0)),
            scored(1.5, 2.5, joy(0.9)),
            scored(2.5, 3.5, joy(0.0)),
        ];
        let timeline = TimelineBuilder::default().build(&records, 4.0).unwrap();
        // Samples: 0, 1, 2, 3, 4. Window 3 around t=2 averages 0, 0.9, 0.
        let at_two = timeline.samples().iter().find(|s| s.time_secs == 2.0).unwrap();
        assert!((at_two.emotion.get(EmotionDimension::Joy) - 0.3).abs() < 1e-12);
        assert_eq!(times(&timeline), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn smoothing_skipped_for_even_window() {
        let builder = TimelineBuilder::new(TimelineConfig {
            smoothing_window: 4,
            ..TimelineConfig::default()
        });
        let records = vec![
            scored(0.5, 1.5, joy(0.0)),
            scored(1.5, 2.5, joy(0.9)),
            scored(2.5, 3.5, joy(0.0)),
        ];
        let timeline = builder.build(&records, 4.0).unwrap();
        let at_two = timeline.samples().iter().find(|s| s.time_secs == 2.0).unwrap();
        assert_eq!(at_two.emotion, joy(0.9));
    }

    #[test]
    fn record_at_end_is_not_padded_twice() {
        let records = vec![scored(8.0, 10.0, joy(0.5))];
        let timeline = no_smoothing().build(&records, 9.0).unwrap();
        assert_eq!(times(&timeline), vec![0.0, 4.5, 9.0]);
        assert_eq!(timeline.samples()[2].emotion, joy(0.5));
    }

    #[test]
    fn invalid_duration_is_rejected() {
        for duration in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = TimelineBuilder::default().build(&[], duration);
            assert!(matches!(result, Err(SculptError::InvalidTimeline { .. })));
        }
    }

    #[test]
    fn new_rejects_unordered_samples() {
        let samples = vec![
            TimelineSample::new(0.0, joy(0.0)),
            TimelineSample::new(3.0, joy(0.0)),
            TimelineSample::new(3.0, joy(0.0)),
            TimelineSample::new(5.0, joy(0.0)),
        ];
        assert!(EmotionTimeline::new(samples, 5.0).is_err());
    }

    #[test]
    fn new_rejects_wrong_bounds() {
        let samples = vec![
            TimelineSample::new(1.0, joy(0.0)),
            TimelineSample::new(5.0, joy(0.0)),
        ];
        assert!(EmotionTimeline::new(samples, 5.0).is_err());
        let samples = vec![
            TimelineSample::new(0.0, joy(0.0)),
            TimelineSample::new(4.0, joy(0.0)),
        ];
        assert!(EmotionTimeline::new(samples, 5.0).is_err());
    }

    #[test]
    fn timeline_serializes_samples() {
        let timeline = EmotionTimeline::neutral(2.0).unwrap();
        let json = serde_json::to_value(&timeline).unwrap();
        assert_eq!(json["duration_secs"], 2.0);
        assert_eq!(json["samples"][1]["time_secs"], 2.0);
        assert_eq!(json["samples"][0]["emotion"]["joy"], 0.0);
    }
}
