use crate::analysis::emotion::EmotionVector;
use crate::audio::types::TimeSpan;
use serde::{Deserialize, Serialize};

/// How a segment's analysis ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordOutcome {
    /// Both collaborators answered.
    Scored,
    /// Blank transcript; neutral emotion assigned without scoring.
    Neutralized,
    /// Analysis failed after retries or on a permanent error.
    Failed { reason: String },
}

/// Analysis result for one audio segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub span: TimeSpan,
    pub text: String,
    /// `None` only for failed records.
    pub emotion: Option<EmotionVector>,
    /// Advisory confidence in `[0, 1]`; zero for failed records.
    pub confidence: f64,
    pub outcome: RecordOutcome,
}

impl TranscriptRecord {
    pub fn scored(span: TimeSpan, text: String, emotion: EmotionVector, confidence: f64) -> Self {
        Self {
            span,
            text,
            emotion: Some(emotion),
            confidence: clamp_confidence(confidence),
            outcome: RecordOutcome::Scored,
        }
    }

    pub fn neutralized(span: TimeSpan, text: String, confidence: f64) -> Self {
        Self {
            span,
            text,
            emotion: Some(EmotionVector::neutral()),
            confidence: clamp_confidence(confidence),
            outcome: RecordOutcome::Neutralized,
        }
    }

    pub fn failed(span: TimeSpan, reason: impl Into<String>) -> Self {
        Self {
            span,
            text: String::new(),
            emotion: None,
            confidence: 0.0,
            outcome: RecordOutcome::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, RecordOutcome::Failed { .. })
    }

    /// Segment midpoint in seconds on the recording timeline.
    pub fn midpoint(&self) -> f64 {
        self.span.midpoint()
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::emotion::EmotionDimension;

    #[test]
    fn failed_record_has_no_emotion_and_zero_confidence() {
        let record = TranscriptRecord::failed(TimeSpan::new(1.0, 2.0), "timeout");
        assert!(record.is_failed());
        assert_eq!(record.emotion, None);
        assert_eq!(record.confidence, 0.0);
        assert_eq!(
            record.outcome,
            RecordOutcome::Failed {
                reason: "timeout".to_string()
            }
        );
    }

    #[test]
    fn scored_record_clamps_confidence() {
        let emotion = EmotionVector::from_pairs([(EmotionDimension::Joy, 0.5)]);
        let record =
            TranscriptRecord::scored(TimeSpan::new(0.0, 2.0), "hi".into(), emotion, 1.7);
        assert_eq!(record.confidence, 1.0);
        assert_eq!(record.midpoint(), 1.0);
        assert!(!record.is_failed());
    }

    #[test]
    fn neutralized_record_is_neutral() {
        let record = TranscriptRecord::neutralized(TimeSpan::new(0.0, 1.0), "  ".into(), 0.9);
        assert_eq!(record.outcome, RecordOutcome::Neutralized);
        assert!(record.emotion.is_some_and(|e| e.is_neutral()));
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let record = TranscriptRecord::failed(TimeSpan::new(0.0, 1.0), "auth");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["outcome"]["status"], "failed");
        assert_eq!(json["outcome"]["reason"], "auth");
        assert!(json["emotion"].is_null());
    }
}
