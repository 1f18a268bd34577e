//! Audio data types shared by the preprocessing and analysis stages.

use crate::error::{Result, SculptError};
use serde::{Deserialize, Serialize};

/// A recording as declared by its source: interleaved samples in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl RawAudio {
    /// Creates a recording from interleaved samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Creates a single-channel recording.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(samples, sample_rate, 1)
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    /// Duration of the recording in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / self.sample_rate as f64
        }
    }
}

/// Closed-open time range `[start, end)` in seconds on the recording timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: f64,
    pub end: f64,
}

impl TimeSpan {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// One utterance window cut from a recording.
///
/// Times reference the original (untrimmed) recording. Samples are mono at
/// `sample_rate`. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    start_time: f64,
    end_time: f64,
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSegment {
    /// Creates a segment, rejecting empty or inverted time ranges.
    pub fn new(start_time: f64, end_time: f64, samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if !start_time.is_finite() || !end_time.is_finite() || start_time < 0.0 {
            return Err(SculptError::InvalidAudio {
                message: format!("segment bounds must be finite and non-negative ({start_time}..{end_time})"),
            });
        }
        if start_time >= end_time {
            return Err(SculptError::InvalidAudio {
                message: format!("segment start {start_time} is not before end {end_time}"),
            });
        }
        if sample_rate == 0 {
            return Err(SculptError::InvalidAudio {
                message: "segment sample rate must be positive".to_string(),
            });
        }
        Ok(Self {
            start_time,
            end_time,
            samples,
            sample_rate,
        })
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn span(&self) -> TimeSpan {
        TimeSpan::new(self.start_time, self.end_time)
    }

    pub fn duration_secs(&self) -> f64 {
        self.end_time - self.start_time
    }
}
