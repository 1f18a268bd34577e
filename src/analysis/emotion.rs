//! Emotion dimensions and fixed-size score vectors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Emotion categories reported by the emotion-scoring collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionDimension {
    Joy,
    Sadness,
    Anger,
    Fear,
    Disgust,
}

/// Number of emotion dimensions.
pub const DIMENSIONS: usize = 5;

impl EmotionDimension {
    pub const ALL: [EmotionDimension; DIMENSIONS] = [
        EmotionDimension::Joy,
        EmotionDimension::Sadness,
        EmotionDimension::Anger,
        EmotionDimension::Fear,
        EmotionDimension::Disgust,
    ];

    pub fn index(self) -> usize {
        match self {
            EmotionDimension::Joy => 0,
            EmotionDimension::Sadness => 1,
            EmotionDimension::Anger => 2,
            EmotionDimension::Fear => 3,
            EmotionDimension::Disgust => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EmotionDimension::Joy => "joy",
            EmotionDimension::Sadness => "sadness",
            EmotionDimension::Anger => "anger",
            EmotionDimension::Fear => "fear",
            EmotionDimension::Disgust => "disgust",
        }
    }
}

impl fmt::Display for EmotionDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EmotionDimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EmotionDimension::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown emotion dimension '{}'", s))
    }
}

/// Score per emotion dimension, each in `[0, 1]`.
///
/// Every dimension is always present; scores are independent and need not
/// sum to one. Out-of-range and non-finite inputs are clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    into = "BTreeMap<EmotionDimension, f64>",
    try_from = "BTreeMap<EmotionDimension, f64>"
)]
pub struct EmotionVector {
    scores: [f64; DIMENSIONS],
}

fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

impl EmotionVector {
    /// Creates a vector from scores in [`EmotionDimension::ALL`] order.
    pub fn new(scores: [f64; DIMENSIONS]) -> Self {
        Self {
            scores: scores.map(clamp_score),
        }
    }

    /// The neutral vector: every score zero.
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Builds a vector from named scores; unnamed dimensions score zero.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (EmotionDimension, f64)>,
    {
        let mut scores = [0.0; DIMENSIONS];
        for (dimension, score) in pairs {
            scores[dimension.index()] = score;
        }
        Self::new(scores)
    }

    pub fn get(&self, dimension: EmotionDimension) -> f64 {
        self.scores[dimension.index()]
    }

    pub fn scores(&self) -> &[f64; DIMENSIONS] {
        &self.scores
    }

    pub fn iter(&self) -> impl Iterator<Item = (EmotionDimension, f64)> + '_ {
        EmotionDimension::ALL
            .into_iter()
            .map(|d| (d, self.scores[d.index()]))
    }

    pub fn is_neutral(&self) -> bool {
        self.scores.iter().all(|&s| s == 0.0)
    }

    /// Strongest dimension, or `None` for the neutral vector.
    pub fn dominant(&self) -> Option<(EmotionDimension, f64)> {
        self.iter()
            .filter(|&(_, s)| s > 0.0)
            .fold(None, |best, (d, s)| match best {
                Some((_, b)) if b >= s => best,
                _ => Some((d, s)),
            })
    }

    /// Component-wise linear interpolation; `t = 0` yields `self`.
    pub fn lerp(&self, other: &EmotionVector, t: f64) -> EmotionVector {
        let mut scores = [0.0; DIMENSIONS];
        for (i, score) in scores.iter_mut().enumerate() {
            *score = self.scores[i] + (other.scores[i] - self.scores[i]) * t;
        }
        EmotionVector::new(scores)
    }

    /// Component-wise mean. The mean of nothing is neutral.
    pub fn mean(vectors: &[EmotionVector]) -> EmotionVector {
        if vectors.is_empty() {
            return EmotionVector::neutral();
        }
        let mut scores = [0.0; DIMENSIONS];
        for vector in vectors {
            for (i, score) in scores.iter_mut().enumerate() {
                *score += vector.scores[i];
            }
        }
        EmotionVector::new(scores.map(|s| s / vectors.len() as f64))
    }
}

impl From<EmotionVector> for BTreeMap<EmotionDimension, f64> {
    fn from(vector: EmotionVector) -> Self {
        vector.iter().collect()
    }
}

impl TryFrom<BTreeMap<EmotionDimension, f64>> for EmotionVector {
    type Error = String;

    fn try_from(map: BTreeMap<EmotionDimension, f64>) -> Result<Self, Self::Error> {
        let missing: Vec<&str> = EmotionDimension::ALL
            .iter()
            .filter(|d| !map.contains_key(d))
            .map(|d| d.name())
            .collect();
        if !missing.is_empty() {
            return Err(format!("missing emotion dimensions: {}", missing.join(", ")));
        }
        Ok(EmotionVector::from_pairs(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_is_all_zero() {
        let neutral = EmotionVector::neutral();
        assert!(neutral.is_neutral());
        assert!(neutral.iter().all(|(_, s)| s == 0.0));
        assert_eq!(neutral.dominant(), None);
    }

    #[test]
    fn scores_are_clamped_on_construction() {
        let vector = EmotionVector::new([1.5, -0.2, f64::NAN, 0.4, f64::INFINITY]);
        assert_eq!(vector.scores(), &[1.0, 0.0, 0.0, 0.4, 0.0]);
    }

    #[test]
    fn from_pairs_fills_missing_with_zero() {
        let vector = EmotionVector::from_pairs([(EmotionDimension::Fear, 0.7)]);
        assert_eq!(vector.get(EmotionDimension::Fear), 0.7);
        assert_eq!(vector.get(EmotionDimension::Joy), 0.0);
    }

    #[test]
    fn dominant_picks_highest_score() {
        let vector = EmotionVector::from_pairs([
            (EmotionDimension::Joy, 0.8),
            (EmotionDimension::Sadness, 0.1),
        ]);
        assert_eq!(vector.dominant(), Some((EmotionDimension::Joy, 0.8)));
    }

    #[test]
    fn lerp_midpoint_is_average() {
        let a = EmotionVector::from_pairs([(EmotionDimension::Anger, 0.2)]);
        let b = EmotionVector::from_pairs([(EmotionDimension::Anger, 0.6)]);
        let mid = a.lerp(&b, 0.5);
        assert!((mid.get(EmotionDimension::Anger) - 0.4).abs() < 1e-12);
        assert_eq!(a.lerp(&b, 0.0), a);
    }

    #[test]
    fn mean_of_empty_is_neutral() {
        assert!(EmotionVector::mean(&[]).is_neutral());
    }

    #[test]
    fn dimension_parses_case_insensitively() {
        assert_eq!("Joy".parse::<EmotionDimension>(), Ok(EmotionDimension::Joy));
        assert_eq!(
            " disgust ".parse::<EmotionDimension>(),
            Ok(EmotionDimension::Disgust)
        );
        assert!("surprise".parse::<EmotionDimension>().is_err());
    }

    #[test]
    fn json_uses_named_dimensions() {
        let vector = EmotionVector::from_pairs([(EmotionDimension::Joy, 0.5)]);
        let json = serde_json::to_value(vector).unwrap();
        assert_eq!(json["joy"], 0.5);
        assert_eq!(json["disgust"], 0.0);

        let back: EmotionVector = serde_json::from_value(json).unwrap();
        assert_eq!(back, vector);
    }

    #[test]
    fn json_missing_dimension_is_rejected() {
        let result: Result<EmotionVector, _> = serde_json::from_str(r#"{"joy": 0.5}"#);
        assert!(result.is_err());
    }
}
