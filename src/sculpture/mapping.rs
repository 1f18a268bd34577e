//! Emotion-to-geometry mapping table and global parameter bounds.

use crate::analysis::emotion::{EmotionDimension, EmotionVector};
use crate::error::{Result, SculptError};
use crate::timeline::EmotionTimeline;
use serde::{Deserialize, Serialize};

/// Geometric quantity an emotion dimension drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryTarget {
    /// Millimetres added to the base radius.
    RadiusOffset,
    /// Radians added to the cumulative twist.
    TwistDelta,
    /// Added to 1.0 to scale the local vertical step.
    HeightScale,
    /// Amplitude of the radial ripple (fraction of the radius).
    Perturbation,
}

/// One row of the mapping table: `clamp(scale * score, clamp_min, clamp_max)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub dimension: EmotionDimension,
    pub target: GeometryTarget,
    pub scale: f64,
    pub clamp_min: f64,
    pub clamp_max: f64,
}

impl MappingEntry {
    /// Entry clamped to the range spanned by scores 0 and 1.
    pub fn new(dimension: EmotionDimension, target: GeometryTarget, scale: f64) -> Self {
        Self {
            dimension,
            target,
            scale,
            clamp_min: scale.min(0.0),
            clamp_max: scale.max(0.0),
        }
    }

    pub fn contribution(&self, emotion: &EmotionVector) -> f64 {
        (self.scale * emotion.get(self.dimension)).clamp(self.clamp_min, self.clamp_max)
    }
}

/// The default table.
pub fn default_mapping() -> Vec<MappingEntry> {
    use EmotionDimension::*;
    use GeometryTarget::*;
    vec![
        MappingEntry::new(Joy, RadiusOffset, 24.0),
        MappingEntry::new(Sadness, HeightScale, -0.5),
        MappingEntry::new(Anger, Perturbation, 0.25),
        MappingEntry::new(Fear, TwistDelta, 0.6),
        MappingEntry::new(Disgust, Perturbation, 0.15),
    ]
}

/// Rejects rows whose clamp range is inverted or non-finite.
pub fn validate_mapping(table: &[MappingEntry]) -> Result<()> {
    for (index, entry) in table.iter().enumerate() {
        let finite = entry.scale.is_finite() && entry.clamp_min.is_finite() && entry.clamp_max.is_finite();
        if !finite || entry.clamp_min > entry.clamp_max {
            return Err(SculptError::ConfigInvalidValue {
                key: format!("sculpture.mapping[{index}]"),
                message: format!(
                    "{} -> {:?}: clamp range [{}, {}] with scale {} is invalid",
                    entry.dimension, entry.target, entry.clamp_min, entry.clamp_max, entry.scale
                ),
            });
        }
    }
    Ok(())
}

/// Summed table contributions for one emotion vector, before bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Contributions {
    pub radius_offset: f64,
    pub twist_delta: f64,
    pub height_scale: f64,
    pub perturbation: f64,
}

pub fn contributions(table: &[MappingEntry], emotion: &EmotionVector) -> Contributions {
    let mut sum = Contributions::default();
    for entry in table {
        let value = entry.contribution(emotion);
        match entry.target {
            GeometryTarget::RadiusOffset => sum.radius_offset += value,
            GeometryTarget::TwistDelta => sum.twist_delta += value,
            GeometryTarget::HeightScale => sum.height_scale += value,
            GeometryTarget::Perturbation => sum.perturbation += value,
        }
    }
    sum
}

/// Hard limits applied after the table sum.
///
/// With `min_radius > 0` and `max_perturbation < 1`, every ring stays
/// star-shaped around the axis with strictly positive radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryBounds {
    pub min_radius: f64,
    pub max_radius: f64,
    /// Largest twist change between consecutive profiles, in radians.
    pub max_twist_step: f64,
    pub min_height_scale: f64,
    pub max_height_scale: f64,
    pub max_perturbation: f64,
}

impl Default for GeometryBounds {
    fn default() -> Self {
        Self {
            min_radius: 10.0,
            max_radius: 60.0,
            max_twist_step: 0.8,
            min_height_scale: 0.25,
            max_height_scale: 2.0,
            max_perturbation: 0.35,
        }
    }
}

impl GeometryBounds {
    /// Rejects bounds that could produce a degenerate solid.
    pub fn validate(&self) -> Result<()> {
        let check = |ok: bool, key: &str, message: &str| {
            if ok {
                Ok(())
            } else {
                Err(SculptError::ConfigInvalidValue {
                    key: format!("sculpture.bounds.{key}"),
                    message: message.to_string(),
                })
            }
        };
        check(
            self.min_radius.is_finite() && self.min_radius > 0.0,
            "min_radius",
            "must be positive",
        )?;
        check(
            self.max_radius.is_finite() && self.max_radius >= self.min_radius,
            "max_radius",
            "must be at least min_radius",
        )?;
        check(
            self.max_twist_step.is_finite() && self.max_twist_step >= 0.0,
            "max_twist_step",
            "must be non-negative",
        )?;
        check(
            self.min_height_scale.is_finite() && self.min_height_scale > 0.0,
            "min_height_scale",
            "must be positive",
        )?;
        check(
            self.max_height_scale.is_finite() && self.max_height_scale >= self.min_height_scale,
            "max_height_scale",
            "must be at least min_height_scale",
        )?;
        check(
            (0.0..1.0).contains(&self.max_perturbation),
            "max_perturbation",
            "must be in [0, 1)",
        )
    }
}

/// Geometry of one profile, derived from one timeline sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryParameters {
    pub time_secs: f64,
    pub radius: f64,
    /// Cumulative twist in radians.
    pub twist: f64,
    /// Height of the profile plane.
    pub height: f64,
    pub perturbation: f64,
}

/// Maps every timeline sample to clamped geometry parameters.
///
/// The two-sample timeline maps to a plain cylinder of `base_radius`.
pub fn map_timeline(
    timeline: &EmotionTimeline,
    table: &[MappingEntry],
    bounds: &GeometryBounds,
    base_radius: f64,
    height_per_second: f64,
) -> Result<Vec<GeometryParameters>> {
    let samples = timeline.samples();
    let minimal = timeline.is_minimal();
    let mut parameters: Vec<GeometryParameters> = Vec::with_capacity(samples.len());
    let mut twist = 0.0;
    let mut height = 0.0;

    for (index, sample) in samples.iter().enumerate() {
        let (radius, twist_step, height_scale, perturbation) = if minimal {
            (base_radius, 0.0, 1.0, 0.0)
        } else {
            let sum = contributions(table, &sample.emotion);
            (
                (base_radius + sum.radius_offset).clamp(bounds.min_radius, bounds.max_radius),
                sum.twist_delta
                    .clamp(-bounds.max_twist_step, bounds.max_twist_step),
                (1.0 + sum.height_scale).clamp(bounds.min_height_scale, bounds.max_height_scale),
                sum.perturbation.clamp(0.0, bounds.max_perturbation),
            )
        };

        if index > 0 {
            let dt = sample.time_secs - samples[index - 1].time_secs;
            height += dt * height_per_second * height_scale;
        }
        twist += twist_step;

        let params = GeometryParameters {
            time_secs: sample.time_secs,
            radius,
            twist,
            height,
            perturbation,
        };
        let finite = [radius, twist, height, perturbation]
            .iter()
            .all(|v| v.is_finite());
        if !finite || radius <= 0.0 {
            return Err(SculptError::GeometryConstruction {
                sample_index: index,
                time_secs: sample.time_secs,
                reason: format!("invalid parameters {params:?}"),
            });
        }
        if let Some(previous) = parameters.last()
            && height <= previous.height
        {
            return Err(SculptError::GeometryConstruction {
                sample_index: index,
                time_secs: sample.time_secs,
                reason: format!("profile height {height} does not increase"),
            });
        }
        parameters.push(params);
    }

    Ok(parameters)
}
