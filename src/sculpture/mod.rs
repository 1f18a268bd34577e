//! Stage four: emotion timeline to solid geometry.
//!
//! Generation is a pure function of the timeline and the configuration: no
//! randomness and no global state, so equal inputs give identical models.

pub mod export;
pub mod mapping;
pub mod mesh;
pub mod model;
pub mod profile;

pub use export::{ExportFormat, ImportedSolid, ProfileStack};
pub use mapping::{GeometryBounds, GeometryParameters, GeometryTarget, MappingEntry};
pub use mesh::{BoundingBox, TriangleMesh};
pub use model::{LoftSpan, SculptureModel};
pub use profile::Profile;

use crate::audio::envelope::WaveformEnvelope;
use crate::defaults;
use crate::error::{Result, SculptError};
use crate::timeline::EmotionTimeline;
use serde::{Deserialize, Serialize};

/// Sculpture configuration (the `[sculpture]` config section).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SculptureConfig {
    /// Radius of a neutral profile in millimetres.
    pub base_radius: f64,
    /// Millimetres of height per second of recording at height scale 1.
    pub height_per_second: f64,
    /// Vertices per profile.
    pub profile_points: usize,
    /// Lobes of the perturbation ripple.
    pub ripple_lobes: u32,
    /// Ripple the bottom profile with the waveform envelope.
    pub apply_envelope: bool,
    pub bounds: GeometryBounds,
    pub mapping: Vec<MappingEntry>,
}

impl Default for SculptureConfig {
    fn default() -> Self {
        Self {
            base_radius: defaults::BASE_RADIUS_MM,
            height_per_second: defaults::HEIGHT_PER_SECOND_MM,
            profile_points: defaults::PROFILE_POINTS,
            ripple_lobes: defaults::RIPPLE_LOBES,
            apply_envelope: true,
            bounds: GeometryBounds::default(),
            mapping: mapping::default_mapping(),
        }
    }
}

impl SculptureConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, message: &str| SculptError::ConfigInvalidValue {
            key: format!("sculpture.{key}"),
            message: message.to_string(),
        };
        self.bounds.validate()?;
        mapping::validate_mapping(&self.mapping)?;
        if !(self.base_radius.is_finite()
            && self.base_radius >= self.bounds.min_radius
            && self.base_radius <= self.bounds.max_radius)
        {
            return Err(invalid("base_radius", "must lie within the radius bounds"));
        }
        if !(self.height_per_second.is_finite() && self.height_per_second > 0.0) {
            return Err(invalid("height_per_second", "must be positive"));
        }
        if self.profile_points < 3 {
            return Err(invalid("profile_points", "must be at least 3"));
        }
        Ok(())
    }
}

/// Maps emotion timelines to validated sculpture models.
#[derive(Debug, Clone, Default)]
pub struct SculptureGenerator {
    config: SculptureConfig,
}

impl SculptureGenerator {
    pub fn new(config: SculptureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SculptureConfig {
        &self.config
    }

    pub fn generate(&self, timeline: &EmotionTimeline) -> Result<SculptureModel> {
        self.generate_with_envelope(timeline, None)
    }

    /// Generates the model, rippling the bottom profile with `envelope`
    /// when the timeline carries more than the two boundary samples.
    pub fn generate_with_envelope(
        &self,
        timeline: &EmotionTimeline,
        envelope: Option<&WaveformEnvelope>,
    ) -> Result<SculptureModel> {
        self.config.validate()?;
        let config = &self.config;

        let parameters = mapping::map_timeline(
            timeline,
            &config.mapping,
            &config.bounds,
            config.base_radius,
            config.height_per_second,
        )?;

        let base_envelope = if timeline.is_minimal() || !config.apply_envelope {
            None
        } else {
            envelope.filter(|e| !e.is_empty())
        };

        let profiles: Vec<Profile> = parameters
            .iter()
            .enumerate()
            .map(|(index, params)| {
                let envelope = if index == 0 { base_envelope } else { None };
                Profile::build(params, config.profile_points, config.ripple_lobes, envelope)
            })
            .collect();

        for (index, profile) in profiles.iter().enumerate() {
            if profile.signed_area() <= 0.0 {
                return Err(SculptError::GeometryConstruction {
                    sample_index: index,
                    time_secs: parameters[index].time_secs,
                    reason: "profile ring is not counter-clockwise".to_string(),
                });
            }
        }

        let model = SculptureModel::new(profiles, parameters);
        if let Err(defect) = model.mesh().validate() {
            let index = defect
                .triangle
                .map_or(0, |t| model.sample_for_triangle(t));
            let time_secs = model.parameters()[index].time_secs;
            tracing::error!(sample_index = index, time_secs, reason = %defect.reason, "Generated solid is invalid");
            return Err(SculptError::GeometryConstruction {
                sample_index: index,
                time_secs,
                reason: defect.reason,
            });
        }

        tracing::debug!(
            profiles = model.profiles().len(),
            triangles = model.mesh().triangle_count(),
            height_mm = model.height(),
            "Sculpture generated"
        );
        Ok(model)
    }
}
