//! The generated solid: profiles, loft spans and the triangulated mesh.

use crate::sculpture::mapping::GeometryParameters;
use crate::sculpture::mesh::{BoundingBox, TriangleMesh};
use crate::sculpture::profile::Profile;

/// Surface joining profile `lower` to profile `lower + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoftSpan {
    pub lower: usize,
    pub upper: usize,
}

/// The generated solid: a stack of profiles at strictly increasing heights,
/// the loft spans between neighbours, and implicit end caps.
#[derive(Debug, Clone, PartialEq)]
pub struct SculptureModel {
    profiles: Vec<Profile>,
    spans: Vec<LoftSpan>,
    parameters: Vec<GeometryParameters>,
    mesh: TriangleMesh,
}

impl SculptureModel {
    /// Assembles a model; `profiles[i]` must come from `parameters[i]`.
    pub(crate) fn new(profiles: Vec<Profile>, parameters: Vec<GeometryParameters>) -> Self {
        let spans = (1..profiles.len())
            .map(|upper| LoftSpan {
                lower: upper - 1,
                upper,
            })
            .collect();
        let mesh = TriangleMesh::loft(&profiles);
        Self {
            profiles,
            spans,
            parameters,
            mesh,
        }
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn spans(&self) -> &[LoftSpan] {
        &self.spans
    }

    /// Per-sample parameters the profiles were built from.
    pub fn parameters(&self) -> &[GeometryParameters] {
        &self.parameters
    }

    pub fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }

    pub fn profile_points(&self) -> usize {
        self.profiles.first().map_or(0, Profile::len)
    }

    /// Height of the top profile.
    pub fn height(&self) -> f64 {
        self.profiles.last().map_or(0.0, |p| p.z)
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        self.mesh.bounds()
    }

    /// Timeline sample that produced mesh triangle `triangle`.
    ///
    /// Follows the [`TriangleMesh::loft`] layout: a bottom cap, `2n`
    /// triangles per span attributed to the span's upper profile, a top cap.
    pub fn sample_for_triangle(&self, triangle: usize) -> usize {
        let n = self.profile_points().max(1);
        let last = self.profiles.len().saturating_sub(1);
        if triangle < n {
            0
        } else {
            (1 + (triangle - n) / (2 * n)).min(last)
        }
    }
}
