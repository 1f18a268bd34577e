//! Closed planar cross-sections of the sculpture.

use crate::audio::envelope::WaveformEnvelope;
use crate::sculpture::mapping::GeometryParameters;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// A closed ring of vertices in the plane `z`, counter-clockwise seen from +z.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub z: f64,
    /// `[x, y]` per vertex.
    pub points: Vec<[f64; 2]>,
}

/// Deterministic surface ripple in `[-1, 1]` for vertex `k` of `n`.
///
/// A `lobes` harmonic plus a half-amplitude double harmonic, divided by the
/// sum's peak value `3√3/4`.
pub fn ripple(k: usize, n: usize, lobes: u32) -> f64 {
    let theta = TAU * k as f64 / n as f64;
    let lobes = lobes as f64;
    let raw = (lobes * theta).sin() + 0.5 * (2.0 * lobes * theta).sin();
    raw / (3.0 * 3f64.sqrt() / 4.0)
}

impl Profile {
    /// Builds the ring for one set of parameters.
    ///
    /// Vertex `k` sits at angle `2πk/n + twist` and radius
    /// `radius · (1 + perturbation · ripple(k)) · (1 + envelope(k))`.
    pub fn build(
        params: &GeometryParameters,
        points: usize,
        lobes: u32,
        envelope: Option<&WaveformEnvelope>,
    ) -> Self {
        let ring = (0..points)
            .map(|k| {
                let angle = TAU * k as f64 / points as f64 + params.twist;
                let mut radius = params.radius * (1.0 + params.perturbation * ripple(k, points, lobes));
                if let Some(envelope) = envelope {
                    radius *= 1.0 + envelope.sample_ring(k, points) as f64;
                }
                [radius * angle.cos(), radius * angle.sin()]
            })
            .collect();
        Self {
            z: params.height,
            points: ring,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Distance of vertex `k` from the axis.
    pub fn radius_at(&self, k: usize) -> f64 {
        let [x, y] = self.points[k];
        x.hypot(y)
    }

    /// Mean vertex distance from the axis.
    pub fn mean_radius(&self) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        (0..self.points.len()).map(|k| self.radius_at(k)).sum::<f64>() / self.points.len() as f64
    }

    /// Signed shoelace area; positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        (0..n)
            .map(|k| {
                let [x0, y0] = self.points[k];
                let [x1, y1] = self.points[(k + 1) % n];
                x0 * y1 - x1 * y0
            })
            .sum::<f64>()
            / 2.0
    }
}
