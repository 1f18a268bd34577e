//! Triangle mesh of a lofted profile stack and its solid-validity checks.

use crate::sculpture::profile::Profile;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Triangles with less area than this (mm²) count as degenerate.
const MIN_TRIANGLE_AREA: f64 = 1e-9;

/// Axis-aligned bounding box in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    /// Smallest box containing every point; `None` for no points.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a [f64; 3]>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = BoundingBox {
            min: first,
            max: first,
        };
        for point in iter {
            for axis in 0..3 {
                bounds.min[axis] = bounds.min[axis].min(point[axis]);
                bounds.max[axis] = bounds.max[axis].max(point[axis]);
            }
        }
        Some(bounds)
    }

    pub fn size(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Every corner coordinate within `tolerance`.
    pub fn approx_eq(&self, other: &BoundingBox, tolerance: f64) -> bool {
        (0..3).all(|axis| {
            (self.min[axis] - other.min[axis]).abs() <= tolerance
                && (self.max[axis] - other.max[axis]).abs() <= tolerance
        })
    }
}

/// Why a mesh is not a valid closed solid.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDefect {
    /// Offending triangle, when one can be named.
    pub triangle: Option<usize>,
    pub reason: String,
}

impl MeshDefect {
    fn at(triangle: usize, reason: impl Into<String>) -> Self {
        Self {
            triangle: Some(triangle),
            reason: reason.into(),
        }
    }
}

/// Indexed triangle mesh with outward (counter-clockwise) winding.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TriangleMesh {
    vertices: Vec<[f64; 3]>,
    triangles: Vec<[usize; 3]>,
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn length(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

impl TriangleMesh {
    pub fn new(vertices: Vec<[f64; 3]>, triangles: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            triangles,
        }
    }

    /// Lofts consecutive profiles and closes both ends with fan caps.
    ///
    /// Vertex `k` of profile `i` is at index `i * n + k`; the bottom and top
    /// cap centres follow the rings. Triangles are emitted bottom cap first,
    /// then `2n` per loft span, then the top cap.
    pub fn loft(profiles: &[Profile]) -> Self {
        let Some(first) = profiles.first() else {
            return Self::default();
        };
        let n = first.len();
        let m = profiles.len();

        let mut vertices = Vec::with_capacity(m * n + 2);
        for profile in profiles {
            vertices.extend(profile.points.iter().map(|&[x, y]| [x, y, profile.z]));
        }
        let bottom = vertices.len();
        vertices.push([0.0, 0.0, first.z]);
        let top = vertices.len();
        vertices.push([0.0, 0.0, profiles[m - 1].z]);

        let mut triangles = Vec::with_capacity(2 * n * m);
        for k in 0..n {
            triangles.push([bottom, (k + 1) % n, k]);
        }
        for i in 0..m.saturating_sub(1) {
            let lower = i * n;
            let upper = (i + 1) * n;
            for k in 0..n {
                let next = (k + 1) % n;
                triangles.push([lower + k, lower + next, upper + next]);
                triangles.push([lower + k, upper + next, upper + k]);
            }
        }
        let last = (m - 1) * n;
        for k in 0..n {
            triangles.push([top, last + k, last + (k + 1) % n]);
        }

        Self {
            vertices,
            triangles,
        }
    }

    pub fn vertices(&self) -> &[[f64; 3]] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn corners(&self, triangle: usize) -> [[f64; 3]; 3] {
        let [a, b, c] = self.triangles[triangle];
        [self.vertices[a], self.vertices[b], self.vertices[c]]
    }

    /// Unit normal from the winding order (zero for degenerate triangles).
    pub fn normal(&self, triangle: usize) -> [f64; 3] {
        let [a, b, c] = self.corners(triangle);
        let n = cross(sub(b, a), sub(c, a));
        let len = length(n);
        if len > 0.0 {
            [n[0] / len, n[1] / len, n[2] / len]
        } else {
            [0.0, 0.0, 0.0]
        }
    }

    pub fn area(&self, triangle: usize) -> f64 {
        let [a, b, c] = self.corners(triangle);
        length(cross(sub(b, a), sub(c, a))) / 2.0
    }

    /// Enclosed volume by the divergence theorem; positive for outward winding.
    pub fn signed_volume(&self) -> f64 {
        (0..self.triangles.len())
            .map(|t| {
                let [a, b, c] = self.corners(t);
                dot(a, cross(b, c))
            })
            .sum::<f64>()
            / 6.0
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.vertices)
    }

    /// Checks that the mesh is a closed, consistently oriented solid.
    ///
    /// Every directed edge must appear exactly once with its reverse also
    /// present exactly once, no triangle may be degenerate, and the enclosed
    /// volume must be positive.
    pub fn validate(&self) -> Result<(), MeshDefect> {
        if self.triangles.is_empty() {
            return Err(MeshDefect {
                triangle: None,
                reason: "mesh has no triangles".to_string(),
            });
        }

        for (t, &[a, b, c]) in self.triangles.iter().enumerate() {
            if [a, b, c].iter().any(|&v| v >= self.vertices.len()) {
                return Err(MeshDefect::at(t, "vertex index out of range"));
            }
            if self.corners(t).iter().flatten().any(|v| !v.is_finite()) {
                return Err(MeshDefect::at(t, "non-finite vertex"));
            }
            if a == b || b == c || a == c || self.area(t) < MIN_TRIANGLE_AREA {
                return Err(MeshDefect::at(t, "degenerate triangle"));
            }
        }

        let mut edges: HashMap<(usize, usize), usize> = HashMap::new();
        for &[a, b, c] in &self.triangles {
            for edge in [(a, b), (b, c), (c, a)] {
                *edges.entry(edge).or_insert(0) += 1;
            }
        }
        for (t, &[a, b, c]) in self.triangles.iter().enumerate() {
            for (from, to) in [(a, b), (b, c), (c, a)] {
                if edges.get(&(from, to)).copied().unwrap_or(0) != 1 {
                    return Err(MeshDefect::at(t, format!("edge {from}-{to} is used more than once")));
                }
                if edges.get(&(to, from)).copied().unwrap_or(0) != 1 {
                    return Err(MeshDefect::at(t, format!("edge {from}-{to} is open")));
                }
            }
        }

        let volume = self.signed_volume();
        if !volume.is_finite() || volume <= 0.0 {
            return Err(MeshDefect {
                triangle: None,
                reason: format!("enclosed volume {volume} is not positive"),
            });
        }
        Ok(())
    }
}
