//! Sculpture export (STL, JSON profile stack) and re-import for inspection.

use crate::error::{Result, SculptError};
use crate::sculpture::mapping::GeometryParameters;
use crate::sculpture::mesh::{BoundingBox, TriangleMesh};
use crate::sculpture::model::SculptureModel;
use crate::sculpture::profile::Profile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

const STL_HEADER_LEN: usize = 80;
const STL_TRIANGLE_LEN: usize = 50;
const PROFILE_STACK_VERSION: u32 = 1;

/// Vertices closer than this in z (mm) belong to the same profile.
const Z_LEVEL_TOLERANCE: f64 = 1e-3;

/// Output format for a generated sculpture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// Binary STL.
    #[default]
    Stl,
    StlAscii,
    /// Lossless JSON profile stack.
    Json,
}

impl ExportFormat {
    /// Format implied by a file extension (`.stl` is binary).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "stl" => Some(ExportFormat::Stl),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Stl | ExportFormat::StlAscii => "stl",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportFormat::Stl => "stl",
            ExportFormat::StlAscii => "stl-ascii",
            ExportFormat::Json => "json",
        };
        f.write_str(name)
    }
}

impl FromStr for ExportFormat {
    type Err = SculptError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stl" | "stl-binary" => Ok(ExportFormat::Stl),
            "stl-ascii" | "ascii" => Ok(ExportFormat::StlAscii),
            "json" => Ok(ExportFormat::Json),
            other => Err(SculptError::Export {
                message: format!("unknown export format '{other}' (expected stl, stl-ascii or json)"),
            }),
        }
    }
}

/// Serialized form of a sculpture: every profile ring plus its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileStack {
    pub format_version: u32,
    pub profile_points: usize,
    pub profiles: Vec<Profile>,
    pub parameters: Vec<GeometryParameters>,
}

impl ProfileStack {
    pub fn from_model(model: &SculptureModel) -> Self {
        Self {
            format_version: PROFILE_STACK_VERSION,
            profile_points: model.profile_points(),
            profiles: model.profiles().to_vec(),
            parameters: model.parameters().to_vec(),
        }
    }

    /// Summary of the solid the stack lofts into.
    pub fn summary(&self) -> Result<ImportedSolid> {
        let mesh = TriangleMesh::loft(&self.profiles);
        let bounds = mesh.bounds().ok_or_else(|| SculptError::Import {
            message: "profile stack is empty".to_string(),
        })?;
        Ok(ImportedSolid {
            triangles: mesh.triangle_count(),
            profile_count: self.profiles.len(),
            bounds,
        })
    }
}

/// What an exported file contains, as recovered by re-import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedSolid {
    pub triangles: usize,
    /// Distinct vertex z-levels.
    pub profile_count: usize,
    pub bounds: BoundingBox,
}

fn as_f32_triplet(v: [f64; 3]) -> [f32; 3] {
    [v[0] as f32, v[1] as f32, v[2] as f32]
}

/// Writes the model's mesh as binary STL.
pub fn write_stl_binary<W: Write>(model: &SculptureModel, mut writer: W) -> Result<()> {
    let mesh = model.mesh();
    let mut header = [0u8; STL_HEADER_LEN];
    let label = b"memsculpt binary STL";
    header[..label.len()].copy_from_slice(label);
    writer.write_all(&header)?;

    let count = u32::try_from(mesh.triangle_count()).map_err(|_| SculptError::Export {
        message: format!("{} triangles exceed the STL limit", mesh.triangle_count()),
    })?;
    writer.write_all(&count.to_le_bytes())?;

    let mut record = Vec::with_capacity(STL_TRIANGLE_LEN);
    for t in 0..mesh.triangle_count() {
        record.clear();
        let corners = mesh.corners(t);
        for vector in std::iter::once(mesh.normal(t)).chain(corners) {
            for value in as_f32_triplet(vector) {
                record.extend_from_slice(&value.to_le_bytes());
            }
        }
        record.extend_from_slice(&0u16.to_le_bytes());
        writer.write_all(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the model's mesh as ASCII STL.
pub fn write_stl_ascii<W: Write>(model: &SculptureModel, mut writer: W) -> Result<()> {
    let mesh = model.mesh();
    writeln!(writer, "solid memsculpt")?;
    for t in 0..mesh.triangle_count() {
        let [nx, ny, nz] = mesh.normal(t);
        writeln!(writer, "  facet normal {nx:e} {ny:e} {nz:e}")?;
        writeln!(writer, "    outer loop")?;
        for [x, y, z] in mesh.corners(t) {
            writeln!(writer, "      vertex {x:e} {y:e} {z:e}")?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }
    writeln!(writer, "endsolid memsculpt")?;
    writer.flush()?;
    Ok(())
}

/// Writes the lossless JSON profile stack.
pub fn write_profile_json<W: Write>(model: &SculptureModel, writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, &ProfileStack::from_model(model))?;
    Ok(())
}

/// Writes `model` in `format`.
pub fn write_model<W: Write>(model: &SculptureModel, format: ExportFormat, writer: W) -> Result<()> {
    match format {
        ExportFormat::Stl => write_stl_binary(model, writer),
        ExportFormat::StlAscii => write_stl_ascii(model, writer),
        ExportFormat::Json => write_profile_json(model, writer),
    }
}

/// Writes `model` to `path`, creating or truncating the file.
pub fn export_to_path(model: &SculptureModel, format: ExportFormat, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| SculptError::Export {
        message: format!("cannot create {}: {e}", path.display()),
    })?;
    write_model(model, format, BufWriter::new(file))?;
    tracing::info!(path = %path.display(), %format, "Sculpture exported");
    Ok(())
}

pub fn read_profile_json(bytes: &[u8]) -> Result<ProfileStack> {
    let stack: ProfileStack = serde_json::from_slice(bytes).map_err(|e| SculptError::Import {
        message: format!("invalid profile stack: {e}"),
    })?;
    if stack.format_version != PROFILE_STACK_VERSION {
        return Err(SculptError::Import {
            message: format!("unsupported profile stack version {}", stack.format_version),
        });
    }
    if stack.profiles.iter().any(|p| p.len() != stack.profile_points) {
        return Err(SculptError::Import {
            message: "profiles have differing vertex counts".to_string(),
        });
    }
    Ok(stack)
}

/// Reads binary or ASCII STL.
///
/// A file whose size matches its binary triangle count is binary even if
/// its header starts with `solid`.
pub fn read_stl(bytes: &[u8]) -> Result<ImportedSolid> {
    let vertices = if is_binary_stl(bytes) {
        parse_binary_stl(bytes)
    } else if bytes.trim_ascii_start().starts_with(b"solid") {
        parse_ascii_stl(bytes)?
    } else {
        return Err(SculptError::Import {
            message: "not an STL file".to_string(),
        });
    };

    let bounds = BoundingBox::from_points(&vertices).ok_or_else(|| SculptError::Import {
        message: "STL contains no triangles".to_string(),
    })?;
    Ok(ImportedSolid {
        triangles: vertices.len() / 3,
        profile_count: count_z_levels(&vertices),
        bounds,
    })
}

/// Re-imports an exported file, choosing the reader by extension.
pub fn read_solid(path: &Path) -> Result<ImportedSolid> {
    let bytes = std::fs::read(path)?;
    match ExportFormat::from_path(path) {
        Some(ExportFormat::Json) => read_profile_json(&bytes)?.summary(),
        _ => read_stl(&bytes),
    }
}

fn is_binary_stl(bytes: &[u8]) -> bool {
    if bytes.len() < STL_HEADER_LEN + 4 {
        return false;
    }
    let mut count = [0u8; 4];
    count.copy_from_slice(&bytes[STL_HEADER_LEN..STL_HEADER_LEN + 4]);
    let count = u32::from_le_bytes(count) as usize;
    count
        .checked_mul(STL_TRIANGLE_LEN)
        .and_then(|body| body.checked_add(STL_HEADER_LEN + 4))
        == Some(bytes.len())
}

fn read_f32(bytes: &[u8], offset: usize) -> f64 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    f32::from_le_bytes(raw) as f64
}

fn parse_binary_stl(bytes: &[u8]) -> Vec<[f64; 3]> {
    bytes[STL_HEADER_LEN + 4..]
        .chunks_exact(STL_TRIANGLE_LEN)
        .flat_map(|record| {
            // skip the 12-byte normal
            (0..3).map(move |corner| {
                let base = 12 + corner * 12;
                [
                    read_f32(record, base),
                    read_f32(record, base + 4),
                    read_f32(record, base + 8),
                ]
            })
        })
        .collect()
}

fn parse_ascii_stl(bytes: &[u8]) -> Result<Vec<[f64; 3]>> {
    let text = std::str::from_utf8(bytes).map_err(|e| SculptError::Import {
        message: format!("ASCII STL is not UTF-8: {e}"),
    })?;
    let mut vertices = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("vertex") {
            continue;
        }
        let coords: Vec<f64> = tokens
            .map(str::parse::<f64>)
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| SculptError::Import {
                message: format!("line {}: bad vertex: {e}", line_no + 1),
            })?;
        let [x, y, z] = coords[..] else {
            return Err(SculptError::Import {
                message: format!("line {}: vertex needs 3 coordinates", line_no + 1),
            });
        };
        vertices.push([x, y, z]);
    }
    if vertices.len() % 3 != 0 {
        return Err(SculptError::Import {
            message: format!("{} vertices do not form whole triangles", vertices.len()),
        });
    }
    Ok(vertices)
}

fn count_z_levels(vertices: &[[f64; 3]]) -> usize {
    let mut levels: Vec<f64> = vertices.iter().map(|v| v[2]).collect();
    levels.sort_by(|a, b| a.total_cmp(b));
    let mut count = 0;
    let mut current: Option<f64> = None;
    for z in levels {
        match current {
            Some(level) if z - level <= Z_LEVEL_TOLERANCE => {}
            _ => {
                count += 1;
                current = Some(z);
            }
        }
    }
    count
}
