//! Indexed triangle mesh shared by the isosurface builder, OBJ import, and the renderer

use crate::error::{MeldError, Result};
use crate::types::{Color, Vec3};
use serde::Serialize;

/// A mesh vertex: position, unit normal, and base color
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub color: Color,
}

/// Indexed triangle mesh. Immutable once built; a rebuild produces a new value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub triangles: Vec<[u32; 3]>,
}

/// Summary numbers reported after a build
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MeshStats {
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub bounds_min: [f32; 3],
    pub bounds_max: [f32; 3],
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mesh after checking that every index refers to an existing vertex
    pub fn from_parts(vertices: Vec<MeshVertex>, triangles: Vec<[u32; 3]>) -> Result<Self> {
        let mesh = Self {
            vertices,
            triangles,
        };
        mesh.validate()?;
        Ok(mesh)
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Reject any triangle index `>= vertex_count`
    pub fn validate(&self) -> Result<()> {
        let n = self.vertices.len();
        for (t, tri) in self.triangles.iter().enumerate() {
            if let Some(&bad) = tri.iter().find(|&&i| i as usize >= n) {
                return Err(MeldError::BuildError(format!(
                    "triangle {} references vertex {} but the mesh has {} vertices",
                    t, bad, n
                )));
            }
        }
        Ok(())
    }

    /// Axis-aligned bounds, `None` for a mesh without vertices
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = self.vertices.first()?.position;
        Some(
            self.vertices
                .iter()
                .fold((first, first), |(lo, hi), v| {
                    (lo.min(&v.position), hi.max(&v.position))
                }),
        )
    }

    pub fn stats(&self) -> MeshStats {
        let (lo, hi) = self.bounds().unwrap_or((Vec3::ZERO, Vec3::ZERO));
        MeshStats {
            vertex_count: self.vertex_count(),
            triangle_count: self.triangle_count(),
            bounds_min: lo.to_array(),
            bounds_max: hi.to_array(),
        }
    }

    /// Overwrite every vertex color
    pub fn set_color(&mut self, color: Color) {
        for v in &mut self.vertices {
            v.color = color;
        }
    }

    /// Recompute vertex normals as the angle-weighted sum of adjacent face normals.
    ///
    /// Vertices not referenced by any non-degenerate triangle end up with a zero normal.
    pub fn recompute_normals(&mut self) {
        let mut acc = vec![Vec3::ZERO; self.vertices.len()];

        for tri in &self.triangles {
            let p = [
                self.vertices[tri[0] as usize].position,
                self.vertices[tri[1] as usize].position,
                self.vertices[tri[2] as usize].position,
            ];
            let face = (p[1] - p[0]).cross(&(p[2] - p[0])).normalized();
            if face == Vec3::ZERO {
                continue;
            }
            for corner in 0..3 {
                let a = (p[(corner + 1) % 3] - p[corner]).normalized();
                let b = (p[(corner + 2) % 3] - p[corner]).normalized();
                let angle = a.dot(&b).clamp(-1.0, 1.0).acos();
                acc[tri[corner] as usize] += face * angle;
            }
        }

        for (v, n) in self.vertices.iter_mut().zip(acc) {
            v.normal = n.normalized();
        }
    }
}
