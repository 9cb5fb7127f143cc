//! Vertex layout and the light-volume sphere

use bytemuck::{Pod, Zeroable};
use meld_core::{Color, MeshData, MeshVertex, Vec3};
use std::f32::consts::PI;

/// A vertex with position, normal, and color
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

impl Vertex {
    /// Shader input name, format, and byte offset of every field
    pub const FIELDS: [(&'static str, wgpu::VertexFormat, u64); 3] = [
        ("position", wgpu::VertexFormat::Float32x3, 0),
        ("normal", wgpu::VertexFormat::Float32x3, 12),
        ("color", wgpu::VertexFormat::Float32x4, 24),
    ];

    pub fn layout(attributes: &[wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }
}

impl From<&MeshVertex> for Vertex {
    fn from(v: &MeshVertex) -> Self {
        Self {
            position: v.position.to_array(),
            normal: v.normal.to_array(),
            color: v.color.to_rgba(1.0),
        }
    }
}

pub const SPHERE_SEGMENTS: u32 = 16;
pub const SPHERE_RINGS: u32 = 12;

/// Unit UV sphere, counter-clockwise when seen from outside
pub fn unit_sphere(segments: u32, rings: u32) -> MeshData {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let mut mesh = MeshData::new();

    for r in 0..=rings {
        let theta = PI * r as f32 / rings as f32;
        for s in 0..=segments {
            let phi = 2.0 * PI * s as f32 / segments as f32;
            let p = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
            mesh.vertices.push(MeshVertex {
                position: p,
                normal: p,
                color: Color::WHITE,
            });
        }
    }

    let row = segments + 1;
    for r in 0..rings {
        for s in 0..segments {
            let a = r * row + s;
            let b = a + row;
            // The pole rows collapse one triangle of each quad to a point
            if r != 0 {
                mesh.triangles.push([a, a + 1, b]);
            }
            if r != rings - 1 {
                mesh.triangles.push([a + 1, b + 1, b]);
            }
        }
    }
    mesh
}

/// Scale that pushes every face of [`unit_sphere`] out past the unit sphere
pub fn sphere_cover_scale(segments: u32, rings: u32) -> f32 {
    let segments = segments.max(3) as f32;
    let rings = rings.max(2) as f32;
    1.0 / ((PI / segments).cos() * (PI / (2.0 * rings)).cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_fields_match_struct_layout() {
        assert_eq!(std::mem::size_of::<Vertex>(), 40);
        let v = Vertex::zeroed();
        let base = &v as *const Vertex as usize;
        assert_eq!(&v.normal as *const _ as usize - base, Vertex::FIELDS[1].2 as usize);
        assert_eq!(&v.color as *const _ as usize - base, Vertex::FIELDS[2].2 as usize);
    }

    #[test]
    fn sphere_is_closed_and_faces_outward() {
        let mesh = unit_sphere(SPHERE_SEGMENTS, SPHERE_RINGS);
        mesh.validate().unwrap();
        for t in &mesh.triangles {
            let [a, b, c] = t.map(|i| mesh.vertices[i as usize].position);
            let n = (b - a).cross(&(c - a));
            let centroid = (a + b + c) / 3.0;
            assert!(n.length() > 0.0, "degenerate triangle {:?}", t);
            assert!(n.dot(&centroid) > 0.0, "inward triangle {:?}", t);
        }
    }

    #[test]
    fn scaled_sphere_covers_unit_radius() {
        let scale = sphere_cover_scale(SPHERE_SEGMENTS, SPHERE_RINGS);
        let mesh = unit_sphere(SPHERE_SEGMENTS, SPHERE_RINGS);
        for t in &mesh.triangles {
            let [a, b, c] = t.map(|i| mesh.vertices[i as usize].position * scale);
            let n = (b - a).cross(&(c - a)).normalized();
            // Distance from the center to the face plane
            assert!(n.dot(&a) >= 1.0 - 1e-4, "face plane at {}", n.dot(&a));
        }
    }
}
