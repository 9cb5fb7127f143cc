//! GPU-resident meshes and the slot the renderer draws from

use crate::primitives::Vertex;
use meld_core::{MeshData, Result};
use wgpu::util::DeviceExt;

/// Vertex and index buffers for one uploaded mesh
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub vertex_count: u32,
}

impl GpuMesh {
    /// Upload `mesh`. Meshes without triangles have nothing to draw and give `None`.
    pub fn upload(device: &wgpu::Device, label: &str, mesh: &MeshData) -> Option<Self> {
        if mesh.is_empty() {
            return None;
        }
        let vertices: Vec<Vertex> = mesh.vertices.iter().map(Vertex::from).collect();
        let indices: Vec<u32> = mesh.triangles.iter().flatten().copied().collect();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", label)),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", label)),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Some(Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            vertex_count: vertices.len() as u32,
        })
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// The mesh currently on screen.
///
/// A new mesh is fully uploaded before it replaces the old one, and a failed
/// rebuild leaves the old one in place.
#[derive(Default)]
pub struct MeshSlot {
    current: Option<GpuMesh>,
    generation: u64,
}

impl MeshSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mesh(&self) -> Option<&GpuMesh> {
        self.current.as_ref()
    }

    /// Number of successful replacements so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Publish the outcome of a rebuild. Errors are passed back unchanged
    /// after logging and the displayed mesh is kept.
    pub fn replace(&mut self, device: &wgpu::Device, rebuilt: Result<MeshData>) -> Result<()> {
        match rebuilt {
            Ok(mesh) => {
                let uploaded = GpuMesh::upload(device, "Isosurface", &mesh);
                self.current = uploaded;
                self.generation += 1;
                Ok(())
            }
            Err(e) => {
                log::error!("rebuild failed, keeping previous mesh: {}", e);
                Err(e)
            }
        }
    }
}
