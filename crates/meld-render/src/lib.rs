//! Meld Render - wgpu renderer and GPU lattice sampler
//!
//! Draws the extracted isosurface in one of two display modes: a forward
//! "scene" pass, or deferred point lights composited from a G-buffer with one
//! additive light volume per light. Also hosts the compute kernel that samples
//! the scalar field on the GPU.

mod camera;
mod compute;
mod context;
mod deferred;
mod forward;
mod gbuffer;
mod gpu_mesh;
mod headless;
pub mod lighting;
mod primitives;
mod program;
mod renderer;
mod surface;
mod uniforms;

pub use camera::{mat4_inverse, Camera};
pub use compute::{dispatch_size, GpuFieldSampler, GpuSource, LatticeUniform, Vec3Padded};
pub use context::{request_device, RenderError};
pub use deferred::{DeferredLightCompositor, DeferredTarget};
pub use forward::ScenePass;
pub use gbuffer::GBuffer;
pub use gpu_mesh::{GpuMesh, MeshSlot};
pub use headless::HeadlessContext;
pub use primitives::{sphere_cover_scale, unit_sphere, Vertex};
pub use program::{build_program, Program, ProgramInfo, UniformSlot};
pub use renderer::{Frame, Renderer};
pub use surface::RenderSurface;
pub use uniforms::{AmbientUniform, CameraUniforms, LightUniform, LightVolumeUniform, SceneParams};

#[cfg(test)]
mod tests {
    #[test]
    fn geometry_wgsl_parses() {
        let source = include_str!("geometry.wgsl");
        naga::front::wgsl::parse_str(source).expect("geometry.wgsl failed to parse");
    }

    #[test]
    fn ambient_wgsl_parses() {
        let source = include_str!("ambient.wgsl");
        naga::front::wgsl::parse_str(source).expect("ambient.wgsl failed to parse");
    }

    #[test]
    fn deferred_light_wgsl_parses() {
        let source = include_str!("deferred_light.wgsl");
        naga::front::wgsl::parse_str(source).expect("deferred_light.wgsl failed to parse");
    }

    #[test]
    fn scene_wgsl_parses() {
        let source = include_str!("scene.wgsl");
        naga::front::wgsl::parse_str(source).expect("scene.wgsl failed to parse");
    }

    #[test]
    fn field_wgsl_parses() {
        let source = include_str!("field.wgsl");
        naga::front::wgsl::parse_str(source).expect("field.wgsl failed to parse");
    }
}
