//! Host-side mirrors of the WGSL uniform structs.
//!
//! Field order and padding follow WGSL layout rules: `vec3<f32>` is 16-byte
//! aligned, so each `[f32; 3]` is followed by a scalar or explicit padding.

use crate::camera::Camera;
use bytemuck::{Pod, Zeroable};
use meld_core::{translate_scale, Color, Mat4};
use meld_field::Light;

/// `Camera` in every render shader
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct CameraUniforms {
    pub view_proj: Mat4,
    pub inv_view_proj: Mat4,
    pub position: [f32; 3],
    pub _pad0: f32,
    pub viewport: [f32; 2],
    pub _pad1: [f32; 2],
}

impl CameraUniforms {
    pub fn new(camera: &Camera, width: u32, height: u32) -> Self {
        Self {
            view_proj: camera.view_projection_matrix(),
            inv_view_proj: camera.inverse_view_projection_matrix(),
            position: camera.position.to_array(),
            _pad0: 0.0,
            viewport: [width as f32, height as f32],
            _pad1: [0.0; 2],
        }
    }
}

/// One element of the forward pass light array
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    pub position: [f32; 3],
    pub radius: f32,
    pub color: [f32; 3],
    pub power: f32,
}

impl From<&Light> for LightUniform {
    fn from(light: &Light) -> Self {
        Self {
            position: light.position.to_array(),
            radius: light.radius,
            color: light.color.to_array(),
            power: light.power,
        }
    }
}

/// One light volume in the deferred pass, bound with a dynamic offset
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct LightVolumeUniform {
    pub model: Mat4,
    pub light: LightUniform,
}

impl LightVolumeUniform {
    /// `cover_scale` enlarges the proxy so its faces stay outside `radius`
    pub fn new(light: &Light, cover_scale: f32) -> Self {
        Self {
            model: translate_scale(light.position, light.radius * cover_scale),
            light: LightUniform::from(light),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct AmbientUniform {
    pub ambient: [f32; 4],
    pub background: [f32; 4],
}

impl AmbientUniform {
    pub fn new(ambient: Color, background: Color) -> Self {
        Self {
            ambient: ambient.to_rgba(1.0),
            background: background.to_rgba(1.0),
        }
    }
}

/// `SceneParams` in the forward shader
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SceneParams {
    pub ambient: [f32; 4],
    pub light_count: u32,
    pub _pad: [u32; 3],
}

/// Round `size` up to a multiple of `alignment`
pub fn align_to(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use meld_core::Vec3;

    #[test]
    fn sizes_match_wgsl_layouts() {
        assert_eq!(std::mem::size_of::<CameraUniforms>(), 160);
        assert_eq!(std::mem::size_of::<LightUniform>(), 32);
        assert_eq!(std::mem::size_of::<LightVolumeUniform>(), 96);
        assert_eq!(std::mem::size_of::<AmbientUniform>(), 32);
        assert_eq!(std::mem::size_of::<SceneParams>(), 32);
    }

    #[test]
    fn light_volume_is_scaled_to_radius() {
        let light = Light::new(Vec3::new(0.1, 0.2, 0.3), Color::WHITE, 0.04, 0.1);
        let volume = LightVolumeUniform::new(&light, 1.5);
        assert!((volume.model[0][0] - 0.15).abs() < 1e-6);
        assert_eq!(volume.model[3], [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(volume.light.power, 0.04);
    }

    #[test]
    fn dynamic_offsets_are_aligned() {
        assert_eq!(align_to(96, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
    }
}
