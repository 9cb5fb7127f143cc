//! Per-pixel surface attributes written by the geometry pass

use crate::context::create_target;

pub const ALBEDO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Albedo, world normal, and depth, readable by the lighting passes at
/// bindings 0, 1, and 2 of one bind group
pub struct GBuffer {
    pub width: u32,
    pub height: u32,
    pub albedo_view: wgpu::TextureView,
    pub normal_view: wgpu::TextureView,
    pub depth_view: wgpu::TextureView,
    pub bind_group: wgpu::BindGroup,
    _textures: [wgpu::Texture; 3],
}

impl GBuffer {
    pub fn bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        let texture = |binding, sample_type| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type,
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("G-Buffer Layout"),
            entries: &[
                texture(0, wgpu::TextureSampleType::Float { filterable: false }),
                texture(1, wgpu::TextureSampleType::Float { filterable: false }),
                texture(2, wgpu::TextureSampleType::Depth),
            ],
        })
    }

    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, width: u32, height: u32) -> Self {
        let usage = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        let (albedo, albedo_view) =
            create_target(device, "G-Buffer Albedo", width, height, ALBEDO_FORMAT, usage);
        let (normal, normal_view) =
            create_target(device, "G-Buffer Normal", width, height, NORMAL_FORMAT, usage);
        let (depth, depth_view) =
            create_target(device, "G-Buffer Depth", width, height, DEPTH_FORMAT, usage);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("G-Buffer Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&albedo_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&normal_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&depth_view),
                },
            ],
        });

        Self {
            width,
            height,
            albedo_view,
            normal_view,
            depth_view,
            bind_group,
            _textures: [albedo, normal, depth],
        }
    }

    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }
}
