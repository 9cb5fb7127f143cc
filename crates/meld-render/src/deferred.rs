//! Deferred point lights: G-buffer fill, ambient resolve, additive light volumes

use crate::context::validated;
use crate::gbuffer::{GBuffer, ALBEDO_FORMAT, DEPTH_FORMAT, NORMAL_FORMAT};
use crate::gpu_mesh::GpuMesh;
use crate::primitives::{sphere_cover_scale, unit_sphere, Vertex, SPHERE_RINGS, SPHERE_SEGMENTS};
use crate::program::{build_program, Program};
use crate::uniforms::{align_to, AmbientUniform, LightVolumeUniform};
use meld_core::{Color, MeldError, Result};
use meld_field::Light;
use std::num::NonZeroU64;

const LIGHT_SIZE: u64 = std::mem::size_of::<LightVolumeUniform>() as u64;

/// Per-frame inputs the compositor does not own
pub struct DeferredTarget<'a> {
    pub view: &'a wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub camera: &'a wgpu::BindGroup,
}

/// Lights the isosurface by drawing one proxy sphere per light.
///
/// Each sphere is scaled to its light's radius, drawn with front faces culled
/// and no depth test so it still covers the pixels when the camera is inside
/// it, and blended additively onto the ambient image. Every light reads the
/// same G-buffer bind group; its own parameters come from one uniform buffer
/// at a dynamic offset.
pub struct DeferredLightCompositor {
    geometry_pipeline: wgpu::RenderPipeline,
    ambient_pipeline: wgpu::RenderPipeline,
    light_pipeline: wgpu::RenderPipeline,
    gbuffer_layout: wgpu::BindGroupLayout,
    gbuffer: Option<GBuffer>,
    ambient_buffer: wgpu::Buffer,
    ambient_bind_group: wgpu::BindGroup,
    light_layout: wgpu::BindGroupLayout,
    light_buffer: wgpu::Buffer,
    light_bind_group: wgpu::BindGroup,
    light_stride: u64,
    light_capacity: usize,
    proxy: GpuMesh,
    cover_scale: f32,
}

fn require_gbuffer(program: &Program) -> Result<()> {
    program.require_uniform("gbuffer_albedo", 1, 0)?;
    program.require_uniform("gbuffer_normal", 1, 1)?;
    program.require_uniform("gbuffer_depth", 1, 2)
}

impl DeferredLightCompositor {
    pub fn new(
        device: &wgpu::Device,
        camera_layout: &wgpu::BindGroupLayout,
        target_format: wgpu::TextureFormat,
    ) -> Result<Self> {
        let geometry = build_program(device, "geometry", include_str!("geometry.wgsl"))?;
        geometry.require_uniform("camera", 0, 0)?;
        let ambient = build_program(device, "ambient", include_str!("ambient.wgsl"))?;
        ambient.require_uniform("ambient", 0, 0)?;
        require_gbuffer(&ambient)?;
        let light = build_program(device, "deferred_light", include_str!("deferred_light.wgsl"))?;
        light.require_uniform("camera", 0, 0)?;
        light.require_uniform("light", 2, 0)?;
        require_gbuffer(&light)?;

        let gbuffer_layout = GBuffer::bind_group_layout(device);

        let ambient_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Ambient Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let ambient_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Ambient Uniform Buffer"),
            size: std::mem::size_of::<AmbientUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let ambient_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Ambient Bind Group"),
            layout: &ambient_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ambient_buffer.as_entire_binding(),
            }],
        });

        let light_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Light Volume Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(LIGHT_SIZE),
                },
                count: None,
            }],
        });
        let light_stride = align_to(
            LIGHT_SIZE,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let light_capacity = 16;
        let (light_buffer, light_bind_group) =
            create_light_buffer(device, &light_layout, light_stride, light_capacity);

        let geometry_pipeline = {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Geometry Pipeline Layout"),
                bind_group_layouts: &[camera_layout],
                push_constant_ranges: &[],
            });
            let attributes = geometry.vertex_attributes(&Vertex::FIELDS);
            validated(device, "geometry pipeline", || {
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("Geometry Pipeline"),
                    layout: Some(&layout),
                    vertex: wgpu::VertexState {
                        module: geometry.module(),
                        entry_point: Some("vs_main"),
                        buffers: &[Vertex::layout(&attributes)],
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: geometry.module(),
                        entry_point: Some("fs_main"),
                        targets: &[
                            Some(wgpu::ColorTargetState {
                                format: ALBEDO_FORMAT,
                                blend: None,
                                write_mask: wgpu::ColorWrites::ALL,
                            }),
                            Some(wgpu::ColorTargetState {
                                format: NORMAL_FORMAT,
                                blend: None,
                                write_mask: wgpu::ColorWrites::ALL,
                            }),
                        ],
                        compilation_options: Default::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        front_face: wgpu::FrontFace::Ccw,
                        cull_mode: None,
                        ..Default::default()
                    },
                    depth_stencil: Some(wgpu::DepthStencilState {
                        format: DEPTH_FORMAT,
                        depth_write_enabled: true,
                        depth_compare: wgpu::CompareFunction::Less,
                        stencil: wgpu::StencilState::default(),
                        bias: wgpu::DepthBiasState::default(),
                    }),
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                })
            })?
        };

        let ambient_pipeline = {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Ambient Pipeline Layout"),
                bind_group_layouts: &[&ambient_layout, &gbuffer_layout],
                push_constant_ranges: &[],
            });
            validated(device, "ambient pipeline", || {
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("Ambient Pipeline"),
                    layout: Some(&layout),
                    vertex: wgpu::VertexState {
                        module: ambient.module(),
                        entry_point: Some("vs_main"),
                        buffers: &[],
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: ambient.module(),
                        entry_point: Some("fs_main"),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: target_format,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: Default::default(),
                    }),
                    primitive: wgpu::PrimitiveState::default(),
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                })
            })?
        };

        let light_pipeline = {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Light Volume Pipeline Layout"),
                bind_group_layouts: &[camera_layout, &gbuffer_layout, &light_layout],
                push_constant_ranges: &[],
            });
            let attributes = light.vertex_attributes(&Vertex::FIELDS);
            let additive = wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            };
            validated(device, "light volume pipeline", || {
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("Light Volume Pipeline"),
                    layout: Some(&layout),
                    vertex: wgpu::VertexState {
                        module: light.module(),
                        entry_point: Some("vs_main"),
                        buffers: &[Vertex::layout(&attributes)],
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: light.module(),
                        entry_point: Some("fs_main"),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: target_format,
                            blend: Some(wgpu::BlendState {
                                color: additive,
                                alpha: additive,
                            }),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: Default::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        front_face: wgpu::FrontFace::Ccw,
                        cull_mode: Some(wgpu::Face::Front),
                        ..Default::default()
                    },
                    // No depth attachment: the depth texture is bound for reading
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                })
            })?
        };

        let proxy = GpuMesh::upload(
            device,
            "Light Proxy",
            &unit_sphere(SPHERE_SEGMENTS, SPHERE_RINGS),
        )
        .ok_or_else(|| MeldError::BuildError("light proxy sphere has no triangles".into()))?;

        Ok(Self {
            geometry_pipeline,
            ambient_pipeline,
            light_pipeline,
            gbuffer_layout,
            gbuffer: None,
            ambient_buffer,
            ambient_bind_group,
            light_layout,
            light_buffer,
            light_bind_group,
            light_stride,
            light_capacity,
            proxy,
            cover_scale: sphere_cover_scale(SPHERE_SEGMENTS, SPHERE_RINGS),
        })
    }

    /// Pack every light at its dynamic offset
    fn upload_lights(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, lights: &[Light]) {
        if lights.len() > self.light_capacity {
            self.light_capacity = lights.len().next_power_of_two();
            let (buffer, bind_group) = create_light_buffer(
                device,
                &self.light_layout,
                self.light_stride,
                self.light_capacity,
            );
            self.light_buffer = buffer;
            self.light_bind_group = bind_group;
        }
        let stride = self.light_stride as usize;
        let mut bytes = vec![0u8; stride * lights.len()];
        for (i, light) in lights.iter().enumerate() {
            let volume = LightVolumeUniform::new(light, self.cover_scale);
            bytes[i * stride..i * stride + LIGHT_SIZE as usize]
                .copy_from_slice(bytemuck::bytes_of(&volume));
        }
        queue.write_buffer(&self.light_buffer, 0, &bytes);
    }

    /// Record the geometry, ambient, and light passes into `encoder`
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &DeferredTarget<'_>,
        meshes: &[&GpuMesh],
        lights: &[Light],
        ambient: Color,
        background: Color,
    ) {
        let stale = self
            .gbuffer
            .as_ref()
            .map_or(true, |g| !g.matches(target.width, target.height));
        if stale {
            self.gbuffer = Some(GBuffer::new(
                device,
                &self.gbuffer_layout,
                target.width,
                target.height,
            ));
        }
        queue.write_buffer(
            &self.ambient_buffer,
            0,
            bytemuck::bytes_of(&AmbientUniform::new(ambient, background)),
        );
        if !lights.is_empty() {
            self.upload_lights(device, queue, lights);
        }
        let Some(gbuffer) = self.gbuffer.as_ref() else {
            return;
        };

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Geometry Pass"),
                color_attachments: &[
                    cleared(&gbuffer.albedo_view),
                    cleared(&gbuffer.normal_view),
                ],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &gbuffer.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            if !meshes.is_empty() {
                pass.set_pipeline(&self.geometry_pipeline);
                pass.set_bind_group(0, target.camera, &[]);
                for mesh in meshes {
                    mesh.draw(&mut pass);
                }
            }
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Lighting Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(to_wgpu(background)),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.ambient_pipeline);
        pass.set_bind_group(0, &self.ambient_bind_group, &[]);
        pass.set_bind_group(1, &gbuffer.bind_group, &[]);
        pass.draw(0..3, 0..1);

        if lights.is_empty() {
            return;
        }
        pass.set_pipeline(&self.light_pipeline);
        pass.set_bind_group(0, target.camera, &[]);
        pass.set_bind_group(1, &gbuffer.bind_group, &[]);
        pass.set_vertex_buffer(0, self.proxy.vertex_buffer.slice(..));
        pass.set_index_buffer(self.proxy.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        for i in 0..lights.len() {
            let offset = (i as u64 * self.light_stride) as u32;
            pass.set_bind_group(2, &self.light_bind_group, &[offset]);
            pass.draw_indexed(0..self.proxy.index_count, 0, 0..1);
        }
    }
}

fn create_light_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    stride: u64,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Light Volume Buffer"),
        size: stride * capacity as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Light Volume Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(LIGHT_SIZE),
            }),
        }],
    });
    (buffer, bind_group)
}

fn cleared(view: &wgpu::TextureView) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            store: wgpu::StoreOp::Store,
        },
    })
}

pub(crate) fn to_wgpu(color: Color) -> wgpu::Color {
    wgpu::Color {
        r: color.r as f64,
        g: color.g as f64,
        b: color.b as f64,
        a: 1.0,
    }
}
