//! Forward scene pass: every mesh shaded by every light, one draw per mesh

use crate::context::validated;
use crate::deferred::to_wgpu;
use crate::gbuffer::DEPTH_FORMAT;
use crate::gpu_mesh::GpuMesh;
use crate::primitives::Vertex;
use crate::program::build_program;
use crate::uniforms::{LightUniform, SceneParams};
use meld_core::{Color, Result};
use meld_field::Light;
use std::num::NonZeroU64;

const LIGHT_SIZE: u64 = std::mem::size_of::<LightUniform>() as u64;

pub struct ScenePass {
    pipeline: wgpu::RenderPipeline,
    lights_layout: wgpu::BindGroupLayout,
    lights_buffer: wgpu::Buffer,
    params_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: usize,
}

impl ScenePass {
    pub fn new(
        device: &wgpu::Device,
        camera_layout: &wgpu::BindGroupLayout,
        target_format: wgpu::TextureFormat,
    ) -> Result<Self> {
        let program = build_program(device, "scene", include_str!("scene.wgsl"))?;
        program.require_uniform("camera", 0, 0)?;
        program.require_uniform("lights", 1, 0)?;
        program.require_uniform("scene", 1, 1)?;

        let lights_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Lights Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(LIGHT_SIZE),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Params Buffer"),
            size: std::mem::size_of::<SceneParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let capacity = 16;
        let (lights_buffer, bind_group) =
            create_lights_buffer(device, &lights_layout, &params_buffer, capacity);

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[camera_layout, &lights_layout],
            push_constant_ranges: &[],
        });
        let attributes = program.vertex_attributes(&Vertex::FIELDS);
        let pipeline = validated(device, "scene pipeline", || {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Scene Pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: program.module(),
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex::layout(&attributes)],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: program.module(),
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: target_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
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
        })?;

        Ok(Self {
            pipeline,
            lights_layout,
            lights_buffer,
            params_buffer,
            bind_group,
            capacity,
        })
    }

    fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, lights: &[Light], ambient: Color) {
        if lights.len() > self.capacity {
            self.capacity = lights.len().next_power_of_two();
            let (buffer, bind_group) =
                create_lights_buffer(device, &self.lights_layout, &self.params_buffer, self.capacity);
            self.lights_buffer = buffer;
            self.bind_group = bind_group;
        }
        let packed: Vec<LightUniform> = lights.iter().map(LightUniform::from).collect();
        if !packed.is_empty() {
            queue.write_buffer(&self.lights_buffer, 0, bytemuck::cast_slice(&packed));
        }
        let params = SceneParams {
            ambient: ambient.to_rgba(1.0),
            light_count: lights.len() as u32,
            _pad: [0; 3],
        };
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));
    }

    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        camera: &wgpu::BindGroup,
        meshes: &[&GpuMesh],
        lights: &[Light],
        ambient: Color,
        background: Color,
    ) {
        self.upload(device, queue, lights, ambient);

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(to_wgpu(background)),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if meshes.is_empty() {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, camera, &[]);
        pass.set_bind_group(1, &self.bind_group, &[]);
        for mesh in meshes {
            mesh.draw(&mut pass);
        }
    }
}

fn create_lights_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    params: &wgpu::Buffer,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scene Lights Buffer"),
        size: LIGHT_SIZE * capacity.max(1) as u64,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Scene Lights Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: params.as_entire_binding(),
            },
        ],
    });
    (buffer, bind_group)
}
