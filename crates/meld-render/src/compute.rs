//! Lattice sampling on the GPU.
//!
//! The kernel writes field values and edge flags for every lattice point;
//! the host reads both back and checks them against each other before
//! handing the lattice to the CPU stages.

use crate::context::{pop_validation_error, validated};
use crate::program::build_program;
use bytemuck::{Pod, Zeroable};
use meld_core::{Color, MeldError, MeshData, Result, Vec3};
use meld_field::{extract_from_lattice, LatticeParams, PointSource, SampledLattice};
use wgpu::util::DeviceExt;

const WORKGROUP_SIZE: u32 = 64;

/// A `vec3<f32>` as it sits in a uniform or storage struct: 12 bytes of data
/// padded to the 16-byte alignment WGSL requires
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vec3Padded {
    pub xyz: [f32; 3],
    pub _pad: f32,
}

impl From<Vec3> for Vec3Padded {
    fn from(v: Vec3) -> Self {
        Self {
            xyz: v.to_array(),
            _pad: 0.0,
        }
    }
}

/// `Source` in field.wgsl. The power sits in the padding lane of the
/// position, so one source is exactly 16 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuSource {
    pub position: [f32; 3],
    pub power: f32,
}

impl From<&PointSource> for GpuSource {
    fn from(s: &PointSource) -> Self {
        Self {
            position: s.position.to_array(),
            power: s.power,
        }
    }
}

/// `Lattice` in field.wgsl
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LatticeUniform {
    pub origin: Vec3Padded,
    pub step: Vec3Padded,
    pub points: [u32; 3],
    pub threshold: f32,
    pub source_count: u32,
    /// Invocations per dispatch row, for grids larger than one dispatch dimension
    pub row_stride: u32,
    pub _pad: [u32; 2],
}

/// Workgroup counts covering `points` invocations, plus the row stride the
/// kernel uses to rebuild the flat index
pub fn dispatch_size(points: u32, max_per_dimension: u32) -> ([u32; 2], u32) {
    let groups = points.div_ceil(WORKGROUP_SIZE).max(1);
    let x = groups.min(max_per_dimension.max(1));
    let y = groups.div_ceil(x);
    ([x, y], x * WORKGROUP_SIZE)
}

impl LatticeUniform {
    pub fn new(params: &LatticeParams, source_count: u32, row_stride: u32) -> Self {
        let [px, py, pz] = params.points();
        Self {
            origin: Vec3::splat(-params.half_extent).into(),
            step: params.step().into(),
            points: [px as u32, py as u32, pz as u32],
            threshold: params.threshold,
            source_count,
            row_stride,
            _pad: [0; 2],
        }
    }
}

/// Compiled sampling kernels
pub struct GpuFieldSampler {
    layout: wgpu::BindGroupLayout,
    sample_pipeline: wgpu::ComputePipeline,
    classify_pipeline: wgpu::ComputePipeline,
}

impl GpuFieldSampler {
    pub fn new(device: &wgpu::Device) -> Result<Self> {
        let program = build_program(device, "field", include_str!("field.wgsl"))?;
        program.require_uniform("lattice", 0, 0)?;
        program.require_uniform("sources", 0, 1)?;
        program.require_uniform("values", 0, 2)?;
        program.require_uniform("edge_flags", 0, 3)?;

        let storage = |binding, read_only| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Field Sampler Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage(1, true),
                storage(2, false),
                storage(3, false),
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Field Sampler Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let kernel = |entry: &str| {
            validated(device, entry, || {
                device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(entry),
                    layout: Some(&pipeline_layout),
                    module: program.module(),
                    entry_point: Some(entry),
                    compilation_options: Default::default(),
                    cache: None,
                })
            })
        };
        let sample_pipeline = kernel("sample_field")?;
        let classify_pipeline = kernel("classify_edges")?;

        Ok(Self {
            layout,
            sample_pipeline,
            classify_pipeline,
        })
    }

    /// Sample the field of `sources` over the lattice described by `params`
    pub fn sample(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        sources: &[PointSource],
        params: &LatticeParams,
    ) -> Result<SampledLattice> {
        params.validate()?;
        let count = params.point_count();
        let points = u32::try_from(count).map_err(|_| {
            MeldError::ResourceError(format!("{} lattice points exceed one dispatch", count))
        })?;
        let (groups, row_stride) =
            dispatch_size(points, device.limits().max_compute_workgroups_per_dimension);

        let mut packed: Vec<GpuSource> = sources.iter().map(GpuSource::from).collect();
        let source_count = packed.len() as u32;
        if packed.is_empty() {
            packed.push(GpuSource::default());
        }
        let uniform = LatticeUniform::new(params, source_count, row_stride);

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lattice Uniform"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let source_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Source Buffer"),
            contents: bytemuck::cast_slice(&packed),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let size = (count * std::mem::size_of::<u32>()) as u64;
        let output = |label| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        };
        let values_buffer = output("Lattice Values");
        let flags_buffer = output("Edge Flags");
        let readback = |label| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            })
        };
        let values_readback = readback("Lattice Values Readback");
        let flags_readback = readback("Edge Flags Readback");

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Field Sampler Bind Group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: source_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: values_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: flags_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Field Sampler Encoder"),
        });
        // Classification reads neighbours, so it runs in its own pass after sampling
        for (label, pipeline) in [
            ("Sample Field", &self.sample_pipeline),
            ("Classify Edges", &self.classify_pipeline),
        ] {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(label),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups[0], groups[1], 1);
        }
        encoder.copy_buffer_to_buffer(&values_buffer, 0, &values_readback, 0, size);
        encoder.copy_buffer_to_buffer(&flags_buffer, 0, &flags_readback, 0, size);
        queue.submit(std::iter::once(encoder.finish()));

        if let Some(e) = pop_validation_error(device) {
            return Err(MeldError::ResourceError(format!("field sampling failed: {}", e)));
        }

        let values: Vec<f32> = read_buffer(device, &values_readback)?;
        let flags: Vec<u32> = read_buffer(device, &flags_readback)?;
        let flags = flags.into_iter().map(|f| f as u8).collect();

        SampledLattice::from_parts(params.clone(), values, flags)
    }

    /// Sample on the GPU and finish the extraction on the CPU
    pub fn build_isosurface(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        sources: &[PointSource],
        params: &LatticeParams,
        color: Color,
    ) -> Result<MeshData> {
        let lattice = self.sample(device, queue, sources, params)?;
        extract_from_lattice(sources, &lattice, color)
    }
}

fn read_buffer<T: Pod>(device: &wgpu::Device, buffer: &wgpu::Buffer) -> Result<Vec<T>> {
    let slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    rx.recv()
        .map_err(|e| MeldError::ResourceError(e.to_string()))?
        .map_err(|e| MeldError::ResourceError(e.to_string()))?;

    let data = slice.get_mapped_range();
    let out = bytemuck::cast_slice(&data).to_vec();
    drop(data);
    buffer.unmap();
    Ok(out)
}
