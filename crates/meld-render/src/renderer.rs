//! Frame orchestration for both display modes

use crate::camera::Camera;
use crate::context::pop_validation_error;
use crate::deferred::{DeferredLightCompositor, DeferredTarget};
use crate::forward::ScenePass;
use crate::gpu_mesh::GpuMesh;
use crate::surface::RenderSurface;
use crate::uniforms::CameraUniforms;
use meld_core::{Color, DisplayMode, MeldError, RenderConfig, Result};
use meld_field::Light;

/// The camera uniform shared by every pass at group 0
struct CameraBinding {
    layout: wgpu::BindGroupLayout,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl CameraBinding {
    fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Camera Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Uniform Buffer"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self {
            layout,
            buffer,
            bind_group,
        }
    }
}

/// What to draw this frame
pub struct Frame<'a> {
    pub mode: DisplayMode,
    pub camera: &'a Camera,
    /// The extracted isosurface, if there is one yet
    pub mesh: Option<&'a GpuMesh>,
    /// Static meshes drawn alongside the isosurface
    pub decorations: &'a [GpuMesh],
    pub lights: &'a [Light],
    pub ambient: Color,
    pub background: Color,
}

impl<'a> Frame<'a> {
    pub fn new(
        config: &RenderConfig,
        camera: &'a Camera,
        mesh: Option<&'a GpuMesh>,
        lights: &'a [Light],
    ) -> Self {
        Self {
            mode: config.display_mode,
            camera,
            mesh,
            decorations: &[],
            lights,
            ambient: config.ambient,
            background: config.background,
        }
    }

    pub fn with_decorations(mut self, decorations: &'a [GpuMesh]) -> Self {
        self.decorations = decorations;
        self
    }

    /// The isosurface first, then every decoration
    fn meshes(&self) -> Vec<&'a GpuMesh> {
        self.mesh.into_iter().chain(self.decorations).collect()
    }
}

pub struct Renderer {
    camera: CameraBinding,
    scene: ScenePass,
    deferred: DeferredLightCompositor,
}

impl Renderer {
    /// Build every program and pipeline. A compile failure is recorded on the
    /// surface, so later frames on it draw nothing.
    pub fn new<S: RenderSurface>(surface: &mut S) -> Result<Self> {
        let built = Self::build(surface.device(), surface.format());
        if let Err(e) = &built {
            surface.set_error(e.to_string());
        }
        built
    }

    fn build(device: &wgpu::Device, format: wgpu::TextureFormat) -> Result<Self> {
        let camera = CameraBinding::new(device);
        let scene = ScenePass::new(device, &camera.layout, format)?;
        let deferred = DeferredLightCompositor::new(device, &camera.layout, format)?;
        Ok(Self {
            camera,
            scene,
            deferred,
        })
    }

    /// Draw one frame into `surface`
    pub fn render_frame<S: RenderSurface>(&mut self, surface: &mut S, frame: &Frame<'_>) -> Result<()> {
        if let Some(message) = surface.error() {
            return Err(MeldError::CompileError(message.to_string()));
        }
        surface.make_current()?;

        let failure = {
            let device = surface.device();
            let queue = surface.queue();
            let (width, height) = (surface.width(), surface.height());

            queue.write_buffer(
                &self.camera.buffer,
                0,
                bytemuck::bytes_of(&CameraUniforms::new(frame.camera, width, height)),
            );

            let meshes = frame.meshes();

            device.push_error_scope(wgpu::ErrorFilter::Validation);
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
            match frame.mode {
                DisplayMode::Scene => self.scene.render(
                    device,
                    queue,
                    &mut encoder,
                    surface.color_view(),
                    surface.depth_view(),
                    &self.camera.bind_group,
                    &meshes,
                    frame.lights,
                    frame.ambient,
                    frame.background,
                ),
                DisplayMode::DeferredLights => {
                    let target = DeferredTarget {
                        view: surface.color_view(),
                        width,
                        height,
                        camera: &self.camera.bind_group,
                    };
                    self.deferred.render(
                        device,
                        queue,
                        &mut encoder,
                        &target,
                        &meshes,
                        frame.lights,
                        frame.ambient,
                        frame.background,
                    );
                }
            }
            queue.submit(std::iter::once(encoder.finish()));
            pop_validation_error(device)
        };

        if let Some(e) = failure {
            surface.set_error(e.clone());
            return Err(MeldError::CompileError(e));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu_mesh::MeshSlot;
    use crate::headless::HeadlessContext;
    use crate::primitives::unit_sphere;
    use meld_core::{MeshData, Vec3};

    const SIZE: u32 = 64;

    fn headless() -> Option<HeadlessContext> {
        match pollster::block_on(HeadlessContext::new(SIZE, SIZE)) {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                eprintln!("skipping GPU test: {}", e);
                None
            }
        }
    }

    /// A sphere centred in front of the default camera
    fn ball_of(radius: f32) -> MeshData {
        let mut mesh = unit_sphere(24, 16);
        let center = Camera::default().target;
        for v in &mut mesh.vertices {
            v.position = center + v.position * radius;
        }
        mesh
    }

    fn ball() -> MeshData {
        ball_of(0.1)
    }

    fn draw(
        ctx: &mut HeadlessContext,
        renderer: &mut Renderer,
        mode: DisplayMode,
        mesh: Option<&GpuMesh>,
        lights: &[Light],
    ) -> Vec<u8> {
        draw_with(ctx, renderer, mode, mesh, &[], lights)
    }

    fn draw_with(
        ctx: &mut HeadlessContext,
        renderer: &mut Renderer,
        mode: DisplayMode,
        mesh: Option<&GpuMesh>,
        decorations: &[GpuMesh],
        lights: &[Light],
    ) -> Vec<u8> {
        let config = RenderConfig {
            display_mode: mode,
            width: SIZE,
            height: SIZE,
            ..RenderConfig::default()
        };
        let camera = Camera::from_config(&config);
        let frame = Frame::new(&config, &camera, mesh, lights).with_decorations(decorations);
        renderer.render_frame(ctx, &frame).unwrap();
        ctx.read_pixels().unwrap()
    }

    #[test]
    fn zero_power_lights_leave_the_ambient_frame_unchanged() {
        let Some(mut ctx) = headless() else { return };
        let mut renderer = Renderer::new(&mut ctx).unwrap();
        let mut slot = MeshSlot::new();
        slot.replace(&ctx.device, Ok(ball())).unwrap();

        let center = Camera::default().target;
        let dark = Light::new(center + Vec3::new(0.0, 0.0, 0.12), Color::WHITE, 0.0, 0.1);

        let ambient_only = draw(&mut ctx, &mut renderer, DisplayMode::DeferredLights, slot.mesh(), &[]);
        let with_dark = draw(
            &mut ctx,
            &mut renderer,
            DisplayMode::DeferredLights,
            slot.mesh(),
            &[dark],
        );
        assert_eq!(ambient_only, with_dark);
    }

    #[test]
    fn mesh_covers_the_center_pixel() {
        let Some(mut ctx) = headless() else { return };
        let mut renderer = Renderer::new(&mut ctx).unwrap();
        let mut slot = MeshSlot::new();
        slot.replace(&ctx.device, Ok(ball())).unwrap();

        let empty = draw(&mut ctx, &mut renderer, DisplayMode::Scene, None, &[]);
        let drawn = draw(&mut ctx, &mut renderer, DisplayMode::Scene, slot.mesh(), &[]);
        let center = ((SIZE / 2 * SIZE + SIZE / 2) * 4) as usize;
        assert_ne!(empty[center..center + 4], drawn[center..center + 4]);
        // Away from the ball both frames are background
        assert_eq!(empty[0..4], drawn[0..4]);
    }

    #[test]
    fn decorations_are_drawn_beside_the_isosurface() {
        let Some(mut ctx) = headless() else { return };
        let mut renderer = Renderer::new(&mut ctx).unwrap();
        let mut slot = MeshSlot::new();
        slot.replace(&ctx.device, Ok(ball())).unwrap();
        let decoration = GpuMesh::upload(&ctx.device, "Decoration", &ball_of(0.2)).unwrap();
        let decorations = [decoration];

        for mode in [DisplayMode::Scene, DisplayMode::DeferredLights] {
            let empty = draw_with(&mut ctx, &mut renderer, mode, None, &[], &[]);
            let surface_only = draw_with(&mut ctx, &mut renderer, mode, slot.mesh(), &[], &[]);
            let decoration_only = draw_with(&mut ctx, &mut renderer, mode, None, &decorations, &[]);
            let both = draw_with(&mut ctx, &mut renderer, mode, slot.mesh(), &decorations, &[]);

            assert_ne!(empty, surface_only, "{:?}: isosurface missing", mode);
            assert_ne!(empty, decoration_only, "{:?}: decoration missing", mode);
            // The larger decoration widens the silhouette around the isosurface
            assert_ne!(surface_only, both, "{:?}: decoration hidden by isosurface", mode);
        }
    }

    #[test]
    fn failed_rebuild_keeps_the_previous_mesh() {
        let Some(ctx) = headless() else { return };
        let mut slot = MeshSlot::new();
        slot.replace(&ctx.device, Ok(ball())).unwrap();
        let failed = slot.replace(&ctx.device, Err(MeldError::BuildError("broken".into())));
        assert!(failed.is_err());
        assert_eq!(slot.generation(), 1);
        assert!(slot.mesh().is_some());

        slot.replace(&ctx.device, Ok(MeshData::new())).unwrap();
        assert!(slot.mesh().is_none());
    }

    #[test]
    fn surface_error_short_circuits_frames() {
        let Some(mut ctx) = headless() else { return };
        let mut renderer = Renderer::new(&mut ctx).unwrap();
        ctx.set_error("scene: missing resource 'camera'".to_string());

        let config = RenderConfig::default();
        let camera = Camera::from_config(&config);
        let frame = Frame::new(&config, &camera, None, &[]);
        assert!(matches!(
            renderer.render_frame(&mut ctx, &frame),
            Err(MeldError::CompileError(_))
        ));
    }
}
