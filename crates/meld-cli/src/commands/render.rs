//! Headless render-to-PNG command

use super::{extract, load_config};
use anyhow::{Context, Result};
use meld_core::{ComputeBackend, DisplayMode, MeshData};
use meld_import::load_obj;
use meld_render::{Camera, Frame, GpuMesh, HeadlessContext, MeshSlot, RenderSurface, Renderer};
use meld_runtime::{BackgroundRebuild, EventQueue, Scene, SceneEvent};
use std::path::{Path, PathBuf};

pub struct RenderArgs {
    pub config: Option<String>,
    pub output: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub mode: Option<String>,
    pub lights: Option<u32>,
    pub time: f64,
    pub frames: u32,
    pub fps: f64,
    pub gpu: bool,
    pub obj: Option<String>,
    pub distance: Option<f32>,
    pub yaw: Option<f32>,
    pub pitch: Option<f32>,
}

/// `out.png` becomes `out_0007.png` for frame 7 of a sequence
fn frame_path(output: &str, index: u32, total: u32) -> PathBuf {
    let path = Path::new(output);
    if total <= 1 {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".to_string());
    path.with_file_name(format!("{}_{:04}.{}", stem, index, ext))
}

pub fn run(args: RenderArgs) -> Result<()> {
    if args.frames == 0 {
        anyhow::bail!("--frames must be at least 1");
    }
    if !(args.fps.is_finite() && args.fps > 0.0) {
        anyhow::bail!("--fps must be positive");
    }

    let mut config = load_config(args.config.as_deref())?;
    if let Some(w) = args.width {
        config.render.width = w;
    }
    if let Some(h) = args.height {
        config.render.height = h;
    }
    if args.gpu {
        config.lattice.backend = ComputeBackend::Gpu;
    }
    let mut scene = Scene::new(config).context("Invalid scene config")?;
    let mut events = EventQueue::new();
    if let Some(mode) = &args.mode {
        let mode = DisplayMode::parse(mode).context("Invalid --mode")?;
        events.push(SceneEvent::DisplayModeChanged(mode));
    }
    if let Some(n) = args.lights {
        events.push(SceneEvent::LightCountChanged(n));
    }
    if args.frames > 1 {
        events.push(SceneEvent::AnimationToggled(true));
    }
    scene
        .apply_all(&mut events)
        .context("Invalid render options")?;
    scene.set_progress(args.time);

    let render_config = scene.config.render.clone();
    let mut ctx = pollster::block_on(HeadlessContext::new(render_config.width, render_config.height))
        .context("Failed to create headless render context")?;
    let mut renderer = Renderer::new(&mut ctx).context("Failed to build shader programs")?;

    let mut camera = Camera::from_config(&render_config);
    camera.aspect = ctx.aspect_ratio();
    if let Some(d) = args.distance {
        camera.distance = d;
    }
    if let Some(y) = args.yaw {
        camera.yaw = y.to_radians();
    }
    if let Some(p) = args.pitch {
        camera.pitch = p.to_radians();
    }
    camera.update_orbit();

    let mut decorations = Vec::new();
    if let Some(path) = &args.obj {
        let import = load_obj(path, render_config.surface_color)
            .with_context(|| format!("Failed to load '{}'", path))?;
        println!(
            "Loaded {}: {} triangles",
            path,
            import.mesh.triangle_count()
        );
        decorations.extend(GpuMesh::upload(&ctx.device, "Decoration", &import.mesh));
    }

    let mut slot = MeshSlot::new();
    let rebuild = BackgroundRebuild::new();
    let frame_us = 1_000_000.0 / args.fps;

    for i in 0..args.frames {
        // The first tick only anchors the clock at the starting progress
        scene.tick((i as f64 * frame_us) as i64);

        if scene.take_rebuild_request() {
            if let Some(result) = build(&scene, &ctx, &rebuild).transpose() {
                // A failed rebuild keeps the previous mesh on screen
                if slot.replace(&ctx.device, result).is_ok() {
                    ctx.queue_render();
                }
            }
        }

        // Without a queued render the surface still holds the last frame
        if frame_due(&mut scene, &mut ctx) {
            let frame = Frame::new(&scene.config.render, &camera, slot.mesh(), &scene.lights)
                .with_decorations(&decorations);
            renderer
                .render_frame(&mut ctx, &frame)
                .context("Render failed")?;
        }

        let path = frame_path(&args.output, i, args.frames);
        ctx.save_png(&path)
            .with_context(|| format!("Failed to save '{}'", path.display()))?;
        println!("Rendered {}", path.display());
    }
    Ok(())
}

/// Hand a pending scene redraw to the surface, then consume the surface's
/// render request. Returns whether a frame should be drawn now.
fn frame_due<S: RenderSurface>(scene: &mut Scene, surface: &mut S) -> bool {
    if scene.take_redraw_request() {
        surface.queue_render();
    }
    surface.take_render_request()
}

/// Rebuild the isosurface for the current frame. CPU builds go through the
/// background worker; GPU builds run on the render device.
fn build(
    scene: &Scene,
    ctx: &HeadlessContext,
    rebuild: &BackgroundRebuild,
) -> meld_core::Result<Option<MeshData>> {
    match scene.config.lattice.backend {
        ComputeBackend::Gpu => extract(scene, Some((&ctx.device, &ctx.queue))).map(Some),
        ComputeBackend::Cpu => {
            let params = scene.lattice_params()?;
            if !rebuild.request(
                scene.sources.clone(),
                params,
                scene.config.render.surface_color,
            ) {
                return Ok(None);
            }
            rebuild.wait().transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_change_queues_a_render() {
        let mut ctx = match pollster::block_on(HeadlessContext::new(8, 8)) {
            Ok(ctx) => ctx,
            Err(e) => {
                eprintln!("skipping GPU test: {}", e);
                return;
            }
        };
        let mut scene = Scene::new(meld_core::SceneConfig::default()).unwrap();
        assert!(frame_due(&mut scene, &mut ctx), "first frame is always drawn");
        assert!(!frame_due(&mut scene, &mut ctx), "nothing changed");

        scene
            .apply(SceneEvent::DisplayModeChanged(DisplayMode::DeferredLights))
            .unwrap();
        assert!(frame_due(&mut scene, &mut ctx));
        assert!(!frame_due(&mut scene, &mut ctx));

        let mut events = EventQueue::new();
        events.push(SceneEvent::LightCountChanged(1));
        scene.apply_all(&mut events).unwrap();
        assert!(frame_due(&mut scene, &mut ctx));
    }

    #[test]
    fn single_frame_keeps_output_path() {
        assert_eq!(frame_path("out.png", 0, 1), PathBuf::from("out.png"));
    }

    #[test]
    fn sequences_number_each_frame() {
        assert_eq!(frame_path("shots/out.png", 7, 30), PathBuf::from("shots/out_0007.png"));
        assert_eq!(frame_path("out", 2, 3), PathBuf::from("out_0002.png"));
    }
}
