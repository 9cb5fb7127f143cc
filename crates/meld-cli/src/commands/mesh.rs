//! Isosurface extraction command

use super::{extract, load_config};
use anyhow::{Context, Result};
use meld_core::ComputeBackend;
use meld_import::save_obj;
use meld_render::request_device;
use meld_runtime::{EventQueue, Scene, SceneEvent};
use std::time::Instant;

pub struct MeshArgs {
    pub config: Option<String>,
    pub resolution: Option<u32>,
    pub threshold: Option<f32>,
    pub time: f64,
    pub gpu: bool,
    pub output: Option<String>,
    pub json: bool,
}

pub fn run(args: MeshArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if args.gpu {
        config.lattice.backend = ComputeBackend::Gpu;
    }
    let mut scene = Scene::new(config).context("Invalid scene config")?;
    let mut events = EventQueue::new();
    if let Some(n) = args.resolution {
        events.push(SceneEvent::ResolutionChanged([n, n, n]));
    }
    if let Some(t) = args.threshold {
        events.push(SceneEvent::ThresholdChanged(t));
    }
    scene
        .apply_all(&mut events)
        .context("Invalid --resolution or --threshold")?;
    scene.set_progress(args.time);

    let device = match scene.config.lattice.backend {
        ComputeBackend::Gpu => match pollster::block_on(request_device("Meld Compute Device")) {
            Ok(pair) => Some(pair),
            Err(e) => {
                log::warn!("compute device unavailable: {}", e);
                None
            }
        },
        ComputeBackend::Cpu => None,
    };

    let start = Instant::now();
    let mesh = extract(&scene, device.as_ref().map(|(d, q)| (d, q)))
        .context("Isosurface extraction failed")?;
    let elapsed = start.elapsed();
    let stats = mesh.stats();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        let [n, m, k] = scene.config.lattice.resolution;
        println!("Lattice:   {}x{}x{} cells", n, m, k);
        println!("Sources:   {}", scene.sources.len());
        println!("Vertices:  {}", stats.vertex_count);
        println!("Triangles: {}", stats.triangle_count);
        if !mesh.is_empty() {
            println!("Bounds:    {:?} .. {:?}", stats.bounds_min, stats.bounds_max);
        }
        println!("Time:      {:.2?}", elapsed);
    }

    if let Some(path) = &args.output {
        save_obj(&mesh, path).with_context(|| format!("Failed to write '{}'", path))?;
        if !args.json {
            println!("Wrote {}", path);
        }
    }
    Ok(())
}
