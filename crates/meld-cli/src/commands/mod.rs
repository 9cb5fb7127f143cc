//! CLI command implementations

pub mod init;
pub mod inspect;
pub mod mesh;
pub mod render;

use anyhow::{Context, Result};
use meld_core::{ComputeBackend, MeshData, SceneConfig};
use meld_render::GpuFieldSampler;
use meld_runtime::Scene;
use std::path::Path;

/// Load the scene config at `path`, or the defaults when no path is given
pub fn load_config(path: Option<&str>) -> Result<SceneConfig> {
    match path {
        Some(p) => SceneConfig::load(Path::new(p))
            .with_context(|| format!("Failed to load scene config '{}'", p)),
        None => Ok(SceneConfig::default()),
    }
}

/// Extract the isosurface with the configured backend.
///
/// When the GPU backend is asked for but no device is available, or the
/// device fails mid-dispatch, the result is an empty mesh and a warning.
pub fn extract(scene: &Scene, gpu: Option<(&wgpu::Device, &wgpu::Queue)>) -> meld_core::Result<MeshData> {
    match (scene.config.lattice.backend, gpu) {
        (ComputeBackend::Cpu, _) => scene.build_mesh(),
        (ComputeBackend::Gpu, None) => {
            log::warn!("no compute device, showing an empty surface");
            Ok(MeshData::new())
        }
        (ComputeBackend::Gpu, Some((device, queue))) => {
            let sampled = GpuFieldSampler::new(device).and_then(|sampler| {
                sampler.build_isosurface(
                    device,
                    queue,
                    &scene.sources,
                    &scene.lattice_params()?,
                    scene.config.render.surface_color,
                )
            });
            match sampled {
                Err(e) if e.is_recoverable() => {
                    log::warn!("{}; showing an empty surface", e);
                    Ok(MeshData::new())
                }
                other => other,
            }
        }
    }
}
