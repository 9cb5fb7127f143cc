//! wgpu device setup shared by the headless surface and the compute sampler

use meld_core::MeldError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to get adapter")]
    AdapterNotFound,
    #[error("Failed to create device: {0}")]
    DeviceCreation(String),
    #[error("Failed to read render buffer: {0}")]
    BufferReadFailed(String),
    #[error("Failed to save image: {0}")]
    ImageSave(String),
}

impl From<RenderError> for MeldError {
    fn from(e: RenderError) -> Self {
        MeldError::ResourceError(e.to_string())
    }
}

/// Request a device and queue from the first adapter wgpu offers
pub async fn request_device(label: &str) -> Result<(wgpu::Device, wgpu::Queue), RenderError> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .ok_or(RenderError::AdapterNotFound)?;

    let info = adapter.get_info();
    log::info!("using adapter {} ({:?})", info.name, info.backend);

    adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some(label),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        )
        .await
        .map_err(|e| RenderError::DeviceCreation(e.to_string()))
}

/// Create a 2D texture sized to the frame, returning it with its default view
pub fn create_target(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

/// Block on the device until every validation error raised since the
/// matching `push_error_scope` is known
pub fn pop_validation_error(device: &wgpu::Device) -> Option<String> {
    pollster::block_on(device.pop_error_scope()).map(|e| e.to_string())
}

/// Create a pipeline object, turning validation failures into `CompileError`
pub fn validated<T>(device: &wgpu::Device, label: &str, create: impl FnOnce() -> T) -> meld_core::Result<T> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let object = create();
    match pop_validation_error(device) {
        Some(e) => Err(MeldError::CompileError(format!("{}: {}", label, e))),
        None => Ok(object),
    }
}
