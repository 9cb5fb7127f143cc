//! Offscreen surface for render-to-image

use crate::context::{create_target, request_device, RenderError};
use crate::surface::RenderSurface;
use meld_core::{MeldError, Result};
use std::path::Path;

/// Offscreen wgpu surface that renders to a texture instead of a window
pub struct HeadlessContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
    pub color_texture: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub depth_texture: wgpu::Texture,
    pub depth_view: wgpu::TextureView,
    error: Option<String>,
    render_queued: bool,
}

impl HeadlessContext {
    pub async fn new(width: u32, height: u32) -> std::result::Result<Self, RenderError> {
        let (device, queue) = request_device("Meld Headless Device").await?;
        let format = wgpu::TextureFormat::Rgba8UnormSrgb;

        let (color_texture, color_view) = create_target(
            &device,
            "Headless Color Texture",
            width,
            height,
            format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        );
        let (depth_texture, depth_view) = create_target(
            &device,
            "Headless Depth Texture",
            width,
            height,
            wgpu::TextureFormat::Depth32Float,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );

        Ok(Self {
            device,
            queue,
            format,
            width,
            height,
            color_texture,
            color_view,
            depth_texture,
            depth_view,
            error: None,
            render_queued: true,
        })
    }

    /// Read rendered pixels back from the color texture as tightly-packed RGBA bytes
    pub fn read_pixels(&self) -> std::result::Result<Vec<u8>, RenderError> {
        let bytes_per_pixel = 4u32;
        let unpadded_bytes_per_row = self.width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Pixel Readback Buffer"),
            size: (padded_bytes_per_row * self.height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.color_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|e| RenderError::BufferReadFailed(e.to_string()))?
            .map_err(|e| RenderError::BufferReadFailed(e.to_string()))?;

        let data = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((self.width * self.height * bytes_per_pixel) as usize);
        for row in 0..self.height {
            let start = (row * padded_bytes_per_row) as usize;
            pixels.extend_from_slice(&data[start..start + unpadded_bytes_per_row as usize]);
        }
        drop(data);
        staging.unmap();

        Ok(pixels)
    }

    /// Read the frame back and write it as a PNG
    pub fn save_png(&self, path: &Path) -> std::result::Result<(), RenderError> {
        let pixels = self.read_pixels()?;
        let image = image::RgbaImage::from_raw(self.width, self.height, pixels).ok_or_else(|| {
            RenderError::ImageSave("pixel buffer does not match frame size".to_string())
        })?;
        image
            .save(path)
            .map_err(|e| RenderError::ImageSave(e.to_string()))
    }
}

impl RenderSurface for HeadlessContext {
    fn device(&self) -> &wgpu::Device {
        &self.device
    }

    fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    fn color_view(&self) -> &wgpu::TextureView {
        &self.color_view
    }

    fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn make_current(&mut self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MeldError::ResourceError(format!(
                "surface has no area ({}x{})",
                self.width, self.height
            )));
        }
        Ok(())
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn set_error(&mut self, message: String) {
        if self.error.is_none() {
            log::error!("surface failed: {}", message);
            self.error = Some(message);
        }
    }

    fn queue_render(&mut self) {
        self.render_queued = true;
    }

    fn take_render_request(&mut self) -> bool {
        std::mem::take(&mut self.render_queued)
    }
}
