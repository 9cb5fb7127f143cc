//! The drawable a frame is rendered into

use meld_core::Result;

/// A render target with its own device and an error slot.
///
/// Once an error is recorded the surface stays failed; renderers check
/// [`has_error`](Self::has_error) first and draw nothing.
pub trait RenderSurface {
    fn device(&self) -> &wgpu::Device;
    fn queue(&self) -> &wgpu::Queue;
    fn format(&self) -> wgpu::TextureFormat;
    fn color_view(&self) -> &wgpu::TextureView;
    fn depth_view(&self) -> &wgpu::TextureView;

    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Prepare the surface for drawing
    fn make_current(&mut self) -> Result<()>;

    fn error(&self) -> Option<&str>;
    fn set_error(&mut self, message: String);

    fn has_error(&self) -> bool {
        self.error().is_some()
    }

    /// Ask the host to draw another frame
    fn queue_render(&mut self);

    /// Whether a frame has been asked for since the last call
    fn take_render_request(&mut self) -> bool;

    fn aspect_ratio(&self) -> f32 {
        self.width() as f32 / self.height().max(1) as f32
    }
}
