//! Windowing collaborator of the GL backend
//!
//! The GL device never creates its own context: the application owns the
//! window and the current context and hands both over as a `glow::Context`
//! plus a [`GlSurface`].

use meridian_renderer::meridian::Result;

pub trait GlSurface {
    /// Present the default framebuffer
    fn swap_buffers(&mut self) -> Result<()>;

    /// Size of the default framebuffer in pixels
    fn drawable_size(&self) -> (u32, u32);

    fn set_vsync(&mut self, vsync: bool) -> Result<()>;

    /// Switch to or from fullscreen at `width` x `height`
    fn set_fullscreen(&mut self, fullscreen: bool, width: u32, height: u32) -> Result<()>;

    /// Resize a windowed surface
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// Refresh rate of the current display mode in Hz
    fn current_refresh_rate(&self) -> u32;

    /// Highest refresh rate any display mode offers
    fn max_refresh_rate(&self) -> u32;
}
