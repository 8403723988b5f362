//! Renderer configuration and statistics

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Presentation surface settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainDesc {
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub vsync: bool,
    /// Frames the CPU may record ahead of the GPU
    pub num_frames: u32,
}

impl Default for SwapchainDesc {
    fn default() -> Self {
        Self { width: 1280, height: 720, fullscreen: false, vsync: true, num_frames: 3 }
    }
}

/// Settings recognized at device creation
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub swapchain: SwapchainDesc,
    /// Enables validation layers / debug output and object labels
    pub debug: bool,
    /// Initial ring buffer capacity in bytes
    pub ephemeral_ring_buf_size: u32,
    /// Always recompile shaders, never read or write the disk cache
    pub skip_shader_cache: bool,
    /// Run the bytecode optimizer on compiled shaders
    pub optimize_shaders: bool,
    /// Write transpiled shader source next to the shader sources
    pub save_preprocessed_shaders: bool,
    pub shader_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            swapchain: SwapchainDesc::default(),
            debug: false,
            ephemeral_ring_buf_size: 1024 * 1024,
            skip_shader_cache: false,
            optimize_shaders: true,
            save_preprocessed_shaders: false,
            shader_dir: PathBuf::from("shaders"),
            cache_dir: PathBuf::from("shader_cache"),
        }
    }
}

impl RendererConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ephemeral_ring_buf_size == 0 {
            return Err(Error::InitializationFailed("ephemeral ring buffer size is zero".to_string()));
        }
        if self.swapchain.num_frames == 0 {
            return Err(Error::InitializationFailed("swapchain needs at least one frame".to_string()));
        }
        if self.swapchain.width == 0 || self.swapchain.height == 0 {
            return Err(Error::InitializationFailed(format!(
                "invalid swapchain size {}x{}",
                self.swapchain.width, self.swapchain.height
            )));
        }
        Ok(())
    }
}

/// Snapshot of renderer memory usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryStats {
    pub ring_buffer_size: u32,
    /// Ring bytes written since the GPU was last known to be done with them
    pub ring_buffer_in_flight: u64,
    pub buffers: usize,
    pub ephemeral_buffers: usize,
    pub textures: usize,
    pub render_targets: usize,
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
