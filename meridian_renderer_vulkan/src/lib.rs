/*!
# Meridian Renderer - Vulkan Backend

Explicit backend of the Meridian graphics layer.

[`VulkanDevice`] implements the `Device` interface of `meridian_renderer`
with Ash for the Vulkan bindings and gpu-allocator for memory. The
[`Renderer`](meridian_renderer::meridian::Renderer) facade drives it; client
code never calls the device directly.

```no_run
use meridian_renderer::meridian::{Renderer, RendererConfig};
use meridian_renderer_vulkan::VulkanDevice;
use std::sync::Arc;
# fn run(window: Arc<winit::window::Window>) -> meridian_renderer::meridian::Result<()> {
let config = RendererConfig::default();
let device = VulkanDevice::new(window, &config)?;
let _renderer = Renderer::new(device, config)?;
# Ok(())
# }
```

Validation layers are enabled when `RendererConfig::debug` is set or the
crate is built with the `vulkan-validation` feature.
*/

mod vulkan_context;
mod vulkan_debug;
mod vulkan_descriptors;
mod vulkan_device;
mod vulkan_format;
mod vulkan_pipeline;
mod vulkan_resources;
mod vulkan_swapchain;

pub use vulkan_debug::{print_validation_stats_report, reset_validation_stats, validation_stats, ValidationStats};
pub use vulkan_device::VulkanDevice;
pub use vulkan_format::vk_format;
pub use vulkan_resources::{VulkanBuffer, VulkanFramebuffer, VulkanPipeline, VulkanRenderTarget, VulkanTexture};

// Re-export the binding crate so clients can name native handles
pub use ash;
