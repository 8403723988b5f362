//! Backend-neutral renderer: resource descriptors, slots, frame state and the facade

mod buffer;
mod config;
pub mod descriptor_set;
mod device;
mod format;
mod frame_state;
mod pipeline;
mod render_pass;
mod render_target;
mod renderer;
pub mod ring_buffer;
mod texture;

#[cfg(test)]
pub(crate) mod mock_device;

pub use buffer::Buffer;
pub use config::{MemoryStats, RendererConfig, SwapchainDesc};
pub use descriptor_set::{DescriptorLayout, DescriptorSetLayout};
pub use device::{BoundDescriptor, Device, DeviceCaps};
pub use format::{DescriptorType, Format, Layout};
pub use frame_state::{ActivePass, BoundPipeline, FrameState};
pub use pipeline::{
    changed_attribs, set_bits, Pipeline, PipelineDesc, Shader, VertexAttribute, VertexBufferLayout, VertexFormat,
    MAX_DESCRIPTOR_SETS, MAX_VERTEX_ATTRIBS, MAX_VERTEX_BUFFERS,
};
pub use render_pass::{ClearFlags, Framebuffer, FramebufferDesc, RenderPass, RenderPassDesc};
pub use render_target::{RenderTarget, RenderTargetDesc};
pub use renderer::Renderer;
pub use ring_buffer::{RingAllocation, RingBuffer, RingCheckpoint, RingMark};
pub use texture::{mip_chain, FilterMode, SamplerDesc, Texture, TextureDesc, WrapMode};
