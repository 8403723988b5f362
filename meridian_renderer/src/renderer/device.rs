//! Backend capability interface
//!
//! A [`Device`] translates backend-neutral descriptors into native objects
//! and records native commands. It performs no ordering or handle checks:
//! the [`Renderer`](super::Renderer) facade validates every call before it
//! reaches the device, so both backends see the same legal call stream.

use super::buffer::Buffer;
use super::config::SwapchainDesc;
use super::descriptor_set::{DescriptorLayout, DescriptorSetLayout};
use super::format::{Format, Layout};
use super::pipeline::{Pipeline, PipelineDesc, Shader};
use super::render_pass::{Framebuffer, FramebufferDesc, RenderPass, RenderPassDesc};
use super::render_target::{RenderTarget, RenderTargetDesc};
use super::texture::{SamplerDesc, TextureDesc};
use crate::error::Result;
use crate::shader::{ShaderMacros, ShaderStage};

/// Native limits the facade needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCaps {
    pub uniform_buffer_alignment: u32,
    pub storage_buffer_alignment: u32,
    /// Frames in flight; `begin_frame` returns a slot below this
    pub num_frames: u32,
}

impl DeviceCaps {
    /// Alignment of ring-buffer allocations
    pub fn ring_alignment(&self) -> u32 {
        self.uniform_buffer_alignment.max(self.storage_buffer_alignment).max(1)
    }
}

/// One descriptor resolved from a descriptor-set data block
pub enum BoundDescriptor<'a, D: Device + ?Sized> {
    UniformBuffer { binding: u32, buffer: &'a D::Buffer, offset: u32, size: u32 },
    StorageBuffer { binding: u32, buffer: &'a D::Buffer, offset: u32, size: u32 },
    Sampler { binding: u32, sampler: &'a D::Sampler },
    Texture { binding: u32, texture: &'a D::Texture },
    /// Texture at `binding`, its sampler at `sampler_binding`
    CombinedSampler { binding: u32, sampler_binding: u32, texture: &'a D::Texture, sampler: &'a D::Sampler },
}

impl<'a, D: Device + ?Sized> BoundDescriptor<'a, D> {
    pub fn binding(&self) -> u32 {
        match self {
            BoundDescriptor::UniformBuffer { binding, .. }
            | BoundDescriptor::StorageBuffer { binding, .. }
            | BoundDescriptor::Sampler { binding, .. }
            | BoundDescriptor::Texture { binding, .. }
            | BoundDescriptor::CombinedSampler { binding, .. } => *binding,
        }
    }
}

pub trait Device {
    type Buffer;
    type Texture;
    type Sampler;
    type RenderTarget;
    type RenderPass;
    type Framebuffer;
    type Pipeline;
    type Shader;
    type DescriptorSetLayout;

    fn capabilities(&self) -> DeviceCaps;

    // ===== RESOURCES =====

    /// Permanent GPU copy of `data`
    fn create_buffer(&mut self, data: &[u8]) -> Result<Self::Buffer>;
    fn delete_buffer(&mut self, buffer: Self::Buffer);

    /// Replace the ring buffer with one of `size` bytes
    ///
    /// The previous ring buffer must stay alive until every frame that may
    /// still read it has completed.
    fn recreate_ring_buffer(&mut self, size: u32) -> Result<()>;
    /// Native handle aliasing the current ring buffer
    fn ring_buffer(&self) -> Self::Buffer;
    fn write_ring_buffer(&mut self, offset: u32, data: &[u8]);

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<Self::Texture>;
    fn delete_texture(&mut self, texture: Self::Texture);

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<Self::Sampler>;
    fn delete_sampler(&mut self, sampler: Self::Sampler);

    /// Render target plus the texture that backs it
    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<(Self::RenderTarget, Self::Texture)>;
    fn delete_render_target(&mut self, render_target: Self::RenderTarget, texture: Self::Texture);

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<Self::RenderPass>;
    fn delete_render_pass(&mut self, pass: Self::RenderPass);

    fn create_framebuffer(
        &mut self,
        desc: &FramebufferDesc,
        pass: &RenderPass<Self::RenderPass>,
        color: &RenderTarget<Self::RenderTarget>,
        depth_stencil: Option<&RenderTarget<Self::RenderTarget>>,
    ) -> Result<Self::Framebuffer>;
    fn delete_framebuffer(&mut self, framebuffer: Self::Framebuffer);

    fn create_descriptor_set_layout(&mut self, entries: &[DescriptorLayout]) -> Result<Self::DescriptorSetLayout>;
    fn delete_descriptor_set_layout(&mut self, layout: Self::DescriptorSetLayout);

    /// Native shader object from compiled SPIR-V
    fn create_shader(&mut self, name: &str, stage: ShaderStage, macros: &ShaderMacros, spirv: &[u32])
        -> Result<Self::Shader>;
    fn delete_shader(&mut self, shader: Self::Shader);

    /// `layouts[i]` is the layout bound at set `i`, if any
    fn create_pipeline(
        &mut self,
        desc: &PipelineDesc,
        vertex: &Shader<Self::Shader>,
        fragment: &Shader<Self::Shader>,
        pass: &RenderPass<Self::RenderPass>,
        layouts: &[Option<&DescriptorSetLayout<Self::DescriptorSetLayout>>],
    ) -> Result<Self::Pipeline>;
    fn delete_pipeline(&mut self, pipeline: Self::Pipeline);

    // ===== FRAME =====

    /// Wait until the next frame slot is free and start recording into it
    fn begin_frame(&mut self) -> Result<usize>;

    /// `color_layout` is the layout the color target is in before the pass
    fn begin_render_pass(
        &mut self,
        pass: &RenderPass<Self::RenderPass>,
        framebuffer: &Framebuffer<Self::Framebuffer>,
        color_layout: Layout,
    );
    fn end_render_pass(&mut self);

    fn bind_pipeline(&mut self, pipeline: &Pipeline<Self::Pipeline>);
    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32);
    /// Scissor rect with a top-left origin
    fn set_scissor_rect(&mut self, x: u32, y: u32, width: u32, height: u32);

    fn bind_index_buffer(&mut self, buffer: &Buffer<Self::Buffer>, bit16: bool);
    fn bind_vertex_buffer(&mut self, binding: u32, buffer: &Buffer<Self::Buffer>);
    /// Bind `descriptors` as set `index`; fails when the native set cannot be allocated
    fn bind_descriptor_set(
        &mut self,
        index: u32,
        layout: &DescriptorSetLayout<Self::DescriptorSetLayout>,
        descriptors: &[BoundDescriptor<'_, Self>],
    ) -> Result<()>;

    fn draw(&mut self, first_vertex: u32, vertex_count: u32);
    fn draw_indexed_instanced(&mut self, vertex_count: u32, instance_count: u32);
    fn draw_indexed_offset(&mut self, vertex_count: u32, first_index: u32);

    fn layout_transition(&mut self, render_target: &RenderTarget<Self::RenderTarget>, from: Layout, to: Layout);
    /// Copy `src` into `dst` (same size, TransferSrc / TransferDst)
    fn blit(&mut self, src: &RenderTarget<Self::RenderTarget>, dst: &RenderTarget<Self::RenderTarget>);

    /// Copy `render_target` to the swapchain and present
    fn present(&mut self, render_target: &mut RenderTarget<Self::RenderTarget>) -> Result<()>;

    // ===== SURFACE =====

    /// Apply a new swapchain description; only changed settings are touched
    fn set_swapchain_desc(&mut self, old: &SwapchainDesc, new: &SwapchainDesc) -> Result<()>;
    fn drawable_size(&self) -> (u32, u32);
    fn current_refresh_rate(&self) -> u32;
    fn max_refresh_rate(&self) -> u32;
    fn is_render_target_format_supported(&self, format: Format) -> bool;

    /// Block until the GPU is idle
    fn wait_idle(&mut self);
}
