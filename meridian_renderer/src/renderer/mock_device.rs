//! Recording device for unit tests (no GPU required)
//!
//! Every native object is a numeric id. Each call is appended to a shared
//! log as a short string, so tests can assert on the exact native call
//! stream even after the owning `Renderer` has been dropped.

use super::buffer::Buffer;
use super::config::SwapchainDesc;
use super::descriptor_set::{DescriptorLayout, DescriptorSetLayout};
use super::device::{BoundDescriptor, Device, DeviceCaps};
use super::format::{Format, Layout};
use super::pipeline::{Pipeline, PipelineDesc, Shader};
use super::render_pass::{Framebuffer, FramebufferDesc, RenderPass, RenderPassDesc};
use super::render_target::{RenderTarget, RenderTargetDesc};
use super::texture::{SamplerDesc, TextureDesc};
use crate::error::{Error, Result};
use crate::shader::{ShaderMacros, ShaderStage};
use std::cell::RefCell;
use std::rc::Rc;

pub type CallLog = Rc<RefCell<Vec<String>>>;

pub struct MockDevice {
    pub log: CallLog,
    pub caps: DeviceCaps,
    /// Contents of the current ring buffer
    pub ring_data: Vec<u8>,
    pub drawable: (u32, u32),
    /// Make the next ring-buffer reallocations fail
    pub fail_ring_recreate: bool,
    /// Make descriptor-set binds fail
    pub fail_descriptor_sets: bool,
    next_id: u32,
    ring_id: u32,
    frame_index: usize,
}

impl MockDevice {
    pub fn new(num_frames: u32) -> (Self, CallLog) {
        let log = CallLog::default();
        let device = Self {
            log: log.clone(),
            caps: DeviceCaps { uniform_buffer_alignment: 256, storage_buffer_alignment: 16, num_frames },
            ring_data: Vec::new(),
            drawable: (1280, 720),
            fail_ring_recreate: false,
            fail_descriptor_sets: false,
            next_id: 1,
            ring_id: 0,
            frame_index: 0,
        };
        (device, log)
    }

    fn id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn record(&self, call: String) {
        self.log.borrow_mut().push(call);
    }

    fn create(&mut self, kind: &str) -> u32 {
        let id = self.id();
        self.record(format!("create_{} {}", kind, id));
        id
    }
}

impl Device for MockDevice {
    type Buffer = u32;
    type Texture = u32;
    type Sampler = u32;
    type RenderTarget = u32;
    type RenderPass = u32;
    type Framebuffer = u32;
    type Pipeline = u32;
    type Shader = u32;
    type DescriptorSetLayout = u32;

    fn capabilities(&self) -> DeviceCaps {
        self.caps
    }

    fn create_buffer(&mut self, _data: &[u8]) -> Result<u32> {
        Ok(self.create("buffer"))
    }

    fn delete_buffer(&mut self, buffer: u32) {
        self.record(format!("delete_buffer {}", buffer));
    }

    fn recreate_ring_buffer(&mut self, size: u32) -> Result<()> {
        if self.fail_ring_recreate {
            return Err(Error::OutOfMemory);
        }
        self.ring_id = self.id();
        self.ring_data = vec![0; size as usize];
        self.record(format!("recreate_ring_buffer {} {}", self.ring_id, size));
        Ok(())
    }

    fn ring_buffer(&self) -> u32 {
        self.ring_id
    }

    fn write_ring_buffer(&mut self, offset: u32, data: &[u8]) {
        let start = offset as usize;
        self.ring_data[start..start + data.len()].copy_from_slice(data);
    }

    fn create_texture(&mut self, _desc: &TextureDesc) -> Result<u32> {
        Ok(self.create("texture"))
    }

    fn delete_texture(&mut self, texture: u32) {
        self.record(format!("delete_texture {}", texture));
    }

    fn create_sampler(&mut self, _desc: &SamplerDesc) -> Result<u32> {
        Ok(self.create("sampler"))
    }

    fn delete_sampler(&mut self, sampler: u32) {
        self.record(format!("delete_sampler {}", sampler));
    }

    fn create_render_target(&mut self, _desc: &RenderTargetDesc) -> Result<(u32, u32)> {
        let render_target = self.create("render_target");
        let texture = self.id();
        Ok((render_target, texture))
    }

    fn delete_render_target(&mut self, render_target: u32, texture: u32) {
        self.record(format!("delete_render_target {} {}", render_target, texture));
    }

    fn create_render_pass(&mut self, _desc: &RenderPassDesc) -> Result<u32> {
        Ok(self.create("render_pass"))
    }

    fn delete_render_pass(&mut self, pass: u32) {
        self.record(format!("delete_render_pass {}", pass));
    }

    fn create_framebuffer(
        &mut self,
        _desc: &FramebufferDesc,
        _pass: &RenderPass<u32>,
        _color: &RenderTarget<u32>,
        _depth_stencil: Option<&RenderTarget<u32>>,
    ) -> Result<u32> {
        Ok(self.create("framebuffer"))
    }

    fn delete_framebuffer(&mut self, framebuffer: u32) {
        self.record(format!("delete_framebuffer {}", framebuffer));
    }

    fn create_descriptor_set_layout(&mut self, _entries: &[DescriptorLayout]) -> Result<u32> {
        Ok(self.create("descriptor_set_layout"))
    }

    fn delete_descriptor_set_layout(&mut self, layout: u32) {
        self.record(format!("delete_descriptor_set_layout {}", layout));
    }

    fn create_shader(&mut self, _name: &str, _stage: ShaderStage, _macros: &ShaderMacros, _spirv: &[u32]) -> Result<u32> {
        Ok(self.create("shader"))
    }

    fn delete_shader(&mut self, shader: u32) {
        self.record(format!("delete_shader {}", shader));
    }

    fn create_pipeline(
        &mut self,
        _desc: &PipelineDesc,
        _vertex: &Shader<u32>,
        _fragment: &Shader<u32>,
        _pass: &RenderPass<u32>,
        _layouts: &[Option<&DescriptorSetLayout<u32>>],
    ) -> Result<u32> {
        Ok(self.create("pipeline"))
    }

    fn delete_pipeline(&mut self, pipeline: u32) {
        self.record(format!("delete_pipeline {}", pipeline));
    }

    fn begin_frame(&mut self) -> Result<usize> {
        let slot = self.frame_index % self.caps.num_frames as usize;
        self.frame_index += 1;
        self.record(format!("begin_frame {}", slot));
        Ok(slot)
    }

    fn begin_render_pass(&mut self, pass: &RenderPass<u32>, framebuffer: &Framebuffer<u32>, _color_layout: Layout) {
        self.record(format!("begin_render_pass {} {}", pass.native, framebuffer.native));
    }

    fn end_render_pass(&mut self) {
        self.record("end_render_pass".to_string());
    }

    fn bind_pipeline(&mut self, pipeline: &Pipeline<u32>) {
        self.record(format!("bind_pipeline {}", pipeline.native));
    }

    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.record(format!("set_viewport {} {} {} {}", x, y, width, height));
    }

    fn set_scissor_rect(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.record(format!("set_scissor_rect {} {} {} {}", x, y, width, height));
    }

    fn bind_index_buffer(&mut self, buffer: &Buffer<u32>, bit16: bool) {
        self.record(format!("bind_index_buffer {}+{} {}", buffer.native, buffer.begin_offset, bit16));
    }

    fn bind_vertex_buffer(&mut self, binding: u32, buffer: &Buffer<u32>) {
        self.record(format!("bind_vertex_buffer {} {}+{}", binding, buffer.native, buffer.begin_offset));
    }

    fn bind_descriptor_set(
        &mut self,
        index: u32,
        layout: &DescriptorSetLayout<u32>,
        descriptors: &[BoundDescriptor<'_, Self>],
    ) -> Result<()> {
        if self.fail_descriptor_sets {
            return Err(Error::BackendError("descriptor pool exhausted".to_string()));
        }
        let parts: Vec<String> = descriptors
            .iter()
            .map(|d| match d {
                BoundDescriptor::UniformBuffer { binding, buffer, offset, size } => {
                    format!("ubo{}={}+{}/{}", binding, buffer, offset, size)
                }
                BoundDescriptor::StorageBuffer { binding, buffer, offset, size } => {
                    format!("ssbo{}={}+{}/{}", binding, buffer, offset, size)
                }
                BoundDescriptor::Sampler { binding, sampler } => format!("smp{}={}", binding, sampler),
                BoundDescriptor::Texture { binding, texture } => format!("tex{}={}", binding, texture),
                BoundDescriptor::CombinedSampler { binding, sampler_binding, texture, sampler } => {
                    format!("cs{}+{}={}/{}", binding, sampler_binding, texture, sampler)
                }
            })
            .collect();
        self.record(format!("bind_descriptor_set {} {} [{}]", index, layout.native, parts.join(" ")));
        Ok(())
    }

    fn draw(&mut self, first_vertex: u32, vertex_count: u32) {
        self.record(format!("draw {} {}", first_vertex, vertex_count));
    }

    fn draw_indexed_instanced(&mut self, vertex_count: u32, instance_count: u32) {
        self.record(format!("draw_indexed_instanced {} {}", vertex_count, instance_count));
    }

    fn draw_indexed_offset(&mut self, vertex_count: u32, first_index: u32) {
        self.record(format!("draw_indexed_offset {} {}", vertex_count, first_index));
    }

    fn layout_transition(&mut self, render_target: &RenderTarget<u32>, from: Layout, to: Layout) {
        self.record(format!("layout_transition {} {} {}", render_target.native, from, to));
    }

    fn blit(&mut self, src: &RenderTarget<u32>, dst: &RenderTarget<u32>) {
        self.record(format!("blit {} {}", src.native, dst.native));
    }

    fn present(&mut self, render_target: &mut RenderTarget<u32>) -> Result<()> {
        self.record(format!("present {}", render_target.native));
        Ok(())
    }

    fn set_swapchain_desc(&mut self, _old: &SwapchainDesc, new: &SwapchainDesc) -> Result<()> {
        self.drawable = (new.width, new.height);
        self.record(format!("set_swapchain_desc {}x{} vsync={}", new.width, new.height, new.vsync));
        Ok(())
    }

    fn drawable_size(&self) -> (u32, u32) {
        self.drawable
    }

    fn current_refresh_rate(&self) -> u32 {
        60
    }

    fn max_refresh_rate(&self) -> u32 {
        144
    }

    fn is_render_target_format_supported(&self, format: Format) -> bool {
        format != Format::RGB8
    }

    fn wait_idle(&mut self) {
        self.record("wait_idle".to_string());
    }
}
