//! The `Renderer` facade
//!
//! Owns every resource table, the ring-buffer bookkeeping, the shader
//! library and the frame state machine, and forwards validated calls to a
//! backend [`Device`]. Client code talks only to this type, so the same call
//! sequence drives either backend.
//!
//! ```ignore
//! renderer.begin_frame()?;
//! renderer.begin_render_pass(pass, framebuffer);
//! renderer.bind_pipeline(pipeline);
//! renderer.bind_vertex_buffer(0, vertices);
//! renderer.draw(0, 3);
//! renderer.end_render_pass();
//! renderer.present_frame(target)?;
//! ```

use super::buffer::Buffer;
use super::config::{MemoryStats, RendererConfig, SwapchainDesc};
use super::descriptor_set::{collect_layout, read_field, DescriptorLayout, DescriptorSetLayout};
use super::device::{BoundDescriptor, Device};
use super::format::{DescriptorType, Format, Layout};
use super::frame_state::{BoundPipeline, FrameState};
use super::pipeline::{Pipeline, PipelineDesc, Shader, MAX_DESCRIPTOR_SETS, MAX_VERTEX_BUFFERS};
use super::render_pass::{Framebuffer, FramebufferDesc, RenderPass, RenderPassDesc};
use super::render_target::{RenderTarget, RenderTargetDesc};
use super::ring_buffer::{RingBuffer, RingMark};
use super::texture::{SamplerDesc, Texture, TextureDesc};
use crate::error::Result;
use crate::handle::*;
use crate::resource_table::ResourceTable;
use crate::shader::{
    check_shader_resources, reflect_resources, NagaCompiler, ShaderLibrary, ShaderLibraryDesc, ShaderMacros,
    ShaderStage,
};

const SOURCE: &str = "meridian::renderer";

pub struct Renderer<D: Device> {
    device: D,
    config: RendererConfig,
    swapchain: SwapchainDesc,
    shaders: ShaderLibrary<NagaCompiler>,

    buffers: ResourceTable<BufferHandle, Buffer<D::Buffer>>,
    textures: ResourceTable<TextureHandle, Texture<D::Texture>>,
    samplers: ResourceTable<SamplerHandle, D::Sampler>,
    render_targets: ResourceTable<RenderTargetHandle, RenderTarget<D::RenderTarget>>,
    render_passes: ResourceTable<RenderPassHandle, RenderPass<D::RenderPass>>,
    framebuffers: ResourceTable<FramebufferHandle, Framebuffer<D::Framebuffer>>,
    pipelines: ResourceTable<PipelineHandle, Pipeline<D::Pipeline>>,
    ds_layouts: ResourceTable<DsLayoutHandle, DescriptorSetLayout<D::DescriptorSetLayout>>,
    vertex_shaders: ResourceTable<VertexShaderHandle, Shader<D::Shader>>,
    fragment_shaders: ResourceTable<FragmentShaderHandle, Shader<D::Shader>>,

    ring: RingBuffer,
    ring_alignment: u32,
    /// Ephemeral buffers handed out since the last present
    ephemeral_buffers: Vec<BufferHandle>,
    /// Ring cursor at the end of the last frame recorded in each slot
    frame_ring_marks: Vec<RingMark>,
    frame_slot: usize,
    frame: FrameState,
}

impl<D: Device> Renderer<D> {
    /// Wrap an initialized device
    ///
    /// # Errors
    ///
    /// Invalid configuration or failure to allocate the ring buffer.
    pub fn new(mut device: D, config: RendererConfig) -> Result<Self> {
        config.validate()?;

        let caps = device.capabilities();
        let ring_alignment = caps.ring_alignment();
        if !ring_alignment.is_power_of_two() {
            crate::render_bail!(SOURCE, "Device buffer alignment {} is not a power of two", ring_alignment);
        }

        device.recreate_ring_buffer(config.ephemeral_ring_buf_size)?;
        crate::render_info!(
            SOURCE,
            "Renderer ready: {} frames in flight, {} byte ring buffer, alignment {}",
            caps.num_frames,
            config.ephemeral_ring_buf_size,
            ring_alignment
        );

        Ok(Self {
            device,
            swapchain: config.swapchain,
            shaders: ShaderLibrary::new(NagaCompiler::new(), ShaderLibraryDesc::from(&config)),
            buffers: ResourceTable::new(),
            textures: ResourceTable::new(),
            samplers: ResourceTable::new(),
            render_targets: ResourceTable::new(),
            render_passes: ResourceTable::new(),
            framebuffers: ResourceTable::new(),
            pipelines: ResourceTable::new(),
            ds_layouts: ResourceTable::new(),
            vertex_shaders: ResourceTable::new(),
            fragment_shaders: ResourceTable::new(),
            ring: RingBuffer::new(config.ephemeral_ring_buf_size),
            ring_alignment,
            ephemeral_buffers: Vec::new(),
            frame_ring_marks: vec![RingMark::default(); caps.num_frames.max(1) as usize],
            frame_slot: 0,
            frame: FrameState::new(),
            config,
        })
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    // ===== BUFFERS =====

    /// Permanent GPU buffer initialized with `data`
    pub fn create_buffer(&mut self, data: &[u8]) -> Result<BufferHandle> {
        assert!(!data.is_empty(), "create_buffer with no data");
        let native = self.device.create_buffer(data)?;
        Ok(self.buffers.insert(Buffer {
            native,
            size: data.len() as u32,
            ring_buffer_alloc: false,
            begin_offset: 0,
            ring_generation: 0,
        }))
    }

    /// Frame-scoped buffer carved out of the ring buffer
    ///
    /// The handle becomes invalid when the current frame is presented.
    pub fn create_ephemeral_buffer(&mut self, data: &[u8]) -> Result<BufferHandle> {
        assert!(!data.is_empty(), "create_ephemeral_buffer with no data");
        let size = data.len() as u32;

        let checkpoint = self.ring.checkpoint();
        let alloc = self.ring.allocate(size, self.ring_alignment);
        if let Some(new_size) = alloc.grown_to {
            if let Err(e) = self.device.recreate_ring_buffer(new_size) {
                self.ring.restore(checkpoint);
                return Err(e);
            }
        }
        self.device.write_ring_buffer(alloc.offset, data);

        let handle = self.buffers.insert(Buffer {
            native: self.device.ring_buffer(),
            size,
            ring_buffer_alloc: true,
            begin_offset: alloc.offset,
            ring_generation: self.ring.generation(),
        });
        self.ephemeral_buffers.push(handle);
        Ok(handle)
    }

    pub fn delete_buffer(&mut self, handle: BufferHandle) {
        assert!(
            !self.buffers.get(handle).ring_buffer_alloc,
            "delete_buffer called on ephemeral buffer {:?}",
            handle
        );
        let device = &mut self.device;
        self.buffers.remove_with(handle, |buffer| device.delete_buffer(buffer.native));
    }

    // ===== TEXTURES & SAMPLERS =====

    pub fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle> {
        desc.validate();
        let native = self.device.create_texture(desc)?;
        Ok(self.textures.insert(Texture {
            native,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            render_target: false,
        }))
    }

    pub fn delete_texture(&mut self, handle: TextureHandle) {
        assert!(
            !self.textures.get(handle).render_target,
            "delete_texture called on {:?}, which belongs to a render target",
            handle
        );
        let device = &mut self.device;
        self.textures.remove_with(handle, |texture| device.delete_texture(texture.native));
    }

    pub fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle> {
        let native = self.device.create_sampler(desc)?;
        Ok(self.samplers.insert(native))
    }

    pub fn delete_sampler(&mut self, handle: SamplerHandle) {
        let device = &mut self.device;
        self.samplers.remove_with(handle, |sampler| device.delete_sampler(sampler));
    }

    // ===== RENDER TARGETS, PASSES, FRAMEBUFFERS =====

    /// Render target with its backing texture (see [`render_target_texture`](Self::render_target_texture))
    pub fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<RenderTargetHandle> {
        assert!(desc.width > 0 && desc.height > 0, "render target \"{}\" has zero size", desc.name);
        assert!(desc.format != Format::Invalid, "render target \"{}\" has invalid format", desc.name);

        let (native, texture_native) = self.device.create_render_target(desc)?;
        let texture = self.textures.insert(Texture {
            native: texture_native,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            render_target: true,
        });
        Ok(self.render_targets.insert(RenderTarget {
            native,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            texture,
            current_layout: Layout::Undefined,
        }))
    }

    /// Destroy a render target together with its backing texture
    pub fn delete_render_target(&mut self, handle: RenderTargetHandle) {
        let render_target = self.render_targets.remove(handle);
        let texture = self.textures.remove(render_target.texture);
        self.device.delete_render_target(render_target.native, texture.native);
    }

    pub fn render_target_texture(&self, handle: RenderTargetHandle) -> TextureHandle {
        self.render_targets.get(handle).texture
    }

    pub fn render_target_layout(&self, handle: RenderTargetHandle) -> Layout {
        self.render_targets.get(handle).current_layout
    }

    pub fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<RenderPassHandle> {
        assert!(
            desc.color_format != Format::Invalid && !desc.color_format.is_depth(),
            "render pass \"{}\" needs a color format, got {}",
            desc.name,
            desc.color_format
        );
        assert!(
            !desc.has_depth() || desc.depth_stencil_format.is_depth(),
            "render pass \"{}\" depth attachment has non-depth format {}",
            desc.name,
            desc.depth_stencil_format
        );
        let native = self.device.create_render_pass(desc)?;
        Ok(self.render_passes.insert(RenderPass { native, desc: desc.clone() }))
    }

    pub fn delete_render_pass(&mut self, handle: RenderPassHandle) {
        let device = &mut self.device;
        self.render_passes.remove_with(handle, |pass| device.delete_render_pass(pass.native));
    }

    /// Framebuffer whose attachments must structurally match its render pass
    ///
    /// # Panics
    ///
    /// On a format or size mismatch with the render pass.
    pub fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<FramebufferHandle> {
        let pass = self.render_passes.get(desc.render_pass);
        let color = self.render_targets.get(desc.color);

        assert!(color.width > 0 && color.height > 0, "framebuffer \"{}\" color target has zero size", desc.name);
        assert_eq!(
            color.format, pass.desc.color_format,
            "framebuffer \"{}\" color format does not match render pass \"{}\"",
            desc.name, pass.desc.name
        );

        let depth_stencil = match desc.depth_stencil {
            Some(handle) => {
                let depth = self.render_targets.get(handle);
                assert_eq!(
                    depth.format, pass.desc.depth_stencil_format,
                    "framebuffer \"{}\" depth format does not match render pass \"{}\"",
                    desc.name, pass.desc.name
                );
                assert!(
                    depth.width == color.width && depth.height == color.height,
                    "framebuffer \"{}\" depth target is {}x{}, color target is {}x{}",
                    desc.name,
                    depth.width,
                    depth.height,
                    color.width,
                    color.height
                );
                Some(depth)
            }
            None => {
                assert!(
                    !pass.desc.has_depth(),
                    "framebuffer \"{}\" has no depth target but render pass \"{}\" declares one",
                    desc.name,
                    pass.desc.name
                );
                None
            }
        };

        let native = self.device.create_framebuffer(desc, pass, color, depth_stencil)?;
        let (width, height) = (color.width, color.height);
        Ok(self.framebuffers.insert(Framebuffer {
            native,
            render_pass: desc.render_pass,
            color: desc.color,
            depth_stencil: desc.depth_stencil,
            width,
            height,
        }))
    }

    pub fn delete_framebuffer(&mut self, handle: FramebufferHandle) {
        let device = &mut self.device;
        self.framebuffers.remove_with(handle, |fb| device.delete_framebuffer(fb.native));
    }

    // ===== DESCRIPTOR SET LAYOUTS =====

    /// Layout built from `entries` up to the `DescriptorType::End` sentinel
    pub fn create_descriptor_set_layout(&mut self, entries: &[DescriptorLayout]) -> Result<DsLayoutHandle> {
        let entries = collect_layout(entries);
        let native = self.device.create_descriptor_set_layout(&entries)?;
        Ok(self.ds_layouts.insert(DescriptorSetLayout { native, entries }))
    }

    pub fn delete_descriptor_set_layout(&mut self, handle: DsLayoutHandle) {
        let device = &mut self.device;
        self.ds_layouts.remove_with(handle, |layout| device.delete_descriptor_set_layout(layout.native));
    }

    // ===== SHADERS & PIPELINES =====

    fn build_shader(&mut self, name: &str, macros: &ShaderMacros, stage: ShaderStage) -> Result<Shader<D::Shader>> {
        let file = format!("{}.{}", name, stage.extension());
        let spirv = self.shaders.compile(&file, macros, stage)?;
        let resources = reflect_resources(&spirv)?;
        let native = self.device.create_shader(name, stage, macros, &spirv)?;
        Ok(Shader { native, name: file, stage, resources })
    }

    /// Compile `<shader_dir>/<name>.vert` with `macros`
    pub fn create_vertex_shader(&mut self, name: &str, macros: &ShaderMacros) -> Result<VertexShaderHandle> {
        let shader = self.build_shader(name, macros, ShaderStage::Vertex)?;
        Ok(self.vertex_shaders.insert(shader))
    }

    /// Compile `<shader_dir>/<name>.frag` with `macros`
    pub fn create_fragment_shader(&mut self, name: &str, macros: &ShaderMacros) -> Result<FragmentShaderHandle> {
        let shader = self.build_shader(name, macros, ShaderStage::Fragment)?;
        Ok(self.fragment_shaders.insert(shader))
    }

    pub fn delete_vertex_shader(&mut self, handle: VertexShaderHandle) {
        let device = &mut self.device;
        self.vertex_shaders.remove_with(handle, |shader| device.delete_shader(shader.native));
    }

    pub fn delete_fragment_shader(&mut self, handle: FragmentShaderHandle) {
        let device = &mut self.device;
        self.fragment_shaders.remove_with(handle, |shader| device.delete_shader(shader.native));
    }

    /// Link shaders and snapshot fixed-function state
    ///
    /// Shader resources that do not match the declared descriptor-set layouts
    /// are logged, not rejected.
    pub fn create_pipeline(&mut self, desc: &PipelineDesc) -> Result<PipelineHandle> {
        let vertex = self.vertex_shaders.get(desc.vertex_shader);
        let fragment = self.fragment_shaders.get(desc.fragment_shader);
        let pass = self.render_passes.get(desc.render_pass);

        let layouts: Vec<Option<&DescriptorSetLayout<D::DescriptorSetLayout>>> = desc
            .descriptor_set_layouts
            .iter()
            .map(|&h| h.is_valid().then(|| self.ds_layouts.get(h)))
            .collect();
        let entries: Vec<&[DescriptorLayout]> =
            layouts.iter().map(|l| l.map_or(&[][..], |l| l.entries.as_slice())).collect();
        check_shader_resources(&vertex.name, &vertex.resources, &entries);
        check_shader_resources(&fragment.name, &fragment.resources, &entries);

        let native = self.device.create_pipeline(desc, vertex, fragment, pass, &layouts)?;
        crate::render_debug!(SOURCE, "Created pipeline \"{}\"", desc.name);
        Ok(self.pipelines.insert(Pipeline { native, desc: desc.clone() }))
    }

    pub fn delete_pipeline(&mut self, handle: PipelineHandle) {
        let device = &mut self.device;
        self.pipelines.remove_with(handle, |pipeline| device.delete_pipeline(pipeline.native));
    }

    // ===== FRAME =====

    /// Start recording a frame
    ///
    /// Waits for the frame slot to be free, after which the ring-buffer
    /// space that frame used can be reused.
    pub fn begin_frame(&mut self) -> Result<()> {
        self.frame.begin_frame();
        let slot = self.device.begin_frame()?;
        self.ring.sync_to(self.frame_ring_marks[slot]);
        self.frame_slot = slot;
        Ok(())
    }

    pub fn begin_render_pass(&mut self, pass: RenderPassHandle, framebuffer: FramebufferHandle) {
        self.frame.begin_render_pass(pass, framebuffer);
        let fb = self.framebuffers.get(framebuffer);
        assert_eq!(
            fb.render_pass, pass,
            "framebuffer {:?} was created for render pass {:?}, not {:?}",
            framebuffer, fb.render_pass, pass
        );
        let color = fb.color;
        let color_layout = self.render_targets.get(color).current_layout;
        self.device.begin_render_pass(self.render_passes.get(pass), fb, color_layout);
        self.render_targets.get_mut(color).current_layout = Layout::ColorAttachment;
    }

    /// Leave the render pass; its color target takes the pass's final layout
    pub fn end_render_pass(&mut self) {
        let active = self.frame.end_render_pass();
        self.device.end_render_pass();
        let final_layout = self.render_passes.get(active.pass).desc.color_final_layout;
        let color = self.framebuffers.get(active.framebuffer).color;
        self.render_targets.get_mut(color).current_layout = final_layout;
    }

    pub fn bind_pipeline(&mut self, handle: PipelineHandle) {
        let pipeline = self.pipelines.get(handle);
        self.frame.bind_pipeline(BoundPipeline {
            pipeline: handle,
            render_pass: pipeline.desc.render_pass,
            scissor_test: pipeline.desc.scissor_test,
        });
        self.device.bind_pipeline(pipeline);
    }

    pub fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.frame.set_viewport();
        self.device.set_viewport(x, y, width, height);
    }

    /// Scissor rect in top-left-origin coordinates
    pub fn set_scissor_rect(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.frame.set_scissor_rect();
        self.device.set_scissor_rect(x, y, width, height);
    }

    pub fn bind_index_buffer(&mut self, handle: BufferHandle, bit16: bool) {
        self.frame.require_pipeline("bind_index_buffer");
        let buffer = self.buffers.get(handle);
        buffer.assert_resident(self.ring.capacity_of(buffer.ring_generation));
        self.device.bind_index_buffer(buffer, bit16);
    }

    pub fn bind_vertex_buffer(&mut self, binding: u32, handle: BufferHandle) {
        self.frame.require_pipeline("bind_vertex_buffer");
        assert!((binding as usize) < MAX_VERTEX_BUFFERS, "vertex buffer binding {} out of range", binding);
        let buffer = self.buffers.get(handle);
        buffer.assert_resident(self.ring.capacity_of(buffer.ring_generation));
        self.device.bind_vertex_buffer(binding, buffer);
    }

    /// Bind set `index` from a data block laid out as `layout` describes
    ///
    /// # Errors
    ///
    /// When the device cannot allocate or write the native set.
    ///
    /// # Panics
    ///
    /// If `layout` is not the layout the bound pipeline declares at `index`,
    /// or a handle read from `data` is invalid.
    pub fn bind_descriptor_set(&mut self, index: u32, layout: DsLayoutHandle, data: &[u8]) -> Result<()> {
        let bound = self.frame.require_pipeline("bind_descriptor_set");
        assert!((index as usize) < MAX_DESCRIPTOR_SETS, "descriptor set index {} out of range", index);
        let declared = self.pipelines.get(bound.pipeline).desc.descriptor_set_layouts[index as usize];
        assert_eq!(
            declared, layout,
            "descriptor set {} layout {:?} does not match the pipeline's {:?}",
            index, layout, declared
        );

        let set_layout = self.ds_layouts.get(layout);
        let mut descriptors: Vec<BoundDescriptor<'_, D>> = Vec::with_capacity(set_layout.entries.len());
        for (position, entry) in set_layout.entries.iter().enumerate() {
            let binding = set_layout.binding_of(position);
            let descriptor: BoundDescriptor<'_, D> = match entry.ty {
                DescriptorType::UniformBuffer | DescriptorType::StorageBuffer => {
                    let buffer = self.buffers.get(read_field(data, entry.offset));
                    buffer.assert_resident(self.ring.capacity_of(buffer.ring_generation));
                    let (offset, size) = (buffer.begin_offset, buffer.size);
                    if entry.ty == DescriptorType::UniformBuffer {
                        BoundDescriptor::UniformBuffer { binding, buffer: &buffer.native, offset, size }
                    } else {
                        BoundDescriptor::StorageBuffer { binding, buffer: &buffer.native, offset, size }
                    }
                }
                DescriptorType::Sampler => BoundDescriptor::Sampler {
                    binding,
                    sampler: self.samplers.get(read_field(data, entry.offset)),
                },
                DescriptorType::Texture => BoundDescriptor::Texture {
                    binding,
                    texture: &self.textures.get(read_field(data, entry.offset)).native,
                },
                DescriptorType::CombinedSampler => {
                    let pair: CombinedSampler = read_field(data, entry.offset);
                    BoundDescriptor::CombinedSampler {
                        binding,
                        sampler_binding: set_layout.sampler_binding_of(position),
                        texture: &self.textures.get(pair.texture).native,
                        sampler: self.samplers.get(pair.sampler),
                    }
                }
                DescriptorType::End => unreachable!("descriptor set layout contains its terminator"),
            };
            descriptors.push(descriptor);
        }

        self.device.bind_descriptor_set(index, set_layout, &descriptors)
    }

    pub fn draw(&mut self, first_vertex: u32, vertex_count: u32) {
        self.frame.draw("draw", vertex_count, 1);
        self.device.draw(first_vertex, vertex_count);
    }

    pub fn draw_indexed_instanced(&mut self, vertex_count: u32, instance_count: u32) {
        self.frame.draw("draw_indexed_instanced", vertex_count, instance_count);
        self.device.draw_indexed_instanced(vertex_count, instance_count);
    }

    /// Indexed draw starting at index `first_index` of the bound index buffer
    pub fn draw_indexed_offset(&mut self, vertex_count: u32, first_index: u32) {
        self.frame.draw("draw_indexed_offset", vertex_count, 1);
        self.device.draw_indexed_offset(vertex_count, first_index);
    }

    /// Record a layout change of a render target outside any render pass
    pub fn layout_transition(&mut self, handle: RenderTargetHandle, from: Layout, to: Layout) {
        self.frame.require_outside_pass("layout_transition");
        let render_target = self.render_targets.get_mut(handle);
        assert_eq!(
            render_target.current_layout, from,
            "layout_transition of {:?} from {} but it is in {}",
            handle, from, render_target.current_layout
        );
        self.device.layout_transition(render_target, from, to);
        render_target.current_layout = to;
    }

    /// Copy one render target into another of the same size
    pub fn blit(&mut self, src: RenderTargetHandle, dst: RenderTargetHandle) {
        self.frame.require_outside_pass("blit");
        let source = self.render_targets.get(src);
        let target = self.render_targets.get(dst);
        assert!(
            source.width == target.width && source.height == target.height,
            "blit between differently sized render targets {:?} and {:?}",
            src,
            dst
        );
        assert_eq!(source.current_layout, Layout::TransferSrc, "blit source {:?} is not in TransferSrc", src);
        assert_eq!(target.current_layout, Layout::TransferDst, "blit target {:?} is not in TransferDst", dst);
        self.device.blit(source, target);
    }

    /// Show `handle` on screen and end the frame
    ///
    /// The render target must already be in `TransferSrc`. Every ephemeral
    /// buffer created during the frame is released.
    pub fn present_frame(&mut self, handle: RenderTargetHandle) -> Result<()> {
        self.frame.present();
        let render_target = self.render_targets.get_mut(handle);
        assert_eq!(
            render_target.current_layout,
            Layout::TransferSrc,
            "present_frame of {:?} requires TransferSrc layout, found {}",
            handle,
            render_target.current_layout
        );
        let presented = self.device.present(render_target);

        for buffer in self.ephemeral_buffers.drain(..) {
            self.buffers.remove(buffer);
        }
        self.frame_ring_marks[self.frame_slot] = self.ring.mark();
        presented
    }

    // ===== SURFACE & QUERIES =====

    pub fn swapchain_desc(&self) -> &SwapchainDesc {
        &self.swapchain
    }

    /// Apply new swapchain settings between frames
    ///
    /// # Errors
    ///
    /// Native failures, or a drawable size that is not positive afterwards.
    pub fn set_swapchain_desc(&mut self, desc: &SwapchainDesc) -> Result<()> {
        assert!(!self.frame.in_frame(), "set_swapchain_desc called during a frame");
        if desc.fullscreen != self.swapchain.fullscreen {
            crate::render_info!(SOURCE, "Fullscreen {}", if desc.fullscreen { "on" } else { "off" });
        }
        if desc.vsync != self.swapchain.vsync {
            crate::render_info!(SOURCE, "VSync {}", if desc.vsync { "on" } else { "off" });
        }
        self.device.set_swapchain_desc(&self.swapchain, desc)?;

        let (width, height) = self.device.drawable_size();
        if width == 0 || height == 0 {
            crate::render_bail!(SOURCE, "Drawable size {}x{} is not positive", width, height);
        }
        self.swapchain = SwapchainDesc { width, height, ..*desc };
        Ok(())
    }

    pub fn drawable_size(&self) -> (u32, u32) {
        self.device.drawable_size()
    }

    pub fn current_refresh_rate(&self) -> u32 {
        self.device.current_refresh_rate()
    }

    pub fn max_refresh_rate(&self) -> u32 {
        self.device.max_refresh_rate()
    }

    pub fn is_render_target_format_supported(&self, format: Format) -> bool {
        self.device.is_render_target_format_supported(format)
    }

    pub fn mem_stats(&self) -> MemoryStats {
        MemoryStats {
            ring_buffer_size: self.ring.capacity(),
            ring_buffer_in_flight: self.ring.in_flight(),
            buffers: self.buffers.len() - self.ephemeral_buffers.len(),
            ephemeral_buffers: self.ephemeral_buffers.len(),
            textures: self.textures.len(),
            render_targets: self.render_targets.len(),
        }
    }
}

impl<D: Device> Drop for Renderer<D> {
    fn drop(&mut self) {
        self.device.wait_idle();

        let Self {
            device,
            buffers,
            textures,
            samplers,
            render_targets,
            render_passes,
            framebuffers,
            pipelines,
            ds_layouts,
            vertex_shaders,
            fragment_shaders,
            ephemeral_buffers,
            ..
        } = self;

        framebuffers.clear_with(|_, fb| device.delete_framebuffer(fb.native));
        render_passes.clear_with(|_, pass| device.delete_render_pass(pass.native));
        render_targets.clear_with(|_, rt| {
            let texture = textures.remove(rt.texture);
            device.delete_render_target(rt.native, texture.native);
        });
        pipelines.clear_with(|_, pipeline| device.delete_pipeline(pipeline.native));
        vertex_shaders.clear_with(|_, shader| device.delete_shader(shader.native));
        fragment_shaders.clear_with(|_, shader| device.delete_shader(shader.native));
        textures.clear_with(|_, texture| device.delete_texture(texture.native));
        samplers.clear_with(|_, sampler| device.delete_sampler(sampler));
        ds_layouts.clear_with(|_, layout| device.delete_descriptor_set_layout(layout.native));

        for handle in ephemeral_buffers.drain(..) {
            buffers.remove(handle);
        }
        buffers.clear_with(|_, buffer| device.delete_buffer(buffer.native));
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
