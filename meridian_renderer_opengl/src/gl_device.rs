//! `GlDevice`: the immediate-mode backend
//!
//! Descriptor sets and render passes have no GL object: a render pass is
//! its descriptor (clear mask and color) and a descriptor-set layout is its
//! entry list, both kept by the renderer. Sets are flattened, every
//! descriptor binds at its binding number regardless of the set index.
//!
//! Frames in flight are throttled with one fence per frame slot. Replaced
//! ring buffers are kept until the fences of every frame that could read
//! them have signaled.

use crate::gl_capabilities::check_capabilities;
use crate::gl_format::{
    attachment_point, blit_mask, flip_rect_y, gl_format, is_color_renderable, label_object, mag_filter, min_filter,
    vertex_format, wrap_mode, GlFormat,
};
use crate::gl_ring_buffer::GlRingBuffer;
use crate::gl_shader::{compile_shader, link_program, merge_sampler_units, units_for_sampler, GlShader};
use crate::gl_surface::GlSurface;
use glow::HasContext;
use meridian_renderer::meridian::render::{
    changed_attribs, Buffer, BoundDescriptor, ClearFlags, DescriptorLayout, DescriptorSetLayout, Device, DeviceCaps,
    Format, Framebuffer, FramebufferDesc, Layout, Pipeline, PipelineDesc, RenderPass, RenderPassDesc, RenderTarget,
    RenderTargetDesc, RendererConfig, SamplerDesc, Shader, SwapchainDesc, TextureDesc, MAX_VERTEX_BUFFERS,
};
use meridian_renderer::meridian::shader::{transpile_to_glsl, SamplerUnit, ShaderMacros, ShaderStage};
use meridian_renderer::meridian::Result;
use meridian_renderer::utils::RetireQueue;
use meridian_renderer::{render_bail, render_debug, render_err, render_error, render_info, render_trace, render_warn};
use std::path::PathBuf;

const SOURCE: &str = "meridian::gl";

/// Texture plus a framebuffer that reads from / writes to it alone
pub struct GlRenderTarget {
    pub texture: glow::Texture,
    pub framebuffer: glow::Framebuffer,
}

pub struct GlPipeline {
    pub program: glow::Program,
    pub sampler_units: Vec<SamplerUnit>,
}

pub struct GlDevice<S: GlSurface> {
    gl: glow::Context,
    surface: S,
    debug: bool,
    save_preprocessed_shaders: bool,
    shader_dir: PathBuf,
    caps: DeviceCaps,
    vao: glow::VertexArray,

    ring: Option<GlRingBuffer>,
    retired_rings: RetireQueue<GlRingBuffer>,
    fences: Vec<Option<glow::Fence>>,
    frame_number: u64,
    frame_slot: usize,

    framebuffer_height: u32,
    attrib_mask: u32,
    vertex_strides: [u32; MAX_VERTEX_BUFFERS],
    index_type: u32,
    index_size: u32,
    index_offset: u32,
    sampler_units: Vec<SamplerUnit>,
}

impl<S: GlSurface> GlDevice<S> {
    /// Take over a current context
    ///
    /// # Errors
    ///
    /// `InitializationFailed` if the context lacks a required version or extension.
    pub fn new(gl: glow::Context, mut surface: S, config: &RendererConfig) -> Result<Self> {
        config.validate()?;
        let mut gl = gl;
        let version = gl.version();
        let (major, minor) = (version.major, version.minor);
        render_info!(SOURCE, "OpenGL {}.{} ({})", major, minor, version.vendor_info);
        check_capabilities((major, minor), gl.supported_extensions())?;

        let (vao, caps) = unsafe {
            if config.debug && gl.supports_debug() {
                gl.enable(glow::DEBUG_OUTPUT);
                gl.enable(glow::DEBUG_OUTPUT_SYNCHRONOUS);
                gl.debug_message_callback(|_source, _ty, id, severity, message| match severity {
                    glow::DEBUG_SEVERITY_HIGH => render_error!(SOURCE, "GL debug [{}]: {}", id, message),
                    glow::DEBUG_SEVERITY_MEDIUM => render_warn!(SOURCE, "GL debug [{}]: {}", id, message),
                    _ => render_trace!(SOURCE, "GL debug [{}]: {}", id, message),
                });
            }

            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.front_face(glow::CW);
            gl.cull_face(glow::BACK);
            gl.depth_func(glow::LESS);
            gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);

            let vao = gl
                .create_vertex_array()
                .map_err(|e| render_err!(SOURCE, "Failed to create vertex array: {}", e))?;
            gl.bind_vertex_array(Some(vao));

            let caps = DeviceCaps {
                uniform_buffer_alignment: gl.get_parameter_i32(glow::UNIFORM_BUFFER_OFFSET_ALIGNMENT).max(1) as u32,
                storage_buffer_alignment: gl.get_parameter_i32(glow::SHADER_STORAGE_BUFFER_OFFSET_ALIGNMENT).max(1)
                    as u32,
                num_frames: config.swapchain.num_frames,
            };
            (vao, caps)
        };

        surface.set_vsync(config.swapchain.vsync)?;
        if config.swapchain.fullscreen {
            surface.set_fullscreen(true, config.swapchain.width, config.swapchain.height)?;
        }
        let (_, drawable_height) = surface.drawable_size();

        Ok(Self {
            gl,
            surface,
            debug: config.debug,
            save_preprocessed_shaders: config.save_preprocessed_shaders,
            shader_dir: config.shader_dir.clone(),
            caps,
            vao,
            ring: None,
            retired_rings: RetireQueue::new(),
            fences: (0..config.swapchain.num_frames).map(|_| None).collect(),
            frame_number: 0,
            frame_slot: 0,
            framebuffer_height: drawable_height,
            attrib_mask: 0,
            vertex_strides: [0; MAX_VERTEX_BUFFERS],
            index_type: glow::UNSIGNED_SHORT,
            index_size: 2,
            index_offset: 0,
            sampler_units: Vec::new(),
        })
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    fn label(&self, identifier: u32, name: u32, label: &str) {
        if self.debug {
            unsafe { label_object(&self.gl, identifier, name, label) };
        }
    }

    fn texture_format(format: Format, name: &str) -> Result<GlFormat> {
        gl_format(format).ok_or_else(|| render_err!(SOURCE, "Format {} of \"{}\" has no GL equivalent", format, name))
    }

    unsafe fn wait_fence(&self, fence: glow::Fence) -> Result<()> {
        loop {
            match self.gl.client_wait_sync(fence, glow::SYNC_FLUSH_COMMANDS_BIT, 1_000_000_000) {
                glow::ALREADY_SIGNALED | glow::CONDITION_SATISFIED => break,
                glow::TIMEOUT_EXPIRED => render_debug!(SOURCE, "Still waiting for frame fence"),
                _ => {
                    self.gl.delete_sync(fence);
                    render_bail!(SOURCE, "glClientWaitSync failed");
                }
            }
        }
        self.gl.delete_sync(fence);
        Ok(())
    }

    unsafe fn set_enabled(&self, cap: u32, enabled: bool) {
        if enabled {
            self.gl.enable(cap);
        } else {
            self.gl.disable(cap);
        }
    }

    unsafe fn framebuffer_status(&self, name: &str) -> Result<()> {
        let status = self.gl.check_framebuffer_status(glow::FRAMEBUFFER);
        if status != glow::FRAMEBUFFER_COMPLETE {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            render_bail!(SOURCE, "Framebuffer \"{}\" incomplete: 0x{:x}", name, status);
        }
        Ok(())
    }
}

impl<S: GlSurface> Device for GlDevice<S> {
    type Buffer = glow::Buffer;
    type Texture = glow::Texture;
    type Sampler = glow::Sampler;
    type RenderTarget = GlRenderTarget;
    type RenderPass = ();
    type Framebuffer = glow::Framebuffer;
    type Pipeline = GlPipeline;
    type Shader = GlShader;
    type DescriptorSetLayout = ();

    fn capabilities(&self) -> DeviceCaps {
        self.caps
    }

    // ===== RESOURCES =====

    fn create_buffer(&mut self, data: &[u8]) -> Result<glow::Buffer> {
        unsafe {
            let buffer = self
                .gl
                .create_buffer()
                .map_err(|e| render_err!(SOURCE, "Failed to create buffer: {}", e))?;
            self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, Some(buffer));
            self.gl.buffer_storage(glow::COPY_WRITE_BUFFER, data.len() as i32, Some(data), 0);
            self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, None);
            Ok(buffer)
        }
    }

    fn delete_buffer(&mut self, buffer: glow::Buffer) {
        unsafe { self.gl.delete_buffer(buffer) };
    }

    fn recreate_ring_buffer(&mut self, size: u32) -> Result<()> {
        let ring = unsafe { GlRingBuffer::new(&self.gl, size, !self.debug)? };
        render_debug!(SOURCE, "Ring buffer of {} bytes (mapped: {})", size, ring.is_mapped());
        if let Some(old) = self.ring.replace(ring) {
            self.retired_rings.retire(self.frame_number, old);
        }
        Ok(())
    }

    fn ring_buffer(&self) -> glow::Buffer {
        match &self.ring {
            Some(ring) => ring.buffer,
            None => panic!("ring buffer used before it was created"),
        }
    }

    fn write_ring_buffer(&mut self, offset: u32, data: &[u8]) {
        match &self.ring {
            Some(ring) => unsafe { ring.write(&self.gl, offset, data) },
            None => panic!("ring buffer written before it was created"),
        }
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<glow::Texture> {
        let format = Self::texture_format(desc.format, desc.name)?;
        unsafe {
            let texture = self
                .gl
                .create_texture()
                .map_err(|e| render_err!(SOURCE, "Failed to create texture \"{}\": {}", desc.name, e))?;
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl.tex_storage_2d(
                glow::TEXTURE_2D,
                desc.num_mips() as i32,
                format.internal,
                desc.width as i32,
                desc.height as i32,
            );
            for (level, ((width, height), data)) in desc.mip_extents().into_iter().zip(&desc.mip_data).enumerate() {
                self.gl.tex_sub_image_2d(
                    glow::TEXTURE_2D,
                    level as i32,
                    0,
                    0,
                    width as i32,
                    height as i32,
                    format.format,
                    format.ty,
                    glow::PixelUnpackData::Slice(data),
                );
            }
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAX_LEVEL, desc.num_mips() as i32 - 1);
            self.gl.bind_texture(glow::TEXTURE_2D, None);
            self.label(glow::TEXTURE, texture.0.get(), desc.name);
            Ok(texture)
        }
    }

    fn delete_texture(&mut self, texture: glow::Texture) {
        unsafe { self.gl.delete_texture(texture) };
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<glow::Sampler> {
        unsafe {
            let sampler = self
                .gl
                .create_sampler()
                .map_err(|e| render_err!(SOURCE, "Failed to create sampler: {}", e))?;
            self.gl.sampler_parameter_i32(sampler, glow::TEXTURE_MIN_FILTER, min_filter(desc.min));
            self.gl.sampler_parameter_i32(sampler, glow::TEXTURE_MAG_FILTER, mag_filter(desc.mag));
            self.gl.sampler_parameter_i32(sampler, glow::TEXTURE_WRAP_S, wrap_mode(desc.wrap_mode));
            self.gl.sampler_parameter_i32(sampler, glow::TEXTURE_WRAP_T, wrap_mode(desc.wrap_mode));
            Ok(sampler)
        }
    }

    fn delete_sampler(&mut self, sampler: glow::Sampler) {
        unsafe { self.gl.delete_sampler(sampler) };
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<(GlRenderTarget, glow::Texture)> {
        let format = Self::texture_format(desc.format, &desc.name)?;
        unsafe {
            let texture = self
                .gl
                .create_texture()
                .map_err(|e| render_err!(SOURCE, "Failed to create render target \"{}\": {}", desc.name, e))?;
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl
                .tex_storage_2d(glow::TEXTURE_2D, 1, format.internal, desc.width as i32, desc.height as i32);
            let filter = if desc.format.is_depth() { glow::NEAREST } else { glow::LINEAR };
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter as i32);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter as i32);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAX_LEVEL, 0);
            self.gl.bind_texture(glow::TEXTURE_2D, None);

            let framebuffer = self
                .gl
                .create_framebuffer()
                .map_err(|e| render_err!(SOURCE, "Failed to create framebuffer for \"{}\": {}", desc.name, e))?;
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                attachment_point(desc.format),
                glow::TEXTURE_2D,
                Some(texture),
                0,
            );
            if let Err(e) = self.framebuffer_status(&desc.name) {
                self.gl.delete_framebuffer(framebuffer);
                self.gl.delete_texture(texture);
                return Err(e);
            }
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);

            self.label(glow::TEXTURE, texture.0.get(), &desc.name);
            self.label(glow::FRAMEBUFFER, framebuffer.0.get(), &desc.name);
            Ok((GlRenderTarget { texture, framebuffer }, texture))
        }
    }

    fn delete_render_target(&mut self, render_target: GlRenderTarget, _texture: glow::Texture) {
        unsafe {
            self.gl.delete_framebuffer(render_target.framebuffer);
            self.gl.delete_texture(render_target.texture);
        }
    }

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<()> {
        render_trace!(SOURCE, "Render pass \"{}\" ({} / {})", desc.name, desc.color_format, desc.depth_stencil_format);
        Ok(())
    }

    fn delete_render_pass(&mut self, _pass: ()) {}

    fn create_framebuffer(
        &mut self,
        desc: &FramebufferDesc,
        _pass: &RenderPass<()>,
        color: &RenderTarget<GlRenderTarget>,
        depth_stencil: Option<&RenderTarget<GlRenderTarget>>,
    ) -> Result<glow::Framebuffer> {
        unsafe {
            let framebuffer = self
                .gl
                .create_framebuffer()
                .map_err(|e| render_err!(SOURCE, "Failed to create framebuffer \"{}\": {}", desc.name, e))?;
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(color.native.texture),
                0,
            );
            if let Some(depth) = depth_stencil {
                self.gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    attachment_point(depth.format),
                    glow::TEXTURE_2D,
                    Some(depth.native.texture),
                    0,
                );
            }
            if let Err(e) = self.framebuffer_status(&desc.name) {
                self.gl.delete_framebuffer(framebuffer);
                return Err(e);
            }
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            self.label(glow::FRAMEBUFFER, framebuffer.0.get(), &desc.name);
            Ok(framebuffer)
        }
    }

    fn delete_framebuffer(&mut self, framebuffer: glow::Framebuffer) {
        unsafe { self.gl.delete_framebuffer(framebuffer) };
    }

    fn create_descriptor_set_layout(&mut self, _entries: &[DescriptorLayout]) -> Result<()> {
        Ok(())
    }

    fn delete_descriptor_set_layout(&mut self, _layout: ()) {}

    fn create_shader(&mut self, name: &str, stage: ShaderStage, macros: &ShaderMacros, spirv: &[u32]) -> Result<GlShader> {
        let glsl = transpile_to_glsl(name, macros, spirv, stage)?;
        if self.save_preprocessed_shaders {
            if let Err(e) = glsl.save(&self.shader_dir, name, stage) {
                render_warn!(SOURCE, "Could not save preprocessed shader \"{}\": {}", name, e);
            }
        }

        let label = format!("{}.{}", name, stage.extension());
        let shader = unsafe { compile_shader(&self.gl, &label, stage, &glsl.source)? };
        self.label(glow::SHADER, shader.0.get(), &label);
        Ok(GlShader { shader, sampler_units: glsl.sampler_units })
    }

    fn delete_shader(&mut self, shader: GlShader) {
        unsafe { self.gl.delete_shader(shader.shader) };
    }

    fn create_pipeline(
        &mut self,
        desc: &PipelineDesc,
        vertex: &Shader<GlShader>,
        fragment: &Shader<GlShader>,
        _pass: &RenderPass<()>,
        _layouts: &[Option<&DescriptorSetLayout<()>>],
    ) -> Result<GlPipeline> {
        let program = unsafe { link_program(&self.gl, &desc.name, vertex.native.shader, fragment.native.shader)? };
        self.label(glow::PROGRAM, program.0.get(), &desc.name);
        Ok(GlPipeline {
            program,
            sampler_units: merge_sampler_units(&vertex.native.sampler_units, &fragment.native.sampler_units),
        })
    }

    fn delete_pipeline(&mut self, pipeline: GlPipeline) {
        unsafe { self.gl.delete_program(pipeline.program) };
    }

    // ===== FRAME =====

    fn begin_frame(&mut self) -> Result<usize> {
        self.frame_number += 1;
        let slot = (self.frame_number % self.fences.len() as u64) as usize;
        self.frame_slot = slot;

        unsafe {
            if let Some(fence) = self.fences[slot].take() {
                self.wait_fence(fence)?;
            }
            let completed = self.frame_number.saturating_sub(self.fences.len() as u64);
            for ring in self.retired_rings.release(completed) {
                ring.destroy(&self.gl);
            }

            self.sampler_units.clear();
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            self.gl.disable(glow::SCISSOR_TEST);
            self.gl.depth_mask(true);
            self.gl.clear_color(0.0, 0.0, 0.0, 1.0);
            self.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
        Ok(slot)
    }

    fn begin_render_pass(&mut self, pass: &RenderPass<()>, framebuffer: &Framebuffer<glow::Framebuffer>, _color_layout: Layout) {
        let desc = &pass.desc;
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer.native));
            self.gl.viewport(0, 0, framebuffer.width as i32, framebuffer.height as i32);
            self.gl.disable(glow::SCISSOR_TEST);
            self.framebuffer_height = framebuffer.height;

            let mut mask = 0;
            if desc.clear.contains(ClearFlags::COLOR) {
                let c = desc.clear_color;
                self.gl.clear_color(c.x, c.y, c.z, c.w);
                mask |= glow::COLOR_BUFFER_BIT;
            }
            if desc.has_depth() && desc.clear.contains(ClearFlags::DEPTH) {
                self.gl.depth_mask(true);
                self.gl.clear_depth_f32(1.0);
                mask |= glow::DEPTH_BUFFER_BIT;
            }
            if desc.has_depth() && desc.clear.contains(ClearFlags::STENCIL) {
                self.gl.stencil_mask(0xff);
                self.gl.clear_stencil(0);
                mask |= glow::STENCIL_BUFFER_BIT;
            }
            if mask != 0 {
                self.gl.clear(mask);
            }
        }
    }

    fn end_render_pass(&mut self) {
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, None) };
        self.framebuffer_height = self.surface.drawable_size().1;
    }

    fn bind_pipeline(&mut self, pipeline: &Pipeline<GlPipeline>) {
        let desc = &pipeline.desc;
        unsafe {
            self.gl.use_program(Some(pipeline.native.program));
            self.set_enabled(glow::DEPTH_TEST, desc.depth_test);
            self.gl.depth_mask(desc.depth_write);
            self.set_enabled(glow::CULL_FACE, desc.cull_faces);
            self.set_enabled(glow::SCISSOR_TEST, desc.scissor_test);
            self.set_enabled(glow::BLEND, desc.blending);

            for (location, enabled) in changed_attribs(self.attrib_mask, desc.vertex_attrib_mask) {
                if enabled {
                    self.gl.enable_vertex_attrib_array(location);
                } else {
                    self.gl.disable_vertex_attrib_array(location);
                }
            }
            for (location, attrib) in desc.enabled_attribs() {
                let (ty, normalized) = vertex_format(attrib.format);
                self.gl
                    .vertex_attrib_format_f32(location, attrib.count as i32, ty, normalized, attrib.offset);
                self.gl.vertex_attrib_binding(location, attrib.buf_binding);
            }
        }
        self.attrib_mask = desc.vertex_attrib_mask;
        self.vertex_strides = desc.vertex_buffers.map(|b| b.stride);
        self.sampler_units.clone_from(&pipeline.native.sampler_units);
    }

    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        let gl_y = flip_rect_y(y, height, self.framebuffer_height);
        unsafe { self.gl.viewport(x as i32, gl_y, width as i32, height as i32) };
    }

    fn set_scissor_rect(&mut self, x: u32, y: u32, width: u32, height: u32) {
        let gl_y = flip_rect_y(y, height, self.framebuffer_height);
        unsafe { self.gl.scissor(x as i32, gl_y, width as i32, height as i32) };
    }

    fn bind_index_buffer(&mut self, buffer: &Buffer<glow::Buffer>, bit16: bool) {
        unsafe { self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(buffer.native)) };
        (self.index_type, self.index_size) = if bit16 { (glow::UNSIGNED_SHORT, 2) } else { (glow::UNSIGNED_INT, 4) };
        self.index_offset = buffer.begin_offset;
    }

    fn bind_vertex_buffer(&mut self, binding: u32, buffer: &Buffer<glow::Buffer>) {
        let stride = self.vertex_strides[binding as usize];
        unsafe {
            self.gl
                .bind_vertex_buffer(binding, Some(buffer.native), buffer.begin_offset as i32, stride as i32)
        };
    }

    fn bind_descriptor_set(
        &mut self,
        index: u32,
        _layout: &DescriptorSetLayout<()>,
        descriptors: &[BoundDescriptor<'_, Self>],
    ) -> Result<()> {
        for descriptor in descriptors {
            unsafe {
                match *descriptor {
                    BoundDescriptor::UniformBuffer { binding, buffer, offset, size } => {
                        self.gl.bind_buffer_range(glow::UNIFORM_BUFFER, binding, Some(*buffer), offset as i32, size as i32)
                    }
                    BoundDescriptor::StorageBuffer { binding, buffer, offset, size } => self.gl.bind_buffer_range(
                        glow::SHADER_STORAGE_BUFFER,
                        binding,
                        Some(*buffer),
                        offset as i32,
                        size as i32,
                    ),
                    BoundDescriptor::Texture { binding, texture } => {
                        self.gl.active_texture(glow::TEXTURE0 + binding);
                        self.gl.bind_texture(glow::TEXTURE_2D, Some(*texture));
                    }
                    BoundDescriptor::Sampler { binding, sampler } => {
                        let units = units_for_sampler(&self.sampler_units, index, binding);
                        if units.is_empty() {
                            self.gl.bind_sampler(binding, Some(*sampler));
                        }
                        for unit in units {
                            self.gl.bind_sampler(unit, Some(*sampler));
                        }
                    }
                    // The transpiled sampler2D sits on the texture's unit
                    BoundDescriptor::CombinedSampler { binding, texture, sampler, .. } => {
                        self.gl.active_texture(glow::TEXTURE0 + binding);
                        self.gl.bind_texture(glow::TEXTURE_2D, Some(*texture));
                        self.gl.bind_sampler(binding, Some(*sampler));
                    }
                }
            }
        }
        Ok(())
    }

    fn draw(&mut self, first_vertex: u32, vertex_count: u32) {
        unsafe { self.gl.draw_arrays(glow::TRIANGLES, first_vertex as i32, vertex_count as i32) };
    }

    fn draw_indexed_instanced(&mut self, vertex_count: u32, instance_count: u32) {
        unsafe {
            self.gl.draw_elements_instanced(
                glow::TRIANGLES,
                vertex_count as i32,
                self.index_type,
                self.index_offset as i32,
                instance_count as i32,
            )
        };
    }

    fn draw_indexed_offset(&mut self, vertex_count: u32, first_index: u32) {
        let offset = self.index_offset + first_index * self.index_size;
        unsafe { self.gl.draw_elements(glow::TRIANGLES, vertex_count as i32, self.index_type, offset as i32) };
    }

    fn layout_transition(&mut self, _render_target: &RenderTarget<GlRenderTarget>, from: Layout, to: Layout) {
        render_trace!(SOURCE, "Layout {} -> {} (implicit in GL)", from, to);
    }

    fn blit(&mut self, src: &RenderTarget<GlRenderTarget>, dst: &RenderTarget<GlRenderTarget>) {
        let (w, h) = (src.width as i32, src.height as i32);
        unsafe {
            self.gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(src.native.framebuffer));
            self.gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(dst.native.framebuffer));
            self.gl.disable(glow::SCISSOR_TEST);
            self.gl.blit_framebuffer(0, 0, w, h, 0, 0, w, h, blit_mask(src.format), glow::NEAREST);
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
    }

    fn present(&mut self, render_target: &mut RenderTarget<GlRenderTarget>) -> Result<()> {
        let (width, height) = self.surface.drawable_size();
        unsafe {
            self.gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(render_target.native.framebuffer));
            self.gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
            self.gl.disable(glow::SCISSOR_TEST);
            self.gl.blit_framebuffer(
                0,
                0,
                render_target.width as i32,
                render_target.height as i32,
                0,
                0,
                width as i32,
                height as i32,
                glow::COLOR_BUFFER_BIT,
                glow::LINEAR,
            );
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }

        self.surface.swap_buffers()?;

        let fence = unsafe { self.gl.fence_sync(glow::SYNC_GPU_COMMANDS_COMPLETE, 0) }
            .map_err(|e| render_err!(SOURCE, "Failed to create frame fence: {}", e))?;
        self.fences[self.frame_slot] = Some(fence);
        Ok(())
    }

    // ===== SURFACE =====

    fn set_swapchain_desc(&mut self, old: &SwapchainDesc, new: &SwapchainDesc) -> Result<()> {
        if new.fullscreen != old.fullscreen {
            self.surface.set_fullscreen(new.fullscreen, new.width, new.height)?;
        } else if !new.fullscreen && (new.width, new.height) != (old.width, old.height) {
            self.surface.resize(new.width, new.height)?;
        }
        if new.vsync != old.vsync {
            self.surface.set_vsync(new.vsync)?;
        }
        if new.num_frames != old.num_frames {
            render_warn!(SOURCE, "Frames in flight are fixed at device creation ({})", self.fences.len());
        }
        self.framebuffer_height = self.surface.drawable_size().1;
        Ok(())
    }

    fn drawable_size(&self) -> (u32, u32) {
        self.surface.drawable_size()
    }

    fn current_refresh_rate(&self) -> u32 {
        self.surface.current_refresh_rate()
    }

    fn max_refresh_rate(&self) -> u32 {
        self.surface.max_refresh_rate()
    }

    fn is_render_target_format_supported(&self, format: Format) -> bool {
        is_color_renderable(format)
    }

    fn wait_idle(&mut self) {
        unsafe { self.gl.finish() };
    }
}

impl<S: GlSurface> Drop for GlDevice<S> {
    fn drop(&mut self) {
        unsafe {
            self.gl.finish();
            for fence in self.fences.iter_mut().filter_map(Option::take) {
                self.gl.delete_sync(fence);
            }
            for ring in self.retired_rings.drain().into_iter().chain(self.ring.take()) {
                ring.destroy(&self.gl);
            }
            self.gl.bind_vertex_array(None);
            self.gl.delete_vertex_array(self.vao);
        }
    }
}
