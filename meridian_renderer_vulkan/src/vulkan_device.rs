//! `VulkanDevice`: the explicit backend
//!
//! Every frame slot owns a command pool, a fence, an acquire semaphore and
//! its descriptor pools. Deleted objects are queued as [`Garbage`] and
//! destroyed when the slot that could last have used them comes around
//! again. Presentation blits the final render target into the acquired
//! swapchain image.

use crate::vulkan_context::VulkanContext;
use crate::vulkan_descriptors::{layout_bindings, DescriptorAllocator, DescriptorWrites};
use crate::vulkan_format::{
    address_mode, aspect_mask, filter, index_type, layout_state, mipmap_mode, render_target_features,
    sampled_aspect_mask, vk_format, LayoutState,
};
use crate::vulkan_pipeline::{
    blend_attachment, color_attachment, depth_attachment, depth_stencil, rasterization, set_layouts,
    subpass_dependencies, vertex_input,
};
use crate::vulkan_resources::{
    Garbage, VulkanBuffer, VulkanFramebuffer, VulkanPipeline, VulkanRenderTarget, VulkanRingBuffer, VulkanTexture,
};
use crate::vulkan_swapchain::Swapchain;
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use meridian_renderer::meridian::render::{
    Buffer, BoundDescriptor, ClearFlags, DescriptorLayout, DescriptorSetLayout, Device, DeviceCaps, Format,
    Framebuffer, FramebufferDesc, Layout, Pipeline, PipelineDesc, RenderPass, RenderPassDesc, RenderTarget,
    RenderTargetDesc, RendererConfig, SamplerDesc, Shader, SwapchainDesc, TextureDesc,
};
use meridian_renderer::meridian::shader::{ShaderMacros, ShaderStage};
use meridian_renderer::meridian::Result;
use meridian_renderer::utils::RetireQueue;
use meridian_renderer::{render_bail, render_debug, render_err, render_info, render_warn};
use std::sync::Arc;
use winit::dpi::PhysicalSize;
use winit::window::{Fullscreen, Window};

const SOURCE: &str = "meridian::vulkan";

const RESOURCE_BUFFER_USAGE: vk::BufferUsageFlags = vk::BufferUsageFlags::from_raw(
    vk::BufferUsageFlags::VERTEX_BUFFER.as_raw()
        | vk::BufferUsageFlags::INDEX_BUFFER.as_raw()
        | vk::BufferUsageFlags::UNIFORM_BUFFER.as_raw()
        | vk::BufferUsageFlags::STORAGE_BUFFER.as_raw(),
);

const DEPTH_ATTACHMENT_STATE: LayoutState = LayoutState {
    layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    access: vk::AccessFlags::from_raw(
        vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ.as_raw()
            | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE.as_raw(),
    ),
    stage: vk::PipelineStageFlags::from_raw(
        vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS.as_raw() | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS.as_raw(),
    ),
};

/// Byte offset of every mip level inside a staging buffer, plus its total size
///
/// Offsets are aligned to four texels so every copy region satisfies the
/// texel and 4-byte alignment rules of buffer-to-image copies.
pub fn staging_layout(extents: &[(u32, u32)], pixel_size: u32) -> (Vec<u64>, u64) {
    let align = pixel_size as u64 * 4;
    let mut offsets = Vec::with_capacity(extents.len());
    let mut cursor = 0u64;
    for &(width, height) in extents {
        cursor = cursor.div_ceil(align) * align;
        offsets.push(cursor);
        cursor += width as u64 * height as u64 * pixel_size as u64;
    }
    (offsets, cursor)
}

/// Refresh rate in Hz from a millihertz value, rounded
pub fn hertz(millihertz: u32) -> u32 {
    (millihertz + 500) / 1000
}

fn image_barrier(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    aspect: vk::ImageAspectFlags,
    levels: u32,
    from: LayoutState,
    to: LayoutState,
) {
    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(from.layout)
        .new_layout(to.layout)
        .src_access_mask(from.access)
        .dst_access_mask(to.access)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: aspect,
            base_mip_level: 0,
            level_count: levels,
            base_array_layer: 0,
            layer_count: 1,
        });
    unsafe {
        device.cmd_pipeline_barrier(
            command_buffer,
            from.stage,
            to.stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
}

struct FrameSlot {
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    /// Signaled when the slot's last submission completes
    fence: vk::Fence,
    image_available: vk::Semaphore,
    descriptors: DescriptorAllocator,
}

impl FrameSlot {
    fn new(ctx: &VulkanContext, index: usize) -> Result<Self> {
        let device = &ctx.device;
        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default().queue_family_index(ctx.queue_family);
            let command_pool = device
                .create_command_pool(&pool_info, None)
                .map_err(|e| render_err!(SOURCE, "Failed to create command pool of frame {}: {:?}", index, e))?;

            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let command_buffer = match device.allocate_command_buffers(&alloc_info) {
                Ok(buffers) => buffers[0],
                Err(e) => {
                    device.destroy_command_pool(command_pool, None);
                    return Err(render_err!(SOURCE, "Failed to allocate command buffer of frame {}: {:?}", index, e));
                }
            };

            let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
            let fence = match device.create_fence(&fence_info, None) {
                Ok(fence) => fence,
                Err(e) => {
                    device.destroy_command_pool(command_pool, None);
                    return Err(render_err!(SOURCE, "Failed to create fence of frame {}: {:?}", index, e));
                }
            };
            let image_available = match device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None) {
                Ok(semaphore) => semaphore,
                Err(e) => {
                    device.destroy_fence(fence, None);
                    device.destroy_command_pool(command_pool, None);
                    return Err(render_err!(SOURCE, "Failed to create semaphore of frame {}: {:?}", index, e));
                }
            };

            ctx.set_object_name(command_buffer, &format!("frame {} commands", index));
            Ok(Self { command_pool, command_buffer, fence, image_available, descriptors: DescriptorAllocator::new() })
        }
    }

    /// # Safety
    ///
    /// The slot's fence must have signaled.
    unsafe fn destroy(mut self, device: &ash::Device) {
        self.descriptors.destroy(device);
        device.destroy_semaphore(self.image_available, None);
        device.destroy_fence(self.fence, None);
        device.destroy_command_pool(self.command_pool, None);
    }
}

pub struct VulkanDevice {
    window: Arc<Window>,
    caps: DeviceCaps,
    frames: Vec<FrameSlot>,
    frame_number: u64,
    frame_slot: usize,

    ring: Option<VulkanRingBuffer>,
    garbage: RetireQueue<Garbage>,
    /// Stands in for unused set indices below the last used one
    empty_set_layout: vk::DescriptorSetLayout,

    pipeline_layout: vk::PipelineLayout,
    scissor_test: bool,
    framebuffer_extent: vk::Extent2D,

    // Dropped in this order: the swapchain needs the device alive
    swapchain: Swapchain,
    ctx: VulkanContext,
}

impl VulkanDevice {
    /// Create the instance, device and swapchain for `window`
    ///
    /// # Errors
    ///
    /// `InitializationFailed` if no GPU can render to and present on the window.
    pub fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        config.validate()?;
        let debug = config.debug || cfg!(feature = "vulkan-validation");
        let (ctx, surface) = VulkanContext::new(&*window, debug)?;

        if config.swapchain.fullscreen {
            window.set_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        let size = window.inner_size();
        let (width, height) = if size.width == 0 || size.height == 0 {
            (config.swapchain.width, config.swapchain.height)
        } else {
            (size.width, size.height)
        };
        let swapchain = Swapchain::new(&ctx, surface, width, height, config.swapchain.vsync)?;

        let frames = (0..config.swapchain.num_frames as usize)
            .map(|index| FrameSlot::new(&ctx, index))
            .collect::<Result<Vec<_>>>()?;

        let empty_set_layout = unsafe {
            ctx.device
                .create_descriptor_set_layout(&vk::DescriptorSetLayoutCreateInfo::default(), None)
                .map_err(|e| render_err!(SOURCE, "Failed to create empty descriptor set layout: {:?}", e))?
        };

        let caps = DeviceCaps {
            uniform_buffer_alignment: ctx.limits.min_uniform_buffer_offset_alignment.max(1) as u32,
            storage_buffer_alignment: ctx.limits.min_storage_buffer_offset_alignment.max(1) as u32,
            num_frames: config.swapchain.num_frames,
        };
        render_info!(
            SOURCE,
            "Vulkan device ready: {}x{} swapchain, {} frames in flight",
            swapchain.extent().width,
            swapchain.extent().height,
            caps.num_frames
        );

        Ok(Self {
            window,
            caps,
            frames,
            frame_number: 0,
            frame_slot: 0,
            ring: None,
            garbage: RetireQueue::new(),
            empty_set_layout,
            pipeline_layout: vk::PipelineLayout::null(),
            scissor_test: false,
            framebuffer_extent: vk::Extent2D { width, height },
            swapchain,
            ctx,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    fn retire(&mut self, garbage: Garbage) {
        self.garbage.retire(self.frame_number, garbage);
    }

    fn command_buffer(&self) -> vk::CommandBuffer {
        self.frames[self.frame_slot].command_buffer
    }

    fn full_scissor(&self) -> vk::Rect2D {
        vk::Rect2D { offset: vk::Offset2D { x: 0, y: 0 }, extent: self.framebuffer_extent }
    }

    /// Rebuild the swapchain at the window's current size
    fn recreate_swapchain(&mut self, vsync: bool) -> Result<()> {
        let (width, height) = self.drawable_size();
        if width == 0 || height == 0 {
            render_debug!(SOURCE, "Window has no drawable area, keeping the old swapchain");
            return Ok(());
        }
        self.wait_idle();
        self.swapchain.recreate(width, height, vsync)
    }

    // ===== IMAGES =====

    fn create_image(
        &mut self,
        name: &str,
        width: u32,
        height: u32,
        levels: u32,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
    ) -> Result<(vk::Image, Allocation)> {
        let info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D { width, height, depth: 1 })
            .mip_levels(levels)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        unsafe {
            let image = self
                .ctx
                .device
                .create_image(&info, None)
                .map_err(|e| render_err!(SOURCE, "Failed to create image \"{}\": {:?}", name, e))?;
            let requirements = self.ctx.device.get_image_memory_requirements(image);
            let allocation = match self.ctx.allocate(name, requirements, MemoryLocation::GpuOnly, false) {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.ctx.device.destroy_image(image, None);
                    return Err(e);
                }
            };
            if let Err(e) = self.ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
                self.ctx.free(allocation);
                self.ctx.device.destroy_image(image, None);
                return Err(render_err!(SOURCE, "Failed to bind memory of image \"{}\": {:?}", name, e));
            }
            self.ctx.set_object_name(image, name);
            Ok((image, allocation))
        }
    }

    fn create_view(
        &self,
        image: vk::Image,
        format: vk::Format,
        aspect: vk::ImageAspectFlags,
        levels: u32,
    ) -> Result<vk::ImageView> {
        let info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: levels,
                base_array_layer: 0,
                layer_count: 1,
            });
        unsafe {
            self.ctx
                .device
                .create_image_view(&info, None)
                .map_err(|e| render_err!(SOURCE, "Failed to create image view: {:?}", e))
        }
    }

    /// Copy every mip level of `desc` into `image` and leave it shader-readable
    fn upload_texture(&mut self, desc: &TextureDesc, image: vk::Image) -> Result<()> {
        let pixel_size = desc.format.size_bytes();
        let extents = desc.mip_extents();
        let (offsets, total) = staging_layout(&extents, pixel_size);

        let (staging, mut allocation) = self.ctx.create_buffer(
            &format!("{} staging", desc.name),
            total,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
        )?;
        let Some(mapped) = allocation.mapped_slice_mut() else {
            unsafe { Garbage::Buffer(staging, allocation).destroy(&mut self.ctx) };
            render_bail!(SOURCE, "Staging memory of texture \"{}\" is not host visible", desc.name);
        };
        let mut regions = Vec::with_capacity(extents.len());
        for (level, ((&(width, height), &offset), data)) in extents.iter().zip(&offsets).zip(&desc.mip_data).enumerate()
        {
            let len = (width * height * pixel_size) as usize;
            mapped[offset as usize..offset as usize + len].copy_from_slice(&data[..len]);
            regions.push(
                vk::BufferImageCopy::default()
                    .buffer_offset(offset)
                    .image_subresource(vk::ImageSubresourceLayers {
                        aspect_mask: sampled_aspect_mask(desc.format),
                        mip_level: level as u32,
                        base_array_layer: 0,
                        layer_count: 1,
                    })
                    .image_extent(vk::Extent3D { width, height, depth: 1 }),
            );
        }

        let aspect = sampled_aspect_mask(desc.format);
        let levels = desc.num_mips();
        let result = self.ctx.one_shot(|device, command_buffer| {
            let transfer = layout_state(Layout::TransferDst);
            image_barrier(device, command_buffer, image, aspect, levels, layout_state(Layout::Undefined), transfer);
            unsafe {
                device.cmd_copy_buffer_to_image(
                    command_buffer,
                    staging,
                    image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &regions,
                );
            }
            image_barrier(device, command_buffer, image, aspect, levels, transfer, layout_state(Layout::ShaderRead));
        });
        unsafe { Garbage::Buffer(staging, allocation).destroy(&mut self.ctx) };
        result
    }
}

impl Device for VulkanDevice {
    type Buffer = VulkanBuffer;
    type Texture = VulkanTexture;
    type Sampler = vk::Sampler;
    type RenderTarget = VulkanRenderTarget;
    type RenderPass = vk::RenderPass;
    type Framebuffer = VulkanFramebuffer;
    type Pipeline = VulkanPipeline;
    type Shader = vk::ShaderModule;
    type DescriptorSetLayout = vk::DescriptorSetLayout;

    fn capabilities(&self) -> DeviceCaps {
        self.caps
    }

    // ===== RESOURCES =====

    fn create_buffer(&mut self, data: &[u8]) -> Result<VulkanBuffer> {
        let (buffer, mut allocation) =
            self.ctx.create_buffer("buffer", data.len() as u64, RESOURCE_BUFFER_USAGE, MemoryLocation::CpuToGpu)?;
        match allocation.mapped_slice_mut() {
            Some(mapped) => mapped[..data.len()].copy_from_slice(data),
            None => {
                unsafe { Garbage::Buffer(buffer, allocation).destroy(&mut self.ctx) };
                render_bail!(SOURCE, "Buffer memory of {} bytes is not host visible", data.len());
            }
        }
        Ok(VulkanBuffer { buffer, allocation: Some(allocation) })
    }

    fn delete_buffer(&mut self, buffer: VulkanBuffer) {
        if let Some(allocation) = buffer.allocation {
            self.retire(Garbage::Buffer(buffer.buffer, allocation));
        }
    }

    fn recreate_ring_buffer(&mut self, size: u32) -> Result<()> {
        let (buffer, allocation) =
            self.ctx.create_buffer("ring buffer", size as u64, RESOURCE_BUFFER_USAGE, MemoryLocation::CpuToGpu)?;
        if allocation.mapped_ptr().is_none() {
            unsafe { Garbage::Buffer(buffer, allocation).destroy(&mut self.ctx) };
            render_bail!(SOURCE, "Ring buffer memory is not host visible");
        }
        if let Some(old) = self.ring.replace(VulkanRingBuffer { buffer, allocation, size }) {
            render_debug!(SOURCE, "Ring buffer grown from {} to {} bytes", old.size, size);
            self.retire(Garbage::Buffer(old.buffer, old.allocation));
        }
        Ok(())
    }

    fn ring_buffer(&self) -> VulkanBuffer {
        match &self.ring {
            Some(ring) => VulkanBuffer { buffer: ring.buffer, allocation: None },
            None => panic!("ring buffer used before it was created"),
        }
    }

    fn write_ring_buffer(&mut self, offset: u32, data: &[u8]) {
        match &mut self.ring {
            Some(ring) => ring.write(offset, data),
            None => panic!("ring buffer written before it was created"),
        }
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<VulkanTexture> {
        let format = vk_format(desc.format);
        if !self.ctx.format_supports(format, vk::FormatFeatureFlags::SAMPLED_IMAGE) {
            render_bail!(SOURCE, "Format {} of texture \"{}\" cannot be sampled on this GPU", desc.format, desc.name);
        }
        let levels = desc.num_mips();
        let (image, allocation) = self.create_image(
            desc.name,
            desc.width,
            desc.height,
            levels,
            format,
            vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
        )?;

        let view = match self.create_view(image, format, sampled_aspect_mask(desc.format), levels) {
            Ok(view) => view,
            Err(e) => {
                unsafe { Garbage::Image { image, views: Vec::new(), allocation: Some(allocation) }.destroy(&mut self.ctx) };
                return Err(e);
            }
        };
        if let Err(e) = self.upload_texture(desc, image) {
            unsafe { Garbage::Image { image, views: vec![view], allocation: Some(allocation) }.destroy(&mut self.ctx) };
            return Err(e);
        }
        Ok(VulkanTexture { image, view, allocation: Some(allocation) })
    }

    fn delete_texture(&mut self, texture: VulkanTexture) {
        self.retire(Garbage::Image { image: texture.image, views: vec![texture.view], allocation: texture.allocation });
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<vk::Sampler> {
        let address = address_mode(desc.wrap_mode);
        let info = vk::SamplerCreateInfo::default()
            .mag_filter(filter(desc.mag))
            .min_filter(filter(desc.min))
            .mipmap_mode(mipmap_mode(desc.min))
            .address_mode_u(address)
            .address_mode_v(address)
            .address_mode_w(address)
            .max_lod(vk::LOD_CLAMP_NONE);
        unsafe {
            self.ctx
                .device
                .create_sampler(&info, None)
                .map_err(|e| render_err!(SOURCE, "Failed to create sampler: {:?}", e))
        }
    }

    fn delete_sampler(&mut self, sampler: vk::Sampler) {
        self.retire(Garbage::Sampler(sampler));
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<(VulkanRenderTarget, VulkanTexture)> {
        let format = vk_format(desc.format);
        if !self.ctx.format_supports(format, render_target_features(desc.format)) {
            render_bail!(SOURCE, "Format {} of render target \"{}\" is not renderable", desc.format, desc.name);
        }
        let depth = desc.format.is_depth();
        let attachment_usage = if depth {
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
        } else {
            vk::ImageUsageFlags::COLOR_ATTACHMENT
        };
        let usage = attachment_usage
            | vk::ImageUsageFlags::SAMPLED
            | vk::ImageUsageFlags::TRANSFER_SRC
            | vk::ImageUsageFlags::TRANSFER_DST;
        let (image, allocation) = self.create_image(&desc.name, desc.width, desc.height, 1, format, usage)?;

        let aspect = aspect_mask(desc.format);
        let sampled_aspect = sampled_aspect_mask(desc.format);
        let mut views = Vec::with_capacity(2);
        let created = self.create_view(image, format, aspect, 1).and_then(|view| {
            views.push(view);
            if sampled_aspect != aspect {
                views.push(self.create_view(image, format, sampled_aspect, 1)?);
            }
            if depth {
                self.ctx.one_shot(|device, command_buffer| {
                    image_barrier(
                        device,
                        command_buffer,
                        image,
                        aspect,
                        1,
                        layout_state(Layout::Undefined),
                        DEPTH_ATTACHMENT_STATE,
                    )
                })?;
            }
            Ok(())
        });
        if let Err(e) = created {
            unsafe { Garbage::Image { image, views, allocation: Some(allocation) }.destroy(&mut self.ctx) };
            return Err(e);
        }

        let view = views[0];
        let sampled_view = views.get(1).copied().unwrap_or(view);
        Ok((
            VulkanRenderTarget { image, view, allocation: Some(allocation), aspect },
            VulkanTexture { image, view: sampled_view, allocation: None },
        ))
    }

    fn delete_render_target(&mut self, render_target: VulkanRenderTarget, texture: VulkanTexture) {
        let mut views = vec![render_target.view];
        if texture.view != render_target.view {
            views.push(texture.view);
        }
        self.retire(Garbage::Image { image: render_target.image, views, allocation: render_target.allocation });
    }

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<vk::RenderPass> {
        if desc.color_final_layout == Layout::Undefined {
            render_bail!(SOURCE, "Render pass \"{}\" must leave its color target in a defined layout", desc.name);
        }
        let mut attachments = vec![color_attachment(desc)];
        let color_refs =
            [vk::AttachmentReference { attachment: 0, layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL }];
        let depth_ref =
            vk::AttachmentReference { attachment: 1, layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL };

        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs);
        if desc.has_depth() {
            attachments.push(depth_attachment(desc));
            subpass = subpass.depth_stencil_attachment(&depth_ref);
        }
        let subpasses = [subpass];
        let dependencies = subpass_dependencies();

        let info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);
        let pass = unsafe {
            self.ctx
                .device
                .create_render_pass(&info, None)
                .map_err(|e| render_err!(SOURCE, "Failed to create render pass \"{}\": {:?}", desc.name, e))?
        };
        self.ctx.set_object_name(pass, &desc.name);
        Ok(pass)
    }

    fn delete_render_pass(&mut self, pass: vk::RenderPass) {
        self.retire(Garbage::RenderPass(pass));
    }

    fn create_framebuffer(
        &mut self,
        desc: &FramebufferDesc,
        pass: &RenderPass<vk::RenderPass>,
        color: &RenderTarget<VulkanRenderTarget>,
        depth_stencil: Option<&RenderTarget<VulkanRenderTarget>>,
    ) -> Result<VulkanFramebuffer> {
        let mut attachments = vec![color.native.view];
        attachments.extend(depth_stencil.map(|depth| depth.native.view));

        let info = vk::FramebufferCreateInfo::default()
            .render_pass(pass.native)
            .attachments(&attachments)
            .width(color.width)
            .height(color.height)
            .layers(1);
        let framebuffer = unsafe {
            self.ctx
                .device
                .create_framebuffer(&info, None)
                .map_err(|e| render_err!(SOURCE, "Failed to create framebuffer \"{}\": {:?}", desc.name, e))?
        };
        self.ctx.set_object_name(framebuffer, &desc.name);
        Ok(VulkanFramebuffer { framebuffer, color_image: color.native.image })
    }

    fn delete_framebuffer(&mut self, framebuffer: VulkanFramebuffer) {
        self.retire(Garbage::Framebuffer(framebuffer.framebuffer));
    }

    fn create_descriptor_set_layout(&mut self, entries: &[DescriptorLayout]) -> Result<vk::DescriptorSetLayout> {
        let bindings = layout_bindings(entries);
        let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        unsafe {
            self.ctx
                .device
                .create_descriptor_set_layout(&info, None)
                .map_err(|e| render_err!(SOURCE, "Failed to create descriptor set layout: {:?}", e))
        }
    }

    fn delete_descriptor_set_layout(&mut self, layout: vk::DescriptorSetLayout) {
        self.retire(Garbage::DescriptorSetLayout(layout));
    }

    fn create_shader(
        &mut self,
        name: &str,
        stage: ShaderStage,
        _macros: &ShaderMacros,
        spirv: &[u32],
    ) -> Result<vk::ShaderModule> {
        let info = vk::ShaderModuleCreateInfo::default().code(spirv);
        let module = unsafe {
            self.ctx.device.create_shader_module(&info, None).map_err(|e| {
                render_err!(SOURCE, "Failed to create shader module {}.{}: {:?}", name, stage.extension(), e)
            })?
        };
        self.ctx.set_object_name(module, &format!("{}.{}", name, stage.extension()));
        Ok(module)
    }

    fn delete_shader(&mut self, shader: vk::ShaderModule) {
        self.retire(Garbage::ShaderModule(shader));
    }

    fn create_pipeline(
        &mut self,
        desc: &PipelineDesc,
        vertex: &Shader<vk::ShaderModule>,
        fragment: &Shader<vk::ShaderModule>,
        pass: &RenderPass<vk::RenderPass>,
        layouts: &[Option<&DescriptorSetLayout<vk::DescriptorSetLayout>>],
    ) -> Result<VulkanPipeline> {
        let native_layouts: Vec<_> = layouts.iter().map(|layout| layout.map(|l| l.native)).collect();
        let set_layouts = set_layouts(&native_layouts, self.empty_set_layout);
        let layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
        let layout = unsafe {
            self.ctx
                .device
                .create_pipeline_layout(&layout_info, None)
                .map_err(|e| render_err!(SOURCE, "Failed to create layout of pipeline \"{}\": {:?}", desc.name, e))?
        };

        let stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex.native)
                .name(c"main"),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment.native)
                .name(c"main"),
        ];
        let (bindings, attributes) = vertex_input(desc);
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);
        let input_assembly =
            vk::PipelineInputAssemblyStateCreateInfo::default().topology(vk::PrimitiveTopology::TRIANGLE_LIST);
        let viewport_state = vk::PipelineViewportStateCreateInfo::default().viewport_count(1).scissor_count(1);
        let rasterization_state = rasterization(desc);
        let multisample_state =
            vk::PipelineMultisampleStateCreateInfo::default().rasterization_samples(vk::SampleCountFlags::TYPE_1);
        let depth_stencil_state = depth_stencil(desc);
        let blend_attachments = [blend_attachment(desc)];
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .depth_stencil_state(&depth_stencil_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(pass.native)
            .subpass(0);

        let pipelines =
            unsafe { self.ctx.device.create_graphics_pipelines(vk::PipelineCache::null(), &[info], None) };
        match pipelines {
            Ok(pipelines) => {
                self.ctx.set_object_name(pipelines[0], &desc.name);
                Ok(VulkanPipeline { pipeline: pipelines[0], layout })
            }
            Err((_, e)) => {
                unsafe { self.ctx.device.destroy_pipeline_layout(layout, None) };
                Err(render_err!(SOURCE, "Failed to create pipeline \"{}\": {:?}", desc.name, e))
            }
        }
    }

    fn delete_pipeline(&mut self, pipeline: VulkanPipeline) {
        self.retire(Garbage::Pipeline(pipeline.pipeline, pipeline.layout));
    }

    // ===== FRAME =====

    fn begin_frame(&mut self) -> Result<usize> {
        self.frame_number += 1;
        let slot = (self.frame_number % self.frames.len() as u64) as usize;
        self.frame_slot = slot;

        unsafe {
            let fence = self.frames[slot].fence;
            self.ctx
                .device
                .wait_for_fences(&[fence], true, u64::MAX)
                .map_err(|e| render_err!(SOURCE, "Failed to wait for frame {}: {:?}", slot, e))?;

            let completed = self.frame_number.saturating_sub(self.frames.len() as u64);
            for garbage in self.garbage.release(completed) {
                garbage.destroy(&mut self.ctx);
            }

            let device = &self.ctx.device;
            let frame = &mut self.frames[slot];
            frame.descriptors.reset(device)?;
            device
                .reset_command_pool(frame.command_pool, vk::CommandPoolResetFlags::empty())
                .map_err(|e| render_err!(SOURCE, "Failed to reset command pool: {:?}", e))?;
            let begin_info =
                vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device
                .begin_command_buffer(frame.command_buffer, &begin_info)
                .map_err(|e| render_err!(SOURCE, "Failed to begin command buffer: {:?}", e))?;
        }

        self.pipeline_layout = vk::PipelineLayout::null();
        self.scissor_test = false;
        Ok(slot)
    }

    fn begin_render_pass(
        &mut self,
        pass: &RenderPass<vk::RenderPass>,
        framebuffer: &Framebuffer<VulkanFramebuffer>,
        color_layout: Layout,
    ) {
        let desc = &pass.desc;
        let command_buffer = self.command_buffer();
        if !desc.clear.contains(ClearFlags::COLOR) && color_layout != Layout::ColorAttachment {
            image_barrier(
                &self.ctx.device,
                command_buffer,
                framebuffer.native.color_image,
                vk::ImageAspectFlags::COLOR,
                1,
                layout_state(color_layout),
                layout_state(Layout::ColorAttachment),
            );
        }

        let mut clear_values = vec![vk::ClearValue { color: vk::ClearColorValue { float32: desc.clear_color.to_array() } }];
        if desc.has_depth() {
            clear_values.push(vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
            });
        }
        self.framebuffer_extent = vk::Extent2D { width: framebuffer.width, height: framebuffer.height };
        let render_area = self.full_scissor();

        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(pass.native)
            .framebuffer(framebuffer.native.framebuffer)
            .render_area(render_area)
            .clear_values(&clear_values);
        unsafe {
            let device = &self.ctx.device;
            device.cmd_begin_render_pass(command_buffer, &begin_info, vk::SubpassContents::INLINE);
            device.cmd_set_scissor(command_buffer, 0, &[render_area]);
        }
        self.set_viewport(0, 0, framebuffer.width, framebuffer.height);
    }

    fn end_render_pass(&mut self) {
        unsafe { self.ctx.device.cmd_end_render_pass(self.command_buffer()) };
    }

    fn bind_pipeline(&mut self, pipeline: &Pipeline<VulkanPipeline>) {
        let command_buffer = self.command_buffer();
        self.pipeline_layout = pipeline.native.layout;
        self.scissor_test = pipeline.desc.scissor_test;
        unsafe {
            self.ctx
                .device
                .cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline.native.pipeline);
            if !self.scissor_test {
                self.ctx.device.cmd_set_scissor(command_buffer, 0, &[self.full_scissor()]);
            }
        }
    }

    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        let viewport = vk::Viewport {
            x: x as f32,
            y: y as f32,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        unsafe { self.ctx.device.cmd_set_viewport(self.command_buffer(), 0, &[viewport]) };
    }

    fn set_scissor_rect(&mut self, x: u32, y: u32, width: u32, height: u32) {
        if !self.scissor_test {
            return;
        }
        let rect = vk::Rect2D { offset: vk::Offset2D { x: x as i32, y: y as i32 }, extent: vk::Extent2D { width, height } };
        unsafe { self.ctx.device.cmd_set_scissor(self.command_buffer(), 0, &[rect]) };
    }

    fn bind_index_buffer(&mut self, buffer: &Buffer<VulkanBuffer>, bit16: bool) {
        unsafe {
            self.ctx.device.cmd_bind_index_buffer(
                self.command_buffer(),
                buffer.native.buffer,
                buffer.begin_offset as u64,
                index_type(bit16),
            )
        };
    }

    fn bind_vertex_buffer(&mut self, binding: u32, buffer: &Buffer<VulkanBuffer>) {
        unsafe {
            self.ctx.device.cmd_bind_vertex_buffers(
                self.command_buffer(),
                binding,
                &[buffer.native.buffer],
                &[buffer.begin_offset as u64],
            )
        };
    }

    fn bind_descriptor_set(
        &mut self,
        index: u32,
        layout: &DescriptorSetLayout<vk::DescriptorSetLayout>,
        descriptors: &[BoundDescriptor<'_, Self>],
    ) -> Result<()> {
        let command_buffer = self.command_buffer();
        let device = &self.ctx.device;
        let set = self.frames[self.frame_slot].descriptors.allocate(device, layout.native)?;
        let writes = DescriptorWrites::new(descriptors);
        unsafe {
            device.update_descriptor_sets(&writes.to_vk(set), &[]);
            device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline_layout,
                index,
                &[set],
                &[],
            );
        }
        Ok(())
    }

    fn draw(&mut self, first_vertex: u32, vertex_count: u32) {
        unsafe { self.ctx.device.cmd_draw(self.command_buffer(), vertex_count, 1, first_vertex, 0) };
    }

    fn draw_indexed_instanced(&mut self, vertex_count: u32, instance_count: u32) {
        unsafe { self.ctx.device.cmd_draw_indexed(self.command_buffer(), vertex_count, instance_count, 0, 0, 0) };
    }

    fn draw_indexed_offset(&mut self, vertex_count: u32, first_index: u32) {
        unsafe { self.ctx.device.cmd_draw_indexed(self.command_buffer(), vertex_count, 1, first_index, 0, 0) };
    }

    fn layout_transition(&mut self, render_target: &RenderTarget<VulkanRenderTarget>, from: Layout, to: Layout) {
        if to == Layout::Undefined {
            render_warn!(SOURCE, "Ignoring transition of a render target to {}", to);
            return;
        }
        image_barrier(
            &self.ctx.device,
            self.command_buffer(),
            render_target.native.image,
            render_target.native.aspect,
            1,
            layout_state(from),
            layout_state(to),
        );
    }

    fn blit(&mut self, src: &RenderTarget<VulkanRenderTarget>, dst: &RenderTarget<VulkanRenderTarget>) {
        let layers = |aspect| vk::ImageSubresourceLayers { aspect_mask: aspect, mip_level: 0, base_array_layer: 0, layer_count: 1 };
        let extent = vk::Offset3D { x: src.width as i32, y: src.height as i32, z: 1 };
        let region = vk::ImageBlit {
            src_subresource: layers(src.native.aspect),
            src_offsets: [vk::Offset3D::default(), extent],
            dst_subresource: layers(dst.native.aspect),
            dst_offsets: [vk::Offset3D::default(), extent],
        };
        unsafe {
            self.ctx.device.cmd_blit_image(
                self.command_buffer(),
                src.native.image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst.native.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
                vk::Filter::NEAREST,
            )
        };
    }

    fn present(&mut self, render_target: &mut RenderTarget<VulkanRenderTarget>) -> Result<()> {
        let command_buffer = self.command_buffer();
        let frame_fence = self.frames[self.frame_slot].fence;
        let image_available = self.frames[self.frame_slot].image_available;

        let acquired = match self.swapchain.acquire(image_available) {
            Ok(None) => {
                let vsync = self.swapchain.vsync();
                self.recreate_swapchain(vsync).and_then(|_| self.swapchain.acquire(image_available))
            }
            other => other,
        };
        let image_index = match &acquired {
            Ok(index) => *index,
            Err(_) => None,
        };
        if let Some(index) = image_index {
            self.swapchain.record_present_blit(
                command_buffer,
                render_target.native.image,
                render_target.width,
                render_target.height,
                index,
            );
        }

        let device = &self.ctx.device;
        unsafe {
            device
                .end_command_buffer(command_buffer)
                .map_err(|e| render_err!(SOURCE, "Failed to end command buffer: {:?}", e))?;

            let command_buffers = [command_buffer];
            let wait_semaphores = [image_available];
            let wait_stages = [vk::PipelineStageFlags::TRANSFER];
            let signal_semaphores: Vec<_> = image_index.map(|i| self.swapchain.render_finished(i)).into_iter().collect();
            let mut submit = vk::SubmitInfo::default()
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores);
            if image_index.is_some() {
                submit = submit.wait_semaphores(&wait_semaphores).wait_dst_stage_mask(&wait_stages);
            }

            device
                .reset_fences(&[frame_fence])
                .map_err(|e| render_err!(SOURCE, "Failed to reset frame fence: {:?}", e))?;
            device
                .queue_submit(self.ctx.queue, &[submit], frame_fence)
                .map_err(|e| render_err!(SOURCE, "Failed to submit frame: {:?}", e))?;
        }

        let Some(index) = image_index else {
            return acquired.and_then(|_| {
                render_warn!(SOURCE, "Swapchain still out of date, frame dropped");
                Ok(())
            });
        };
        if !self.swapchain.present(self.ctx.queue, index)? {
            let vsync = self.swapchain.vsync();
            self.recreate_swapchain(vsync)?;
        }
        Ok(())
    }

    // ===== SURFACE =====

    fn set_swapchain_desc(&mut self, old: &SwapchainDesc, new: &SwapchainDesc) -> Result<()> {
        if new.fullscreen != old.fullscreen {
            let mode = new.fullscreen.then_some(Fullscreen::Borderless(None));
            self.window.set_fullscreen(mode);
        } else if !new.fullscreen && (new.width, new.height) != (old.width, old.height) {
            // The size change may be applied asynchronously; the next out-of-date
            // present picks up the final size.
            let _ = self.window.request_inner_size(PhysicalSize::new(new.width, new.height));
        }
        if new.num_frames != old.num_frames {
            render_warn!(SOURCE, "Frames in flight are fixed at device creation ({})", self.frames.len());
        }
        self.recreate_swapchain(new.vsync)
    }

    fn drawable_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn current_refresh_rate(&self) -> u32 {
        self.window
            .current_monitor()
            .and_then(|monitor| monitor.refresh_rate_millihertz())
            .map_or(0, hertz)
    }

    fn max_refresh_rate(&self) -> u32 {
        self.window
            .current_monitor()
            .and_then(|monitor| monitor.video_modes().map(|mode| mode.refresh_rate_millihertz()).max())
            .map_or_else(|| self.current_refresh_rate(), hertz)
    }

    fn is_render_target_format_supported(&self, format: Format) -> bool {
        format != Format::Invalid && self.ctx.format_supports(vk_format(format), render_target_features(format))
    }

    fn wait_idle(&mut self) {
        if let Err(e) = unsafe { self.ctx.device.device_wait_idle() } {
            render_warn!(SOURCE, "Failed to wait for device idle: {:?}", e);
        }
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        self.wait_idle();
        unsafe {
            for garbage in self.garbage.drain() {
                garbage.destroy(&mut self.ctx);
            }
            if let Some(ring) = self.ring.take() {
                Garbage::Buffer(ring.buffer, ring.allocation).destroy(&mut self.ctx);
            }
            for frame in self.frames.drain(..) {
                frame.destroy(&self.ctx.device);
            }
            self.ctx.device.destroy_descriptor_set_layout(self.empty_set_layout, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_device_tests.rs"]
mod tests;
