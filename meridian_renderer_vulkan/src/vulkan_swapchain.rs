//! Window swapchain
//!
//! Swapchain images are only ever blit destinations: `present` copies a
//! render target into the acquired image and hands it to the presentation
//! engine. Surface formats are picked UNORM first, so presented bytes match
//! what the immediate-mode backend shows.

use crate::vulkan_context::VulkanContext;
use ash::vk;
use meridian_renderer::meridian::{Error, Result};
use meridian_renderer::{render_debug, render_err, render_error};

const SOURCE: &str = "meridian::vulkan";

const PREFERRED_FORMATS: [vk::Format; 4] = [
    vk::Format::B8G8R8A8_UNORM,
    vk::Format::R8G8B8A8_UNORM,
    vk::Format::B8G8R8A8_SRGB,
    vk::Format::R8G8B8A8_SRGB,
];

pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    PREFERRED_FORMATS
        .iter()
        .find_map(|&wanted| formats.iter().find(|f| f.format == wanted))
        .or(formats.first())
        .copied()
}

/// FIFO is the only mode every driver supports and the only vsynced one
pub fn choose_present_mode(vsync: bool, available: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|mode| available.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: width.clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
        height: height.clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
    }
}

/// One image more than the minimum, capped by the maximum (0 = unbounded)
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

pub struct Swapchain {
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
    loader: ash::khr::swapchain::Device,

    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    surface_format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    vsync: bool,
    /// One per swapchain image, signaled by the submit that writes the image
    render_finished: Vec<vk::Semaphore>,
}

impl Swapchain {
    pub fn new(ctx: &VulkanContext, surface: vk::SurfaceKHR, width: u32, height: u32, vsync: bool) -> Result<Self> {
        let surface_loader = ash::khr::surface::Instance::new(&ctx.entry, &ctx.instance);
        let surface_formats = unsafe {
            surface_loader
                .get_physical_device_surface_formats(ctx.physical_device, surface)
                .map_err(|e| init_failed("Failed to query surface formats", e))?
        };
        let surface_format = choose_surface_format(&surface_formats)
            .ok_or_else(|| init_failed("Surface reports no formats", vk::Result::ERROR_FORMAT_NOT_SUPPORTED))?;

        let mut swapchain = Self {
            device: ctx.device.clone(),
            physical_device: ctx.physical_device,
            surface,
            surface_loader,
            loader: ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device),
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            surface_format,
            extent: vk::Extent2D { width, height },
            vsync,
            render_finished: Vec::new(),
        };
        swapchain.recreate(width, height, vsync)?;
        Ok(swapchain)
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn vsync(&self) -> bool {
        self.vsync
    }

    pub fn render_finished(&self, image_index: u32) -> vk::Semaphore {
        self.render_finished[image_index as usize]
    }

    /// Rebuild the swapchain for a new size or present mode
    ///
    /// The caller must make sure no submitted work still uses the old images.
    pub fn recreate(&mut self, width: u32, height: u32, vsync: bool) -> Result<()> {
        unsafe {
            let capabilities = self
                .surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)
                .map_err(|e| init_failed("Failed to get surface capabilities", e))?;
            let present_modes = self
                .surface_loader
                .get_physical_device_surface_present_modes(self.physical_device, self.surface)
                .map_err(|e| init_failed("Failed to get surface present modes", e))?;

            let extent = choose_extent(&capabilities, width, height);
            let present_mode = choose_present_mode(vsync, &present_modes);
            let old_swapchain = self.swapchain;

            let create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(choose_image_count(&capabilities))
                .image_format(self.surface_format.format)
                .image_color_space(self.surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::TRANSFER_DST)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(present_mode)
                .clipped(true)
                .old_swapchain(old_swapchain);

            let swapchain = self
                .loader
                .create_swapchain(&create_info, None)
                .map_err(|e| init_failed("Failed to create swapchain", e))?;
            if old_swapchain != vk::SwapchainKHR::null() {
                self.loader.destroy_swapchain(old_swapchain, None);
            }
            self.swapchain = swapchain;
            self.images = self
                .loader
                .get_swapchain_images(swapchain)
                .map_err(|e| init_failed("Failed to get swapchain images", e))?;
            self.extent = extent;
            self.vsync = vsync;

            for semaphore in self.render_finished.drain(..) {
                self.device.destroy_semaphore(semaphore, None);
            }
            for _ in 0..self.images.len() {
                let semaphore = self
                    .device
                    .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                    .map_err(|e| init_failed("Failed to create render-finished semaphore", e))?;
                self.render_finished.push(semaphore);
            }

            render_debug!(
                SOURCE,
                "Swapchain {}x{}, {} images, {:?}, {:?}",
                extent.width,
                extent.height,
                self.images.len(),
                self.surface_format.format,
                present_mode
            );
            Ok(())
        }
    }

    /// Index of the next image, or `None` when the swapchain is out of date
    pub fn acquire(&mut self, signal: vk::Semaphore) -> Result<Option<u32>> {
        let result = unsafe { self.loader.acquire_next_image(self.swapchain, u64::MAX, signal, vk::Fence::null()) };
        match result {
            Ok((index, _suboptimal)) => Ok(Some(index)),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(None),
            Err(e) => Err(render_err!(SOURCE, "Failed to acquire next swapchain image: {:?}", e)),
        }
    }

    /// Record the copy of `src` (in TRANSFER_SRC_OPTIMAL) into swapchain image `image_index`
    pub fn record_present_blit(
        &self,
        command_buffer: vk::CommandBuffer,
        src: vk::Image,
        src_width: u32,
        src_height: u32,
        image_index: u32,
    ) {
        let dst = self.images[image_index as usize];
        let range = color_range();
        unsafe {
            let to_transfer = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(dst)
                .subresource_range(range)
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);
            self.device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_transfer],
            );

            let layers = vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            };
            let region = vk::ImageBlit {
                src_subresource: layers,
                src_offsets: [
                    vk::Offset3D { x: 0, y: 0, z: 0 },
                    vk::Offset3D { x: src_width as i32, y: src_height as i32, z: 1 },
                ],
                dst_subresource: layers,
                dst_offsets: [
                    vk::Offset3D { x: 0, y: 0, z: 0 },
                    vk::Offset3D { x: self.extent.width as i32, y: self.extent.height as i32, z: 1 },
                ],
            };
            self.device.cmd_blit_image(
                command_buffer,
                src,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
                vk::Filter::LINEAR,
            );

            let to_present = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(dst)
                .subresource_range(range)
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::empty());
            self.device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::BOTTOM_OF_PIPE,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_present],
            );
        }
    }

    /// Queue `image_index` for presentation; `Ok(false)` when the swapchain must be rebuilt
    pub fn present(&self, queue: vk::Queue, image_index: u32) -> Result<bool> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [self.render_finished(image_index)];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { self.loader.queue_present(queue, &present_info) } {
            Ok(false) => Ok(true),
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(false),
            Err(e) => Err(render_err!(SOURCE, "Failed to present swapchain image: {:?}", e)),
        }
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();
            for &semaphore in &self.render_finished {
                self.device.destroy_semaphore(semaphore, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

pub(crate) fn color_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

fn init_failed(what: &str, e: vk::Result) -> Error {
    render_error!(SOURCE, "{}: {:?}", what, e);
    Error::InitializationFailed(format!("{}: {:?}", what, e))
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
