//! Native objects behind the renderer's handles
//!
//! Deleting an object only queues it as [`Garbage`]; it is destroyed once
//! every frame that could have referenced it has completed.

use crate::vulkan_context::VulkanContext;
use ash::vk;
use gpu_allocator::vulkan::Allocation;

/// Buffer plus its memory; ring-buffer aliases carry no allocation
pub struct VulkanBuffer {
    pub buffer: vk::Buffer,
    pub allocation: Option<Allocation>,
}

pub struct VulkanTexture {
    pub image: vk::Image,
    pub view: vk::ImageView,
    /// `None` when the image belongs to a render target
    pub allocation: Option<Allocation>,
}

pub struct VulkanRenderTarget {
    pub image: vk::Image,
    /// Attachment view covering every aspect of the image
    pub view: vk::ImageView,
    pub allocation: Option<Allocation>,
    pub aspect: vk::ImageAspectFlags,
}

pub struct VulkanFramebuffer {
    pub framebuffer: vk::Framebuffer,
    pub color_image: vk::Image,
}

pub struct VulkanPipeline {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
}

/// Ring buffer for ephemeral data, persistently mapped
pub struct VulkanRingBuffer {
    pub buffer: vk::Buffer,
    pub allocation: Allocation,
    pub size: u32,
}

impl VulkanRingBuffer {
    pub fn write(&mut self, offset: u32, data: &[u8]) {
        let start = offset as usize;
        match self.allocation.mapped_slice_mut() {
            Some(mapped) => mapped[start..start + data.len()].copy_from_slice(data),
            None => panic!("ring buffer memory is not host mapped"),
        }
    }
}

pub enum Garbage {
    Buffer(vk::Buffer, Allocation),
    Image { image: vk::Image, views: Vec<vk::ImageView>, allocation: Option<Allocation> },
    Sampler(vk::Sampler),
    RenderPass(vk::RenderPass),
    Framebuffer(vk::Framebuffer),
    Pipeline(vk::Pipeline, vk::PipelineLayout),
    ShaderModule(vk::ShaderModule),
    DescriptorSetLayout(vk::DescriptorSetLayout),
}

impl Garbage {
    /// # Safety
    ///
    /// No pending GPU work may reference the object.
    pub unsafe fn destroy(self, ctx: &mut VulkanContext) {
        let device = ctx.device.clone();
        match self {
            Garbage::Buffer(buffer, allocation) => {
                ctx.free(allocation);
                device.destroy_buffer(buffer, None);
            }
            Garbage::Image { image, views, allocation } => {
                for view in views {
                    device.destroy_image_view(view, None);
                }
                if let Some(allocation) = allocation {
                    ctx.free(allocation);
                    device.destroy_image(image, None);
                }
            }
            Garbage::Sampler(sampler) => device.destroy_sampler(sampler, None),
            Garbage::RenderPass(pass) => device.destroy_render_pass(pass, None),
            Garbage::Framebuffer(framebuffer) => device.destroy_framebuffer(framebuffer, None),
            Garbage::Pipeline(pipeline, layout) => {
                device.destroy_pipeline(pipeline, None);
                device.destroy_pipeline_layout(layout, None);
            }
            Garbage::ShaderModule(module) => device.destroy_shader_module(module, None),
            Garbage::DescriptorSetLayout(layout) => device.destroy_descriptor_set_layout(layout, None),
        }
    }
}
