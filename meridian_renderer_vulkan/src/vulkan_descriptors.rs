//! Descriptor-set layouts, per-frame pools and descriptor writes
//!
//! Sets are allocated fresh for every `bind_descriptor_set` from the pools of
//! the current frame slot; the pools are reset when the slot comes around
//! again, so individual sets are never freed.
//!
//! Shaders only ever see separate images and samplers, so a combined entry
//! becomes a `SAMPLED_IMAGE` binding plus a `SAMPLER` binding.

use crate::vulkan_device::VulkanDevice;
use crate::vulkan_format::descriptor_type;
use ash::vk;
use meridian_renderer::meridian::render::descriptor_set::native_slots;
use meridian_renderer::meridian::render::{BoundDescriptor, DescriptorLayout};
use meridian_renderer::meridian::Result;
use meridian_renderer::render_err;

const SOURCE: &str = "meridian::vulkan";

const SETS_PER_POOL: u32 = 256;

/// Bindings of a descriptor-set layout, visible to both graphics stages
pub fn layout_bindings(entries: &[DescriptorLayout]) -> Vec<vk::DescriptorSetLayoutBinding<'static>> {
    native_slots(entries)
        .into_iter()
        .filter_map(|(binding, ty)| {
            let ty = descriptor_type(ty)?;
            Some(
                vk::DescriptorSetLayoutBinding::default()
                    .binding(binding)
                    .descriptor_type(ty)
                    .descriptor_count(1)
                    .stage_flags(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT),
            )
        })
        .collect()
}

pub struct DescriptorAllocator {
    pools: Vec<vk::DescriptorPool>,
    current: usize,
}

impl DescriptorAllocator {
    pub fn new() -> Self {
        Self { pools: Vec::new(), current: 0 }
    }

    fn create_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
        let pool_sizes = [
            (vk::DescriptorType::UNIFORM_BUFFER, 2),
            (vk::DescriptorType::STORAGE_BUFFER, 1),
            (vk::DescriptorType::SAMPLER, 4),
            (vk::DescriptorType::SAMPLED_IMAGE, 4),
        ]
        .map(|(ty, per_set)| vk::DescriptorPoolSize { ty, descriptor_count: per_set * SETS_PER_POOL });
        let info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&pool_sizes)
            .max_sets(SETS_PER_POOL);
        unsafe {
            device
                .create_descriptor_pool(&info, None)
                .map_err(|e| render_err!(SOURCE, "Failed to create descriptor pool: {:?}", e))
        }
    }

    /// Allocate a set, moving on to (or creating) the next pool when one is exhausted
    pub fn allocate(&mut self, device: &ash::Device, layout: vk::DescriptorSetLayout) -> Result<vk::DescriptorSet> {
        let layouts = [layout];
        loop {
            let fresh = self.current == self.pools.len();
            if fresh {
                self.pools.push(Self::create_pool(device)?);
            }
            let info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(self.pools[self.current])
                .set_layouts(&layouts);
            match unsafe { device.allocate_descriptor_sets(&info) } {
                Ok(sets) => return Ok(sets[0]),
                Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY) | Err(vk::Result::ERROR_FRAGMENTED_POOL) if !fresh => {
                    self.current += 1;
                }
                Err(e) => return Err(render_err!(SOURCE, "Failed to allocate descriptor set: {:?}", e)),
            }
        }
    }

    /// Recycle every set; only legal once the GPU is done with them
    pub fn reset(&mut self, device: &ash::Device) -> Result<()> {
        for &pool in &self.pools[..(self.current + 1).min(self.pools.len())] {
            unsafe {
                device
                    .reset_descriptor_pool(pool, vk::DescriptorPoolResetFlags::empty())
                    .map_err(|e| render_err!(SOURCE, "Failed to reset descriptor pool: {:?}", e))?;
            }
        }
        self.current = 0;
        Ok(())
    }

    /// # Safety
    ///
    /// No pending GPU work may use sets from these pools.
    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        for pool in self.pools.drain(..) {
            device.destroy_descriptor_pool(pool, None);
        }
        self.current = 0;
    }
}

impl Default for DescriptorAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a write's payload lives in [`DescriptorWrites`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteSource {
    Buffer(usize),
    Image(usize),
}

/// Descriptor payloads for one set, ready to be turned into `VkWriteDescriptorSet`s
#[derive(Default)]
pub struct DescriptorWrites {
    pub buffers: Vec<vk::DescriptorBufferInfo>,
    pub images: Vec<vk::DescriptorImageInfo>,
    pub writes: Vec<(u32, vk::DescriptorType, WriteSource)>,
}

impl DescriptorWrites {
    pub fn new(descriptors: &[BoundDescriptor<'_, VulkanDevice>]) -> Self {
        let mut out = Self::default();
        for descriptor in descriptors {
            match *descriptor {
                BoundDescriptor::UniformBuffer { binding, buffer, offset, size } => {
                    out.push_buffer(binding, vk::DescriptorType::UNIFORM_BUFFER, buffer.buffer, offset, size)
                }
                BoundDescriptor::StorageBuffer { binding, buffer, offset, size } => {
                    out.push_buffer(binding, vk::DescriptorType::STORAGE_BUFFER, buffer.buffer, offset, size)
                }
                BoundDescriptor::Sampler { binding, sampler } => out.push_image(
                    binding,
                    vk::DescriptorType::SAMPLER,
                    vk::DescriptorImageInfo::default().sampler(*sampler),
                ),
                BoundDescriptor::Texture { binding, texture } => out.push_image(
                    binding,
                    vk::DescriptorType::SAMPLED_IMAGE,
                    vk::DescriptorImageInfo::default()
                        .image_view(texture.view)
                        .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
                ),
                BoundDescriptor::CombinedSampler { binding, sampler_binding, texture, sampler } => {
                    out.push_image(
                        binding,
                        vk::DescriptorType::SAMPLED_IMAGE,
                        vk::DescriptorImageInfo::default()
                            .image_view(texture.view)
                            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
                    );
                    out.push_image(
                        sampler_binding,
                        vk::DescriptorType::SAMPLER,
                        vk::DescriptorImageInfo::default().sampler(*sampler),
                    );
                }
            }
        }
        out
    }

    fn push_buffer(&mut self, binding: u32, ty: vk::DescriptorType, buffer: vk::Buffer, offset: u32, size: u32) {
        self.writes.push((binding, ty, WriteSource::Buffer(self.buffers.len())));
        self.buffers.push(vk::DescriptorBufferInfo { buffer, offset: offset as u64, range: size as u64 });
    }

    fn push_image(&mut self, binding: u32, ty: vk::DescriptorType, info: vk::DescriptorImageInfo) {
        self.writes.push((binding, ty, WriteSource::Image(self.images.len())));
        self.images.push(info);
    }

    pub fn to_vk(&self, set: vk::DescriptorSet) -> Vec<vk::WriteDescriptorSet<'_>> {
        self.writes
            .iter()
            .map(|&(binding, ty, source)| {
                let write = vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(binding)
                    .descriptor_type(ty);
                match source {
                    WriteSource::Buffer(i) => write.buffer_info(std::slice::from_ref(&self.buffers[i])),
                    WriteSource::Image(i) => write.image_info(std::slice::from_ref(&self.images[i])),
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "vulkan_descriptors_tests.rs"]
mod tests;
