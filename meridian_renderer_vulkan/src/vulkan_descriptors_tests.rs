use super::*;
use crate::vulkan_resources::{VulkanBuffer, VulkanTexture};
use ash::vk::Handle;
use meridian_renderer::meridian::render::DescriptorType;

#[test]
fn test_layout_bindings_use_position_or_explicit_binding() {
    let entries = [
        DescriptorLayout::new(DescriptorType::UniformBuffer, 0),
        DescriptorLayout::new(DescriptorType::Texture, 8).at_binding(5),
        DescriptorLayout::new(DescriptorType::StorageBuffer, 16),
    ];
    let bindings = layout_bindings(&entries);

    let summary: Vec<_> = bindings.iter().map(|b| (b.binding, b.descriptor_type, b.descriptor_count)).collect();
    assert_eq!(
        summary,
        vec![
            (0, vk::DescriptorType::UNIFORM_BUFFER, 1),
            (5, vk::DescriptorType::SAMPLED_IMAGE, 1),
            (2, vk::DescriptorType::STORAGE_BUFFER, 1),
        ]
    );
    assert!(bindings
        .iter()
        .all(|b| b.stage_flags == vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT));
}

#[test]
fn test_combined_sampler_splits_into_image_and_sampler_bindings() {
    let entries = [
        DescriptorLayout::new(DescriptorType::UniformBuffer, 0),
        DescriptorLayout::new(DescriptorType::CombinedSampler, 8),
        DescriptorLayout::new(DescriptorType::CombinedSampler, 24).at_binding(4).with_sampler_binding(9),
    ];
    let summary: Vec<_> = layout_bindings(&entries).iter().map(|b| (b.binding, b.descriptor_type)).collect();
    assert_eq!(
        summary,
        vec![
            (0, vk::DescriptorType::UNIFORM_BUFFER),
            (1, vk::DescriptorType::SAMPLED_IMAGE),
            (2, vk::DescriptorType::SAMPLER),
            (4, vk::DescriptorType::SAMPLED_IMAGE),
            (9, vk::DescriptorType::SAMPLER),
        ]
    );
    assert!(!summary.iter().any(|(_, ty)| *ty == vk::DescriptorType::COMBINED_IMAGE_SAMPLER));
}

#[test]
fn test_descriptor_writes_plan() {
    let buffer = VulkanBuffer { buffer: vk::Buffer::from_raw(7), allocation: None };
    let texture = VulkanTexture { image: vk::Image::from_raw(1), view: vk::ImageView::from_raw(2), allocation: None };
    let sampler = vk::Sampler::from_raw(3);

    let descriptors = [
        BoundDescriptor::UniformBuffer { binding: 0, buffer: &buffer, offset: 256, size: 64 },
        BoundDescriptor::CombinedSampler { binding: 1, sampler_binding: 2, texture: &texture, sampler: &sampler },
        BoundDescriptor::Sampler { binding: 3, sampler: &sampler },
        BoundDescriptor::StorageBuffer { binding: 4, buffer: &buffer, offset: 0, size: 16 },
    ];
    let plan = DescriptorWrites::new(&descriptors);

    assert_eq!(
        plan.writes,
        vec![
            (0, vk::DescriptorType::UNIFORM_BUFFER, WriteSource::Buffer(0)),
            (1, vk::DescriptorType::SAMPLED_IMAGE, WriteSource::Image(0)),
            (2, vk::DescriptorType::SAMPLER, WriteSource::Image(1)),
            (3, vk::DescriptorType::SAMPLER, WriteSource::Image(2)),
            (4, vk::DescriptorType::STORAGE_BUFFER, WriteSource::Buffer(1)),
        ]
    );
    assert_eq!(plan.buffers[0].offset, 256);
    assert_eq!(plan.buffers[0].range, 64);
    assert_eq!(plan.buffers[1].buffer.as_raw(), 7);
    assert_eq!(plan.images[0].image_view.as_raw(), 2);
    assert_eq!(plan.images[0].image_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    assert_eq!(plan.images[0].sampler, vk::Sampler::null());
    assert_eq!(plan.images[1].sampler.as_raw(), 3);
    assert_eq!(plan.images[1].image_view, vk::ImageView::null());

    let writes = plan.to_vk(vk::DescriptorSet::from_raw(9));
    assert_eq!(writes.len(), 5);
    assert!(writes.iter().all(|w| w.descriptor_count == 1 && w.dst_set.as_raw() == 9));
}
