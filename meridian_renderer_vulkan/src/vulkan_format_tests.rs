//! Unit tests for Vulkan enum translation
//!
//! Pure mapping functions, no GPU required.

use super::*;

// ============================================================================
// TEXTURE FORMATS
// ============================================================================

#[test]
fn test_color_formats() {
    assert_eq!(vk_format(Format::R8), vk::Format::R8_UNORM);
    assert_eq!(vk_format(Format::RG8), vk::Format::R8G8_UNORM);
    assert_eq!(vk_format(Format::RGBA8), vk::Format::R8G8B8A8_UNORM);
    assert_eq!(vk_format(Format::sRGBA8), vk::Format::R8G8B8A8_SRGB);
    assert_eq!(vk_format(Format::RG16Float), vk::Format::R16G16_SFLOAT);
    assert_eq!(vk_format(Format::RGBA32Float), vk::Format::R32G32B32A32_SFLOAT);
}

#[test]
fn test_depth_formats() {
    assert_eq!(vk_format(Format::Depth16), vk::Format::D16_UNORM);
    assert_eq!(vk_format(Format::Depth24S8), vk::Format::D24_UNORM_S8_UINT);
    assert_eq!(vk_format(Format::Depth24X8), vk::Format::X8_D24_UNORM_PACK32);
    assert_eq!(vk_format(Format::Depth32Float), vk::Format::D32_SFLOAT);
}

#[test]
fn test_every_valid_format_has_a_native_equivalent() {
    for format in Format::ALL {
        assert_ne!(vk_format(format), vk::Format::UNDEFINED, "{}", format);
    }
    assert_eq!(vk_format(Format::Invalid), vk::Format::UNDEFINED);
}

#[test]
fn test_aspect_masks() {
    assert_eq!(aspect_mask(Format::RGBA8), vk::ImageAspectFlags::COLOR);
    assert_eq!(aspect_mask(Format::Depth32Float), vk::ImageAspectFlags::DEPTH);
    assert_eq!(
        aspect_mask(Format::Depth24S8),
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    );
    assert_eq!(sampled_aspect_mask(Format::Depth24S8), vk::ImageAspectFlags::DEPTH);
    assert_eq!(sampled_aspect_mask(Format::sRGBA8), vk::ImageAspectFlags::COLOR);
}

// ============================================================================
// LAYOUTS
// ============================================================================

#[test]
fn test_layout_states() {
    let undefined = layout_state(Layout::Undefined);
    assert_eq!(undefined.layout, vk::ImageLayout::UNDEFINED);
    assert!(undefined.access.is_empty());

    let read = layout_state(Layout::ShaderRead);
    assert_eq!(read.layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    assert_eq!(read.stage, vk::PipelineStageFlags::FRAGMENT_SHADER);

    assert_eq!(layout_state(Layout::TransferSrc).access, vk::AccessFlags::TRANSFER_READ);
    assert_eq!(layout_state(Layout::TransferDst).access, vk::AccessFlags::TRANSFER_WRITE);
    assert_eq!(
        layout_state(Layout::ColorAttachment).stage,
        vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
    );
}

// ============================================================================
// SAMPLERS, VERTICES, DESCRIPTORS
// ============================================================================

#[test]
fn test_sampler_modes() {
    assert_eq!(filter(FilterMode::Linear), vk::Filter::LINEAR);
    assert_eq!(mipmap_mode(FilterMode::Nearest), vk::SamplerMipmapMode::NEAREST);
    assert_eq!(address_mode(WrapMode::Clamp), vk::SamplerAddressMode::CLAMP_TO_EDGE);
    assert_eq!(address_mode(WrapMode::Wrap), vk::SamplerAddressMode::REPEAT);
}

#[test]
fn test_vertex_formats() {
    assert_eq!(vertex_format(VertexFormat::Float, 2), vk::Format::R32G32_SFLOAT);
    assert_eq!(vertex_format(VertexFormat::Float, 4), vk::Format::R32G32B32A32_SFLOAT);
    assert_eq!(vertex_format(VertexFormat::UNorm8, 4), vk::Format::R8G8B8A8_UNORM);
    assert_eq!(vertex_format(VertexFormat::Float, 5), vk::Format::UNDEFINED);
}

#[test]
fn test_descriptor_types() {
    assert_eq!(descriptor_type(DescriptorType::End), None);
    assert_eq!(descriptor_type(DescriptorType::UniformBuffer), Some(vk::DescriptorType::UNIFORM_BUFFER));
    assert_eq!(descriptor_type(DescriptorType::Texture), Some(vk::DescriptorType::SAMPLED_IMAGE));
    assert_eq!(descriptor_type(DescriptorType::CombinedSampler), Some(vk::DescriptorType::SAMPLED_IMAGE));
}

#[test]
fn test_index_types() {
    assert_eq!(index_type(true), vk::IndexType::UINT16);
    assert_eq!(index_type(false), vk::IndexType::UINT32);
}

#[test]
fn test_render_target_features() {
    assert!(render_target_features(Format::RGBA8).contains(vk::FormatFeatureFlags::COLOR_ATTACHMENT));
    assert!(render_target_features(Format::Depth32Float).contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT));
    assert!(render_target_features(Format::Depth32Float).contains(vk::FormatFeatureFlags::SAMPLED_IMAGE));
}
