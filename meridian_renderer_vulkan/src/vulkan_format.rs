//! Translation of backend-neutral enums to Vulkan

use ash::vk;
use meridian_renderer::meridian::render::{DescriptorType, FilterMode, Format, Layout, VertexFormat, WrapMode};

pub fn vk_format(format: Format) -> vk::Format {
    match format {
        Format::Invalid => vk::Format::UNDEFINED,
        Format::R8 => vk::Format::R8_UNORM,
        Format::RG8 => vk::Format::R8G8_UNORM,
        Format::RGB8 => vk::Format::R8G8B8_UNORM,
        Format::RGBA8 => vk::Format::R8G8B8A8_UNORM,
        Format::sRGBA8 => vk::Format::R8G8B8A8_SRGB,
        Format::RG16Float => vk::Format::R16G16_SFLOAT,
        Format::RGBA16Float => vk::Format::R16G16B16A16_SFLOAT,
        Format::RGBA32Float => vk::Format::R32G32B32A32_SFLOAT,
        Format::Depth16 => vk::Format::D16_UNORM,
        Format::Depth16S8 => vk::Format::D16_UNORM_S8_UINT,
        Format::Depth24S8 => vk::Format::D24_UNORM_S8_UINT,
        Format::Depth24X8 => vk::Format::X8_D24_UNORM_PACK32,
        Format::Depth32Float => vk::Format::D32_SFLOAT,
    }
}

pub fn has_stencil(format: Format) -> bool {
    matches!(format, Format::Depth16S8 | Format::Depth24S8)
}

/// Every aspect of an image of `format` (attachment views, barriers, blits)
pub fn aspect_mask(format: Format) -> vk::ImageAspectFlags {
    if has_stencil(format) {
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    } else if format.is_depth() {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

/// Aspect a shader samples; combined depth/stencil images expose depth only
pub fn sampled_aspect_mask(format: Format) -> vk::ImageAspectFlags {
    if format.is_depth() {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

/// Native layout plus the access and stages that use an image in it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutState {
    pub layout: vk::ImageLayout,
    pub access: vk::AccessFlags,
    pub stage: vk::PipelineStageFlags,
}

pub fn layout_state(layout: Layout) -> LayoutState {
    let (layout, access, stage) = match layout {
        Layout::Undefined => (
            vk::ImageLayout::UNDEFINED,
            vk::AccessFlags::empty(),
            vk::PipelineStageFlags::TOP_OF_PIPE,
        ),
        Layout::ShaderRead => (
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        Layout::TransferSrc => (
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            vk::AccessFlags::TRANSFER_READ,
            vk::PipelineStageFlags::TRANSFER,
        ),
        Layout::TransferDst => (
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TRANSFER,
        ),
        Layout::ColorAttachment => (
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        ),
    };
    LayoutState { layout, access, stage }
}

pub fn filter(mode: FilterMode) -> vk::Filter {
    match mode {
        FilterMode::Nearest => vk::Filter::NEAREST,
        FilterMode::Linear => vk::Filter::LINEAR,
    }
}

pub fn mipmap_mode(mode: FilterMode) -> vk::SamplerMipmapMode {
    match mode {
        FilterMode::Nearest => vk::SamplerMipmapMode::NEAREST,
        FilterMode::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

pub fn address_mode(mode: WrapMode) -> vk::SamplerAddressMode {
    match mode {
        WrapMode::Clamp => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        WrapMode::Wrap => vk::SamplerAddressMode::REPEAT,
    }
}

/// Attribute format for `count` components; `UNDEFINED` outside 1..=4
pub fn vertex_format(format: VertexFormat, count: u32) -> vk::Format {
    match (format, count) {
        (VertexFormat::Float, 1) => vk::Format::R32_SFLOAT,
        (VertexFormat::Float, 2) => vk::Format::R32G32_SFLOAT,
        (VertexFormat::Float, 3) => vk::Format::R32G32B32_SFLOAT,
        (VertexFormat::Float, 4) => vk::Format::R32G32B32A32_SFLOAT,
        (VertexFormat::UNorm8, 1) => vk::Format::R8_UNORM,
        (VertexFormat::UNorm8, 2) => vk::Format::R8G8_UNORM,
        (VertexFormat::UNorm8, 3) => vk::Format::R8G8B8_UNORM,
        (VertexFormat::UNorm8, 4) => vk::Format::R8G8B8A8_UNORM,
        _ => vk::Format::UNDEFINED,
    }
}

/// Native type of one layout slot; a combined entry's texture slot is a
/// plain sampled image with the sampler on a slot of its own
pub fn descriptor_type(ty: DescriptorType) -> Option<vk::DescriptorType> {
    match ty {
        DescriptorType::End => None,
        DescriptorType::UniformBuffer => Some(vk::DescriptorType::UNIFORM_BUFFER),
        DescriptorType::StorageBuffer => Some(vk::DescriptorType::STORAGE_BUFFER),
        DescriptorType::Sampler => Some(vk::DescriptorType::SAMPLER),
        DescriptorType::Texture => Some(vk::DescriptorType::SAMPLED_IMAGE),
        DescriptorType::CombinedSampler => Some(vk::DescriptorType::SAMPLED_IMAGE),
    }
}

pub fn index_type(bit16: bool) -> vk::IndexType {
    if bit16 {
        vk::IndexType::UINT16
    } else {
        vk::IndexType::UINT32
    }
}

/// Features an image of `format` needs to serve as a sampled render target
pub fn render_target_features(format: Format) -> vk::FormatFeatureFlags {
    let attachment = if format.is_depth() {
        vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT
    } else {
        vk::FormatFeatureFlags::COLOR_ATTACHMENT
    };
    attachment | vk::FormatFeatureFlags::SAMPLED_IMAGE
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
