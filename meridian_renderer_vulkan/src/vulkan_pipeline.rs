//! Render-pass attachments and fixed-function pipeline state
//!
//! Plain builders over the backend-neutral descriptors; the device turns
//! their output into native objects.

use crate::vulkan_format::{has_stencil, layout_state, vertex_format, vk_format};
use ash::vk;
use meridian_renderer::meridian::render::{ClearFlags, PipelineDesc, RenderPassDesc};

// ============================================================================
// RENDER PASS
// ============================================================================

/// Color attachment: cleared passes start from UNDEFINED, loading passes
/// expect the target in COLOR_ATTACHMENT_OPTIMAL
pub fn color_attachment(desc: &RenderPassDesc) -> vk::AttachmentDescription {
    let clear = desc.clear.contains(ClearFlags::COLOR);
    vk::AttachmentDescription::default()
        .format(vk_format(desc.color_format))
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(if clear { vk::AttachmentLoadOp::CLEAR } else { vk::AttachmentLoadOp::LOAD })
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(if clear {
            vk::ImageLayout::UNDEFINED
        } else {
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
        })
        .final_layout(layout_state(desc.color_final_layout).layout)
}

/// Depth attachment; depth targets live in DEPTH_STENCIL_ATTACHMENT_OPTIMAL
pub fn depth_attachment(desc: &RenderPassDesc) -> vk::AttachmentDescription {
    let format = desc.depth_stencil_format;
    let stencil = has_stencil(format);
    let clear_depth = desc.clear.contains(ClearFlags::DEPTH);
    let clear_stencil = desc.clear.contains(ClearFlags::STENCIL);

    let load = |clear: bool| if clear { vk::AttachmentLoadOp::CLEAR } else { vk::AttachmentLoadOp::LOAD };
    let (stencil_load_op, stencil_store_op) = if stencil {
        (load(clear_stencil), vk::AttachmentStoreOp::STORE)
    } else {
        (vk::AttachmentLoadOp::DONT_CARE, vk::AttachmentStoreOp::DONT_CARE)
    };
    let discard_previous = clear_depth && (!stencil || clear_stencil);

    vk::AttachmentDescription::default()
        .format(vk_format(format))
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(load(clear_depth))
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(stencil_load_op)
        .stencil_store_op(stencil_store_op)
        .initial_layout(if discard_previous {
            vk::ImageLayout::UNDEFINED
        } else {
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        })
        .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
}

/// Order the pass after earlier attachment writes and copies, and later
/// sampling and transfers after the pass
pub fn subpass_dependencies() -> [vk::SubpassDependency; 2] {
    let attachment_stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
        | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
    let attachment_writes =
        vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;

    [
        vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(attachment_stages | vk::PipelineStageFlags::FRAGMENT_SHADER | vk::PipelineStageFlags::TRANSFER)
            .src_access_mask(attachment_writes | vk::AccessFlags::TRANSFER_WRITE)
            .dst_stage_mask(attachment_stages)
            .dst_access_mask(
                attachment_writes
                    | vk::AccessFlags::COLOR_ATTACHMENT_READ
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
            ),
        vk::SubpassDependency::default()
            .src_subpass(0)
            .dst_subpass(vk::SUBPASS_EXTERNAL)
            .src_stage_mask(attachment_stages)
            .src_access_mask(attachment_writes)
            .dst_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER | vk::PipelineStageFlags::TRANSFER)
            .dst_access_mask(vk::AccessFlags::SHADER_READ | vk::AccessFlags::TRANSFER_READ),
    ]
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Vertex bindings referenced by the enabled attributes, plus the attributes
pub fn vertex_input(
    desc: &PipelineDesc,
) -> (Vec<vk::VertexInputBindingDescription>, Vec<vk::VertexInputAttributeDescription>) {
    let mut bindings: Vec<vk::VertexInputBindingDescription> = Vec::new();
    let mut attributes = Vec::new();

    for (location, attrib) in desc.enabled_attribs() {
        if !bindings.iter().any(|b| b.binding == attrib.buf_binding) {
            bindings.push(
                vk::VertexInputBindingDescription::default()
                    .binding(attrib.buf_binding)
                    .stride(desc.vertex_buffers[attrib.buf_binding as usize].stride)
                    .input_rate(vk::VertexInputRate::VERTEX),
            );
        }
        attributes.push(
            vk::VertexInputAttributeDescription::default()
                .location(location)
                .binding(attrib.buf_binding)
                .format(vertex_format(attrib.format, attrib.count))
                .offset(attrib.offset),
        );
    }
    bindings.sort_by_key(|b| b.binding);
    (bindings, attributes)
}

/// Set layouts up to the last used index, holes filled with `empty`
pub fn set_layouts(
    layouts: &[Option<vk::DescriptorSetLayout>],
    empty: vk::DescriptorSetLayout,
) -> Vec<vk::DescriptorSetLayout> {
    let used = layouts.iter().rposition(Option::is_some).map_or(0, |last| last + 1);
    layouts[..used].iter().map(|layout| layout.unwrap_or(empty)).collect()
}

pub fn rasterization(desc: &PipelineDesc) -> vk::PipelineRasterizationStateCreateInfo<'static> {
    vk::PipelineRasterizationStateCreateInfo::default()
        .polygon_mode(vk::PolygonMode::FILL)
        .cull_mode(if desc.cull_faces { vk::CullModeFlags::BACK } else { vk::CullModeFlags::NONE })
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .line_width(1.0)
}

pub fn depth_stencil(desc: &PipelineDesc) -> vk::PipelineDepthStencilStateCreateInfo<'static> {
    vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(desc.depth_test)
        .depth_write_enable(desc.depth_write)
        .depth_compare_op(vk::CompareOp::LESS)
}

/// Straight alpha blending when enabled
pub fn blend_attachment(desc: &PipelineDesc) -> vk::PipelineColorBlendAttachmentState {
    vk::PipelineColorBlendAttachmentState::default()
        .blend_enable(desc.blending)
        .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
        .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
        .color_blend_op(vk::BlendOp::ADD)
        .src_alpha_blend_factor(vk::BlendFactor::SRC_ALPHA)
        .dst_alpha_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
        .alpha_blend_op(vk::BlendOp::ADD)
        .color_write_mask(vk::ColorComponentFlags::RGBA)
}

#[cfg(test)]
#[path = "vulkan_pipeline_tests.rs"]
mod tests;
