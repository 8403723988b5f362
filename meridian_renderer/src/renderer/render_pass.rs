//! Render pass and framebuffer descriptors and slots

use super::format::{Format, Layout};
use crate::handle::{RenderPassHandle, RenderTargetHandle};
use bitflags::bitflags;
use glam::Vec4;

bitflags! {
    /// Attachments cleared when a render pass begins
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// Declares attachment formats and the layout a pass leaves its color target in
#[derive(Debug, Clone)]
pub struct RenderPassDesc {
    pub name: String,
    pub color_format: Format,
    /// `Format::Invalid` when the pass has no depth attachment
    pub depth_stencil_format: Format,
    pub color_final_layout: Layout,
    pub clear: ClearFlags,
    pub clear_color: Vec4,
}

impl RenderPassDesc {
    pub fn new(name: &str, color_format: Format) -> Self {
        Self {
            name: name.to_string(),
            color_format,
            depth_stencil_format: Format::Invalid,
            color_final_layout: Layout::ShaderRead,
            clear: ClearFlags::COLOR,
            clear_color: Vec4::ZERO,
        }
    }

    pub fn depth_stencil(mut self, format: Format) -> Self {
        self.depth_stencil_format = format;
        self.clear |= ClearFlags::DEPTH;
        self
    }

    pub fn color_final_layout(mut self, layout: Layout) -> Self {
        self.color_final_layout = layout;
        self
    }

    pub fn clear(mut self, clear: ClearFlags, color: Vec4) -> Self {
        self.clear = clear;
        self.clear_color = color;
        self
    }

    pub fn has_depth(&self) -> bool {
        self.depth_stencil_format != Format::Invalid
    }
}

/// Render pass slot
#[derive(Debug)]
pub struct RenderPass<N> {
    pub native: N,
    pub desc: RenderPassDesc,
}

/// Binds concrete render targets to a render pass's attachment slots
#[derive(Debug, Clone)]
pub struct FramebufferDesc {
    pub name: String,
    pub render_pass: RenderPassHandle,
    pub color: RenderTargetHandle,
    pub depth_stencil: Option<RenderTargetHandle>,
}

/// Framebuffer slot
#[derive(Debug)]
pub struct Framebuffer<N> {
    pub native: N,
    pub render_pass: RenderPassHandle,
    pub color: RenderTargetHandle,
    pub depth_stencil: Option<RenderTargetHandle>,
    pub width: u32,
    pub height: u32,
}
