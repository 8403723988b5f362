//! Meridian enums to GL enums

use glow::HasContext;
use meridian_renderer::meridian::render::{FilterMode, Format, VertexFormat, WrapMode};

/// Internal format, pixel format and pixel type of a texture format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlFormat {
    pub internal: u32,
    pub format: u32,
    pub ty: u32,
}

/// GL triple for `format`, `None` if GL has no equivalent
pub fn gl_format(format: Format) -> Option<GlFormat> {
    let (internal, format, ty) = match format {
        Format::Invalid | Format::Depth16S8 => return None,
        Format::R8 => (glow::R8, glow::RED, glow::UNSIGNED_BYTE),
        Format::RG8 => (glow::RG8, glow::RG, glow::UNSIGNED_BYTE),
        Format::RGB8 => (glow::RGB8, glow::RGB, glow::UNSIGNED_BYTE),
        Format::RGBA8 => (glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE),
        Format::sRGBA8 => (glow::SRGB8_ALPHA8, glow::RGBA, glow::UNSIGNED_BYTE),
        Format::RG16Float => (glow::RG16F, glow::RG, glow::HALF_FLOAT),
        Format::RGBA16Float => (glow::RGBA16F, glow::RGBA, glow::HALF_FLOAT),
        Format::RGBA32Float => (glow::RGBA32F, glow::RGBA, glow::FLOAT),
        Format::Depth16 => (glow::DEPTH_COMPONENT16, glow::DEPTH_COMPONENT, glow::UNSIGNED_SHORT),
        Format::Depth24S8 => (glow::DEPTH24_STENCIL8, glow::DEPTH_STENCIL, glow::UNSIGNED_INT_24_8),
        Format::Depth24X8 => (glow::DEPTH_COMPONENT24, glow::DEPTH_COMPONENT, glow::UNSIGNED_INT),
        Format::Depth32Float => (glow::DEPTH_COMPONENT32F, glow::DEPTH_COMPONENT, glow::FLOAT),
    };
    Some(GlFormat { internal, format, ty })
}

/// Framebuffer attachment point for a render target of `format`
pub fn attachment_point(format: Format) -> u32 {
    match format {
        Format::Depth24S8 | Format::Depth16S8 => glow::DEPTH_STENCIL_ATTACHMENT,
        f if f.is_depth() => glow::DEPTH_ATTACHMENT,
        _ => glow::COLOR_ATTACHMENT0,
    }
}

/// Buffer bits copied by a blit between render targets of `format`
pub fn blit_mask(format: Format) -> u32 {
    match format {
        Format::Depth24S8 | Format::Depth16S8 => glow::DEPTH_BUFFER_BIT | glow::STENCIL_BUFFER_BIT,
        f if f.is_depth() => glow::DEPTH_BUFFER_BIT,
        _ => glow::COLOR_BUFFER_BIT,
    }
}

pub fn is_color_renderable(format: Format) -> bool {
    !matches!(format, Format::Invalid | Format::RGB8 | Format::Depth16S8)
}

/// `(type, normalized)` of a vertex attribute component
pub fn vertex_format(format: VertexFormat) -> (u32, bool) {
    match format {
        VertexFormat::Float => (glow::FLOAT, false),
        VertexFormat::UNorm8 => (glow::UNSIGNED_BYTE, true),
    }
}

pub fn min_filter(filter: FilterMode) -> i32 {
    match filter {
        FilterMode::Nearest => glow::NEAREST_MIPMAP_NEAREST as i32,
        FilterMode::Linear => glow::LINEAR_MIPMAP_LINEAR as i32,
    }
}

pub fn mag_filter(filter: FilterMode) -> i32 {
    match filter {
        FilterMode::Nearest => glow::NEAREST as i32,
        FilterMode::Linear => glow::LINEAR as i32,
    }
}

pub fn wrap_mode(mode: WrapMode) -> i32 {
    match mode {
        WrapMode::Clamp => glow::CLAMP_TO_EDGE as i32,
        WrapMode::Wrap => glow::REPEAT as i32,
    }
}

/// Convert a top-left-origin rect to GL's bottom-left origin
pub fn flip_rect_y(y: u32, height: u32, target_height: u32) -> i32 {
    target_height as i32 - (y + height) as i32
}

/// Object label for GL debug output, no-op unless the context supports it
///
/// # Safety
///
/// `gl` must be current on this thread.
pub unsafe fn label_object(gl: &glow::Context, identifier: u32, name: u32, label: &str) {
    if gl.supports_debug() {
        gl.object_label(identifier, name, Some(label));
    }
}

#[cfg(test)]
#[path = "gl_format_tests.rs"]
mod tests;
