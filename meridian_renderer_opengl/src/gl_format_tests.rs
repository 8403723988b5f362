//! Unit tests for GL format conversion (no context required)

use super::*;

// ============================================================================
// TEXTURE FORMATS
// ============================================================================

#[test]
fn test_color_formats() {
    assert_eq!(
        gl_format(Format::RGBA8),
        Some(GlFormat { internal: glow::RGBA8, format: glow::RGBA, ty: glow::UNSIGNED_BYTE })
    );
    assert_eq!(gl_format(Format::sRGBA8).unwrap().internal, glow::SRGB8_ALPHA8);
    assert_eq!(gl_format(Format::RGBA16Float).unwrap().ty, glow::HALF_FLOAT);
    assert_eq!(gl_format(Format::RGBA32Float).unwrap().ty, glow::FLOAT);
}

#[test]
fn test_depth_formats() {
    assert_eq!(gl_format(Format::Depth24S8).unwrap().format, glow::DEPTH_STENCIL);
    assert_eq!(gl_format(Format::Depth32Float).unwrap().internal, glow::DEPTH_COMPONENT32F);
    assert_eq!(gl_format(Format::Depth16S8), None);
    assert_eq!(gl_format(Format::Invalid), None);
}

#[test]
fn test_every_valid_format_except_depth16s8_maps() {
    for format in Format::ALL {
        let mapped = gl_format(format).is_some();
        assert_eq!(mapped, !matches!(format, Format::Invalid | Format::Depth16S8), "{}", format);
    }
}

#[test]
fn test_attachment_points() {
    assert_eq!(attachment_point(Format::RGBA8), glow::COLOR_ATTACHMENT0);
    assert_eq!(attachment_point(Format::Depth32Float), glow::DEPTH_ATTACHMENT);
    assert_eq!(attachment_point(Format::Depth24S8), glow::DEPTH_STENCIL_ATTACHMENT);
    assert_eq!(blit_mask(Format::RGBA8), glow::COLOR_BUFFER_BIT);
    assert_eq!(blit_mask(Format::Depth16), glow::DEPTH_BUFFER_BIT);
}

#[test]
fn test_color_renderable() {
    assert!(is_color_renderable(Format::RGBA8));
    assert!(is_color_renderable(Format::Depth24S8));
    assert!(!is_color_renderable(Format::RGB8));
    assert!(!is_color_renderable(Format::Invalid));
}

// ============================================================================
// SAMPLER & VERTEX STATE
// ============================================================================

#[test]
fn test_sampler_state() {
    assert_eq!(min_filter(FilterMode::Linear), glow::LINEAR_MIPMAP_LINEAR as i32);
    assert_eq!(mag_filter(FilterMode::Nearest), glow::NEAREST as i32);
    assert_eq!(wrap_mode(WrapMode::Wrap), glow::REPEAT as i32);
    assert_eq!(wrap_mode(WrapMode::Clamp), glow::CLAMP_TO_EDGE as i32);
}

#[test]
fn test_vertex_formats() {
    assert_eq!(vertex_format(VertexFormat::Float), (glow::FLOAT, false));
    assert_eq!(vertex_format(VertexFormat::UNorm8), (glow::UNSIGNED_BYTE, true));
}

// ============================================================================
// COORDINATES
// ============================================================================

#[test]
fn test_flip_rect_y() {
    // 10px tall rect at the top of a 100px target starts at GL row 90
    assert_eq!(flip_rect_y(0, 10, 100), 90);
    assert_eq!(flip_rect_y(90, 10, 100), 0);
    assert_eq!(flip_rect_y(0, 100, 100), 0);
}
