use super::*;
use crate::error::Error;
use crate::renderer::mock_device::{CallLog, MockDevice};
use crate::renderer::{VertexAttribute, VertexFormat};
use std::path::PathBuf;

// ============================================================================
// Fixture
// ============================================================================

const VERTEX: &str = r#"#version 450

layout(set = 0, binding = 0) uniform Globals {
    vec4 tint;
} globals;

layout(location = 0) in vec2 position;
layout(location = 0) out vec2 uv;

void main() {
    uv = position * 0.5 + vec2(0.5) + globals.tint.xy * 0.0;
    gl_Position = vec4(position, 0.0, 1.0);
}
"#;

const FRAGMENT: &str = r#"#version 450

layout(set = 0, binding = 0) uniform Globals {
    vec4 tint;
} globals;

layout(set = 0, binding = 1) uniform texture2D color_tex;
layout(set = 0, binding = 2) uniform sampler color_sampler;

layout(location = 0) in vec2 uv;
layout(location = 0) out vec4 out_color;

void main() {
    out_color = globals.tint * texture(sampler2D(color_tex, color_sampler), uv);
}
"#;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct MaterialSet {
    globals: BufferHandle,
    color_tex: TextureHandle,
    color_sampler: SamplerHandle,
}

const MATERIAL_LAYOUT: [DescriptorLayout; 4] = [
    DescriptorLayout { ty: DescriptorType::UniformBuffer, offset: 0, binding: None, sampler_binding: None },
    DescriptorLayout { ty: DescriptorType::Texture, offset: 8, binding: None, sampler_binding: None },
    DescriptorLayout { ty: DescriptorType::Sampler, offset: 16, binding: None, sampler_binding: None },
    DescriptorLayout::END,
];

fn shader_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("meridian_renderer_test_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("textured.vert"), VERTEX).unwrap();
    std::fs::write(dir.join("textured.frag"), FRAGMENT).unwrap();
    dir
}

fn test_config(name: &str, ring_size: u32, num_frames: u32) -> RendererConfig {
    let dir = shader_dir(name);
    RendererConfig {
        swapchain: SwapchainDesc { num_frames, ..SwapchainDesc::default() },
        ephemeral_ring_buf_size: ring_size,
        skip_shader_cache: true,
        optimize_shaders: false,
        cache_dir: dir.join("cache"),
        shader_dir: dir,
        ..RendererConfig::default()
    }
}

fn renderer(name: &str, ring_size: u32, num_frames: u32) -> (Renderer<MockDevice>, CallLog) {
    let (device, log) = MockDevice::new(num_frames);
    let renderer = Renderer::new(device, test_config(name, ring_size, num_frames)).unwrap();
    (renderer, log)
}

struct Scene {
    pass: RenderPassHandle,
    target: RenderTargetHandle,
    framebuffer: FramebufferHandle,
    layout: DsLayoutHandle,
    pipeline: PipelineHandle,
    texture: TextureHandle,
    sampler: SamplerHandle,
}

fn build_scene(r: &mut Renderer<MockDevice>) -> Scene {
    let pass = r
        .create_render_pass(&RenderPassDesc::new("main", Format::RGBA8).color_final_layout(Layout::ShaderRead))
        .unwrap();
    let target = r
        .create_render_target(&RenderTargetDesc { name: "color".to_string(), width: 64, height: 32, format: Format::RGBA8 })
        .unwrap();
    let framebuffer = r
        .create_framebuffer(&FramebufferDesc { name: "main".to_string(), render_pass: pass, color: target, depth_stencil: None })
        .unwrap();
    let layout = r.create_descriptor_set_layout(&MATERIAL_LAYOUT).unwrap();
    let vs = r.create_vertex_shader("textured", &ShaderMacros::new()).unwrap();
    let fs = r.create_fragment_shader("textured", &ShaderMacros::new()).unwrap();
    let pipeline = r
        .create_pipeline(
            &PipelineDesc::new("textured")
                .vertex_shader(vs)
                .fragment_shader(fs)
                .render_pass(pass)
                .vertex_attrib(0, VertexAttribute { buf_binding: 0, count: 2, format: VertexFormat::Float, offset: 0 })
                .vertex_buffer_stride(0, 8)
                .descriptor_set_layout(0, layout),
        )
        .unwrap();

    let pixels = [255u8; 4 * 4 * 4];
    let texture = r
        .create_texture(&TextureDesc {
            name: "white",
            width: 4,
            height: 4,
            format: Format::RGBA8,
            mip_data: vec![&pixels],
        })
        .unwrap();
    let sampler = r.create_sampler(&SamplerDesc::default()).unwrap();

    Scene { pass, target, framebuffer, layout, pipeline, texture, sampler }
}

fn frame_calls(log: &CallLog) -> Vec<String> {
    let log = log.borrow();
    let start = log.iter().rposition(|c| c.starts_with("begin_frame")).unwrap();
    log[start..].to_vec()
}

const TRIANGLE: [f32; 6] = [0.0, 0.5, -0.5, -0.5, 0.5, -0.5];

// ============================================================================
// Full frame
// ============================================================================

#[test]
fn test_full_frame_call_stream() {
    let (mut r, log) = renderer("full_frame", 4096, 2);
    let scene = build_scene(&mut r);

    r.begin_frame().unwrap();
    let vertices = r.create_ephemeral_buffer(bytemuck::cast_slice(&TRIANGLE)).unwrap();
    let globals = r.create_ephemeral_buffer(bytemuck::cast_slice(&[1.0f32, 1.0, 1.0, 1.0])).unwrap();

    r.begin_render_pass(scene.pass, scene.framebuffer);
    r.bind_pipeline(scene.pipeline);
    r.set_viewport(0, 0, 64, 32);
    r.bind_vertex_buffer(0, vertices);
    let set = MaterialSet { globals, color_tex: scene.texture, color_sampler: scene.sampler };
    r.bind_descriptor_set(0, scene.layout, bytemuck::bytes_of(&set)).unwrap();
    r.draw(0, 3);
    r.end_render_pass();
    r.layout_transition(scene.target, Layout::ShaderRead, Layout::TransferSrc);
    r.present_frame(scene.target).unwrap();

    let ring = r.device().ring_buffer();
    let pass = r.render_passes.get(scene.pass).native;
    let fb = r.framebuffers.get(scene.framebuffer).native;
    let pipeline = r.pipelines.get(scene.pipeline).native;
    let layout = r.ds_layouts.get(scene.layout).native;
    let texture = r.textures.get(scene.texture).native;
    let sampler = *r.samplers.get(scene.sampler);
    let rt = r.render_targets.get(scene.target).native;

    assert_eq!(
        frame_calls(&log),
        vec![
            "begin_frame 0".to_string(),
            format!("begin_render_pass {} {}", pass, fb),
            format!("bind_pipeline {}", pipeline),
            "set_viewport 0 0 64 32".to_string(),
            format!("bind_vertex_buffer 0 {}+0", ring),
            format!("bind_descriptor_set 0 {} [ubo0={}+256/16 tex1={} smp2={}]", layout, ring, texture, sampler),
            "draw 0 3".to_string(),
            "end_render_pass".to_string(),
            format!("layout_transition {} ShaderRead TransferSrc", rt),
            format!("present {}", rt),
        ]
    );
}

#[test]
fn test_ephemeral_data_written_to_ring() {
    let (mut r, _log) = renderer("ring_write", 4096, 2);
    r.begin_frame().unwrap();
    let a = r.create_ephemeral_buffer(&[1, 2, 3]).unwrap();
    let b = r.create_ephemeral_buffer(&[9; 8]).unwrap();

    assert_eq!(r.buffers.get(a).begin_offset, 0);
    assert_eq!(r.buffers.get(b).begin_offset, 256);
    assert_eq!(&r.device().ring_data[0..3], &[1, 2, 3]);
    assert_eq!(&r.device().ring_data[256..264], &[9; 8]);
}

#[test]
fn test_render_pass_final_layout_applied() {
    let (mut r, _log) = renderer("final_layout", 4096, 2);
    let scene = build_scene(&mut r);
    assert_eq!(r.render_target_layout(scene.target), Layout::Undefined);

    r.begin_frame().unwrap();
    r.begin_render_pass(scene.pass, scene.framebuffer);
    assert_eq!(r.render_target_layout(scene.target), Layout::ColorAttachment);
    r.end_render_pass();
    assert_eq!(r.render_target_layout(scene.target), Layout::ShaderRead);
}

#[test]
fn test_combined_sampler_descriptor() {
    let (mut r, log) = renderer("combined", 4096, 2);
    let scene = build_scene(&mut r);
    let layout = r
        .create_descriptor_set_layout(&[
            DescriptorLayout::new(DescriptorType::UniformBuffer, 0),
            DescriptorLayout::new(DescriptorType::CombinedSampler, 8).at_binding(1),
            DescriptorLayout::END,
        ])
        .unwrap();
    let base = r.pipelines.get(scene.pipeline).desc.clone();
    let pipeline = r.create_pipeline(&base.descriptor_set_layout(0, layout)).unwrap();
    let globals = r.create_buffer(&[0; 16]).unwrap();

    r.begin_frame().unwrap();
    r.begin_render_pass(scene.pass, scene.framebuffer);
    r.bind_pipeline(pipeline);

    let mut data = Vec::new();
    data.extend_from_slice(bytemuck::bytes_of(&globals));
    data.extend_from_slice(bytemuck::bytes_of(&CombinedSampler { texture: scene.texture, sampler: scene.sampler }));
    r.bind_descriptor_set(0, layout, &data).unwrap();

    let expected = format!(
        "bind_descriptor_set 0 {} [ubo0={}+0/16 cs1+2={}/{}]",
        r.ds_layouts.get(layout).native,
        r.buffers.get(globals).native,
        r.textures.get(scene.texture).native,
        r.samplers.get(scene.sampler)
    );
    assert_eq!(log.borrow().last().unwrap(), &expected);
}

#[test]
fn test_descriptor_set_failure_propagates() {
    let (mut r, log) = renderer("ds_failure", 4096, 2);
    let scene = build_scene(&mut r);
    let globals = r.create_buffer(&[0; 16]).unwrap();

    r.begin_frame().unwrap();
    r.begin_render_pass(scene.pass, scene.framebuffer);
    r.bind_pipeline(scene.pipeline);
    r.device_mut().fail_descriptor_sets = true;

    let set = MaterialSet { globals, color_tex: scene.texture, color_sampler: scene.sampler };
    let result = r.bind_descriptor_set(0, scene.layout, bytemuck::bytes_of(&set));
    assert!(matches!(result, Err(Error::BackendError(_))));
    assert!(!log.borrow().iter().any(|c| c.starts_with("bind_descriptor_set")));

    r.device_mut().fail_descriptor_sets = false;
    r.bind_descriptor_set(0, scene.layout, bytemuck::bytes_of(&set)).unwrap();
    assert!(log.borrow().last().unwrap().starts_with("bind_descriptor_set 0"));
}

// ============================================================================
// Ephemeral buffers and the ring
// ============================================================================

#[test]
fn test_ephemeral_buffers_released_at_present() {
    let (mut r, log) = renderer("release", 4096, 2);
    let scene = build_scene(&mut r);
    let permanent = r.create_buffer(&[0; 32]).unwrap();

    r.begin_frame().unwrap();
    r.create_ephemeral_buffer(&[0; 64]).unwrap();
    r.create_ephemeral_buffer(&[0; 64]).unwrap();
    let stats = r.mem_stats();
    assert_eq!(stats.buffers, 1);
    assert_eq!(stats.ephemeral_buffers, 2);

    r.layout_transition(scene.target, Layout::Undefined, Layout::TransferSrc);
    r.present_frame(scene.target).unwrap();

    let stats = r.mem_stats();
    assert_eq!(stats.buffers, 1);
    assert_eq!(stats.ephemeral_buffers, 0);
    assert!(r.buffers.contains(permanent));
    assert!(!log.borrow().iter().any(|c| c.starts_with("delete_buffer")));
}

#[test]
#[should_panic(expected = "stale or unknown handle")]
fn test_ephemeral_buffer_invalid_after_present() {
    let (mut r, _log) = renderer("stale", 4096, 2);
    let scene = build_scene(&mut r);

    r.begin_frame().unwrap();
    let vertices = r.create_ephemeral_buffer(bytemuck::cast_slice(&TRIANGLE)).unwrap();
    r.layout_transition(scene.target, Layout::Undefined, Layout::TransferSrc);
    r.present_frame(scene.target).unwrap();

    r.begin_frame().unwrap();
    r.begin_render_pass(scene.pass, scene.framebuffer);
    r.bind_pipeline(scene.pipeline);
    r.bind_vertex_buffer(0, vertices);
}

#[test]
fn test_oversized_allocation_grows_ring() {
    let (mut r, log) = renderer("oversized", 256, 2);
    r.begin_frame().unwrap();
    let big = r.create_ephemeral_buffer(&[7; 1000]).unwrap();

    assert_eq!(r.mem_stats().ring_buffer_size, 1024);
    assert_eq!(r.buffers.get(big).begin_offset, 0);
    assert_eq!(r.buffers.get(big).ring_generation, 1);
    assert!(log.borrow().last().unwrap().ends_with(" 1024"));
    assert_eq!(r.device().ring_data.len(), 1024);
}

#[test]
fn test_failed_ring_growth_leaves_ring_unchanged() {
    let (mut r, _log) = renderer("ring_failure", 256, 2);
    r.begin_frame().unwrap();
    let small = r.create_ephemeral_buffer(&[1; 16]).unwrap();

    r.device_mut().fail_ring_recreate = true;
    let result = r.create_ephemeral_buffer(&[7; 1000]);
    assert!(matches!(result, Err(Error::OutOfMemory)));
    assert_eq!(r.mem_stats().ring_buffer_size, 256);
    assert_eq!(r.mem_stats().ephemeral_buffers, 1);
    assert_eq!(r.device().ring_data.len(), 256);
    assert_eq!(r.buffers.get(small).ring_generation, 0);

    r.device_mut().fail_ring_recreate = false;
    let big = r.create_ephemeral_buffer(&[7; 1000]).unwrap();
    assert_eq!(r.mem_stats().ring_buffer_size, 1024);
    assert_eq!(r.buffers.get(big).ring_generation, 1);
    assert_eq!(r.device().ring_data.len(), 1024);
}

#[test]
fn test_steady_state_frames_reuse_ring() {
    let (mut r, log) = renderer("steady", 1024, 2);
    let scene = build_scene(&mut r);

    for _ in 0..6 {
        r.begin_frame().unwrap();
        r.create_ephemeral_buffer(&[0; 512]).unwrap();
        assert!(r.mem_stats().ring_buffer_in_flight <= 1024);
        if r.render_target_layout(scene.target) != Layout::TransferSrc {
            r.layout_transition(scene.target, Layout::Undefined, Layout::TransferSrc);
        }
        r.present_frame(scene.target).unwrap();
    }

    assert_eq!(r.mem_stats().ring_buffer_size, 1024);
    let recreations = log.borrow().iter().filter(|c| c.starts_with("recreate_ring_buffer")).count();
    assert_eq!(recreations, 1);
}

#[test]
fn test_overrun_grows_ring_and_keeps_earlier_buffers_bindable() {
    let (mut r, _log) = renderer("overrun", 1024, 2);
    let scene = build_scene(&mut r);

    r.begin_frame().unwrap();
    let first = r.create_ephemeral_buffer(&[0; 512]).unwrap();
    r.create_ephemeral_buffer(&[0; 512]).unwrap();
    let third = r.create_ephemeral_buffer(&[0; 512]).unwrap();

    assert_eq!(r.mem_stats().ring_buffer_size, 2048);
    assert_eq!(r.buffers.get(first).ring_generation, 0);
    assert_eq!(r.buffers.get(third).ring_generation, 1);
    assert_eq!(r.buffers.get(third).begin_offset, 0);

    r.begin_render_pass(scene.pass, scene.framebuffer);
    r.bind_pipeline(scene.pipeline);
    r.bind_vertex_buffer(0, first);
    r.bind_vertex_buffer(0, third);
}

#[test]
#[should_panic(expected = "delete_buffer called on ephemeral buffer")]
fn test_delete_ephemeral_buffer_panics() {
    let (mut r, _log) = renderer("delete_ephemeral", 4096, 2);
    r.begin_frame().unwrap();
    let buffer = r.create_ephemeral_buffer(&[0; 4]).unwrap();
    r.delete_buffer(buffer);
}

// ============================================================================
// Contract violations
// ============================================================================

#[test]
#[should_panic(expected = "draw called outside a render pass")]
fn test_draw_outside_render_pass() {
    let (mut r, _log) = renderer("draw_outside", 4096, 2);
    r.begin_frame().unwrap();
    r.draw(0, 3);
}

#[test]
#[should_panic(expected = "bind_pipeline called outside a frame")]
fn test_bind_pipeline_outside_frame() {
    let (mut r, _log) = renderer("bind_outside", 4096, 2);
    let scene = build_scene(&mut r);
    r.bind_pipeline(scene.pipeline);
}

#[test]
#[should_panic(expected = "begin_frame called while a frame is in progress")]
fn test_nested_begin_frame() {
    let (mut r, _log) = renderer("nested_frame", 4096, 2);
    r.begin_frame().unwrap();
    r.begin_frame().unwrap();
}

#[test]
#[should_panic(expected = "present_frame")]
fn test_present_requires_transfer_src() {
    let (mut r, _log) = renderer("present_layout", 4096, 2);
    let scene = build_scene(&mut r);
    r.begin_frame().unwrap();
    r.begin_render_pass(scene.pass, scene.framebuffer);
    r.end_render_pass();
    r.present_frame(scene.target).unwrap();
}

#[test]
#[should_panic(expected = "present_frame called inside a render pass")]
fn test_present_inside_render_pass() {
    let (mut r, _log) = renderer("present_in_pass", 4096, 2);
    let scene = build_scene(&mut r);
    r.begin_frame().unwrap();
    r.begin_render_pass(scene.pass, scene.framebuffer);
    r.present_frame(scene.target).unwrap();
}

#[test]
#[should_panic(expected = "does not match the pipeline's")]
fn test_descriptor_set_layout_mismatch() {
    let (mut r, _log) = renderer("layout_mismatch", 4096, 2);
    let scene = build_scene(&mut r);
    let other = r.create_descriptor_set_layout(&MATERIAL_LAYOUT).unwrap();
    r.begin_frame().unwrap();
    r.begin_render_pass(scene.pass, scene.framebuffer);
    r.bind_pipeline(scene.pipeline);
    r.bind_descriptor_set(0, other, &[0; 24]).unwrap();
}

#[test]
#[should_panic(expected = "color format does not match render pass")]
fn test_framebuffer_format_mismatch() {
    let (mut r, _log) = renderer("fb_format", 4096, 2);
    let pass = r.create_render_pass(&RenderPassDesc::new("hdr", Format::RGBA16Float)).unwrap();
    let target = r
        .create_render_target(&RenderTargetDesc { name: "ldr".to_string(), width: 8, height: 8, format: Format::RGBA8 })
        .unwrap();
    let _ = r.create_framebuffer(&FramebufferDesc { name: "bad".to_string(), render_pass: pass, color: target, depth_stencil: None });
}

#[test]
#[should_panic(expected = "has no depth target but render pass")]
fn test_framebuffer_missing_depth() {
    let (mut r, _log) = renderer("fb_depth", 4096, 2);
    let pass = r
        .create_render_pass(&RenderPassDesc::new("scene", Format::RGBA8).depth_stencil(Format::Depth24S8))
        .unwrap();
    let target = r
        .create_render_target(&RenderTargetDesc { name: "color".to_string(), width: 8, height: 8, format: Format::RGBA8 })
        .unwrap();
    let _ = r.create_framebuffer(&FramebufferDesc { name: "bad".to_string(), render_pass: pass, color: target, depth_stencil: None });
}

#[test]
#[should_panic(expected = "belongs to a render target")]
fn test_delete_render_target_texture_panics() {
    let (mut r, _log) = renderer("rt_texture", 4096, 2);
    let scene = build_scene(&mut r);
    let texture = r.render_target_texture(scene.target);
    r.delete_texture(texture);
}

#[test]
#[should_panic(expected = "layout_transition of")]
fn test_layout_transition_from_wrong_layout() {
    let (mut r, _log) = renderer("wrong_from", 4096, 2);
    let scene = build_scene(&mut r);
    r.begin_frame().unwrap();
    r.layout_transition(scene.target, Layout::ShaderRead, Layout::TransferSrc);
}

#[test]
#[should_panic(expected = "blit between differently sized render targets")]
fn test_blit_size_mismatch() {
    let (mut r, _log) = renderer("blit_size", 4096, 2);
    let scene = build_scene(&mut r);
    let other = r
        .create_render_target(&RenderTargetDesc { name: "small".to_string(), width: 8, height: 8, format: Format::RGBA8 })
        .unwrap();
    r.begin_frame().unwrap();
    r.blit(scene.target, other);
}

// ============================================================================
// Lifetime and surface
// ============================================================================

#[test]
fn test_delete_render_target_removes_texture() {
    let (mut r, log) = renderer("delete_rt", 4096, 2);
    let target = r
        .create_render_target(&RenderTargetDesc { name: "tmp".to_string(), width: 8, height: 8, format: Format::RGBA8 })
        .unwrap();
    let texture = r.render_target_texture(target);
    r.delete_render_target(target);

    assert!(!r.textures.contains(texture));
    assert!(log.borrow().last().unwrap().starts_with("delete_render_target"));
    assert_eq!(r.mem_stats().textures, 0);
}

#[test]
fn test_drop_releases_every_native_object() {
    let (mut r, log) = renderer("drop", 4096, 2);
    build_scene(&mut r);
    r.create_buffer(&[0; 16]).unwrap();
    r.begin_frame().unwrap();
    r.create_ephemeral_buffer(&[0; 16]).unwrap();
    let ring = r.device().ring_buffer();
    drop(r);

    let log = log.borrow();
    let created = log.iter().filter(|c| c.starts_with("create_")).count();
    let deleted = log.iter().filter(|c| c.starts_with("delete_")).count();
    assert_eq!(created, deleted);
    assert!(!log.contains(&format!("delete_buffer {}", ring)));
    assert_eq!(log.iter().position(|c| c == "wait_idle"), Some(log.len() - deleted - 1));
}

#[test]
fn test_set_swapchain_desc() {
    let (mut r, log) = renderer("swapchain", 4096, 2);
    let desc = SwapchainDesc { width: 800, height: 600, vsync: false, ..*r.swapchain_desc() };
    r.set_swapchain_desc(&desc).unwrap();

    assert_eq!(r.swapchain_desc().width, 800);
    assert!(!r.swapchain_desc().vsync);
    assert_eq!(r.drawable_size(), (800, 600));
    assert_eq!(log.borrow().last().unwrap(), "set_swapchain_desc 800x600 vsync=false");
}

#[test]
fn test_set_swapchain_desc_zero_drawable_fails() {
    let (mut r, _log) = renderer("swapchain_zero", 4096, 2);
    let desc = SwapchainDesc { width: 0, ..*r.swapchain_desc() };
    assert!(r.set_swapchain_desc(&desc).is_err());
}

#[test]
fn test_invalid_config_rejected() {
    let (device, _log) = MockDevice::new(2);
    let config = RendererConfig { ephemeral_ring_buf_size: 0, ..RendererConfig::default() };
    assert!(Renderer::new(device, config).is_err());
}

#[test]
fn test_missing_shader_source_is_error() {
    let (mut r, _log) = renderer("missing_shader", 4096, 2);
    assert!(r.create_vertex_shader("does_not_exist", &ShaderMacros::new()).is_err());
}
