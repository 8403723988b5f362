use super::*;
use crate::handle::Handle;

fn pass() -> RenderPassHandle {
    RenderPassHandle::from_parts(0, 0)
}

fn other_pass() -> RenderPassHandle {
    RenderPassHandle::from_parts(1, 0)
}

fn fb() -> FramebufferHandle {
    FramebufferHandle::from_parts(0, 0)
}

fn pipeline(scissor_test: bool) -> BoundPipeline {
    BoundPipeline { pipeline: PipelineHandle::from_parts(0, 0), render_pass: pass(), scissor_test }
}

fn in_pass() -> FrameState {
    let mut state = FrameState::new();
    state.begin_frame();
    state.begin_render_pass(pass(), fb());
    state
}

#[test]
fn test_full_frame_sequence() {
    let mut state = in_pass();
    state.bind_pipeline(pipeline(false));
    state.draw("draw", 3, 1);
    let active = state.end_render_pass();
    assert_eq!(active.framebuffer, fb());
    state.present();
    assert!(!state.in_frame());

    // Next frame starts clean
    state.begin_frame();
    assert!(state.pipeline().is_none());
}

#[test]
fn test_rebind_after_draw_is_allowed() {
    let mut state = in_pass();
    state.bind_pipeline(pipeline(false));
    state.draw("draw", 3, 1);
    state.bind_pipeline(pipeline(false));
    state.draw("draw", 3, 1);
}

#[test]
#[should_panic(expected = "begin_frame called while a frame is in progress")]
fn test_double_begin_frame_panics() {
    let mut state = FrameState::new();
    state.begin_frame();
    state.begin_frame();
}

#[test]
#[should_panic(expected = "outside a frame")]
fn test_render_pass_outside_frame_panics() {
    FrameState::new().begin_render_pass(pass(), fb());
}

#[test]
#[should_panic(expected = "inside a render pass")]
fn test_nested_render_pass_panics() {
    in_pass().begin_render_pass(pass(), fb());
}

#[test]
#[should_panic(expected = "without a bound pipeline")]
fn test_draw_before_bind_pipeline_panics() {
    in_pass().draw("draw", 3, 1);
}

#[test]
#[should_panic(expected = "before the previous pipeline issued a draw")]
fn test_double_bind_without_draw_panics() {
    let mut state = in_pass();
    state.bind_pipeline(pipeline(false));
    state.bind_pipeline(pipeline(false));
}

#[test]
#[should_panic(expected = "different render pass")]
fn test_pipeline_from_other_pass_panics() {
    let mut state = in_pass();
    state.bind_pipeline(BoundPipeline { render_pass: other_pass(), ..pipeline(false) });
}

#[test]
#[should_panic(expected = "zero vertex count")]
fn test_zero_count_draw_panics() {
    let mut state = in_pass();
    state.bind_pipeline(pipeline(false));
    state.draw("draw", 0, 1);
}

#[test]
#[should_panic(expected = "before the scissor rect was set")]
fn test_scissor_pipeline_draw_without_rect_panics() {
    let mut state = in_pass();
    state.bind_pipeline(pipeline(true));
    state.draw("draw", 3, 1);
}

#[test]
fn test_scissor_pipeline_draw_with_rect() {
    let mut state = in_pass();
    state.bind_pipeline(pipeline(true));
    state.set_scissor_rect();
    state.draw("draw", 3, 1);
}

#[test]
#[should_panic(expected = "has no scissor test")]
fn test_scissor_rect_without_scissor_test_panics() {
    let mut state = in_pass();
    state.bind_pipeline(pipeline(false));
    state.set_scissor_rect();
}

#[test]
#[should_panic(expected = "outside a render pass")]
fn test_end_render_pass_twice_panics() {
    let mut state = in_pass();
    state.end_render_pass();
    state.end_render_pass();
}

#[test]
#[should_panic(expected = "present_frame called inside a render pass")]
fn test_present_inside_render_pass_panics() {
    in_pass().present();
}

#[test]
#[should_panic(expected = "present_frame called outside a frame")]
fn test_present_outside_frame_panics() {
    FrameState::new().present();
}
