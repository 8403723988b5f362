//! Frame / render-pass state machine
//!
//! `Idle -> InFrame -> InFrame+InRenderPass -> InFrame -> Idle`. Every guard
//! is a fatal assertion: an illegal call order is a bug in the caller.

use crate::handle::{FramebufferHandle, PipelineHandle, RenderPassHandle};

/// Active render pass and the framebuffer it renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivePass {
    pub pass: RenderPassHandle,
    pub framebuffer: FramebufferHandle,
}

/// Bound pipeline and the fixed-function bits the guards need
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundPipeline {
    pub pipeline: PipelineHandle,
    pub render_pass: RenderPassHandle,
    pub scissor_test: bool,
}

#[derive(Debug)]
pub struct FrameState {
    in_frame: bool,
    active_pass: Option<ActivePass>,
    pipeline: Option<BoundPipeline>,
    /// The last bound pipeline issued at least one draw
    pipeline_drawn: bool,
    /// A scissor rect was set since the current pipeline was bound
    scissor_set: bool,
}

impl Default for FrameState {
    fn default() -> Self {
        Self { in_frame: false, active_pass: None, pipeline: None, pipeline_drawn: true, scissor_set: false }
    }
}

impl FrameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    pub fn active_pass(&self) -> Option<ActivePass> {
        self.active_pass
    }

    pub fn pipeline(&self) -> Option<BoundPipeline> {
        self.pipeline
    }

    pub fn begin_frame(&mut self) {
        assert!(!self.in_frame, "begin_frame called while a frame is in progress");
        *self = Self { in_frame: true, ..Self::default() };
    }

    pub fn begin_render_pass(&mut self, pass: RenderPassHandle, framebuffer: FramebufferHandle) {
        assert!(self.in_frame, "begin_render_pass called outside a frame");
        assert!(self.active_pass.is_none(), "begin_render_pass called inside a render pass");
        self.active_pass = Some(ActivePass { pass, framebuffer });
        self.pipeline = None;
        self.pipeline_drawn = true;
        self.scissor_set = false;
    }

    /// Leave the render pass, returning the pass that was active
    pub fn end_render_pass(&mut self) -> ActivePass {
        assert!(self.in_frame, "end_render_pass called outside a frame");
        let active = self.active_pass.take().unwrap_or_else(|| panic!("end_render_pass called outside a render pass"));
        self.pipeline = None;
        active
    }

    pub fn bind_pipeline(&mut self, bound: BoundPipeline) {
        assert!(self.in_frame, "bind_pipeline called outside a frame");
        let active = self.active_pass.unwrap_or_else(|| panic!("bind_pipeline called outside a render pass"));
        assert!(self.pipeline_drawn, "bind_pipeline called before the previous pipeline issued a draw");
        assert_eq!(
            bound.render_pass, active.pass,
            "pipeline {:?} belongs to a different render pass",
            bound.pipeline
        );
        self.pipeline = Some(bound);
        self.pipeline_drawn = false;
        self.scissor_set = false;
    }

    /// Bound pipeline for an operation that requires one
    pub fn require_pipeline(&self, op: &str) -> BoundPipeline {
        assert!(self.in_frame, "{} called outside a frame", op);
        self.pipeline.unwrap_or_else(|| panic!("{} called without a bound pipeline", op))
    }

    pub fn set_scissor_rect(&mut self) {
        let bound = self.require_pipeline("set_scissor_rect");
        assert!(bound.scissor_test, "set_scissor_rect called but pipeline {:?} has no scissor test", bound.pipeline);
        self.scissor_set = true;
    }

    pub fn set_viewport(&self) {
        assert!(self.in_frame, "set_viewport called outside a frame");
    }

    /// Guard shared by every draw variant
    pub fn draw(&mut self, op: &str, count: u32, instances: u32) {
        let active = self.active_pass.unwrap_or_else(|| panic!("{} called outside a render pass", op));
        let bound = self.require_pipeline(op);
        assert!(count > 0, "{} with zero vertex count", op);
        assert!(instances > 0, "{} with zero instance count", op);
        assert!(!bound.scissor_test || self.scissor_set, "{} before the scissor rect was set", op);
        assert_eq!(bound.render_pass, active.pass, "{} with a pipeline from another render pass", op);
        self.pipeline_drawn = true;
    }

    /// Guard for transfer operations (blit, layout transition)
    pub fn require_outside_pass(&self, op: &str) {
        assert!(self.in_frame, "{} called outside a frame", op);
        assert!(self.active_pass.is_none(), "{} called inside a render pass", op);
    }

    pub fn present(&mut self) {
        self.require_outside_pass("present_frame");
        self.in_frame = false;
        self.pipeline = None;
    }
}

#[cfg(test)]
#[path = "frame_state_tests.rs"]
mod tests;
