//! Render target descriptor and slot

use super::format::{Format, Layout};
use crate::handle::TextureHandle;

/// Descriptor for a render target (a texture that can be rendered into)
#[derive(Debug, Clone)]
pub struct RenderTargetDesc {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: Format,
}

/// Render target slot
///
/// `texture` names the backing texture slot, which is destroyed together
/// with the render target. `current_layout` tracks the image state so that
/// presentation and explicit transitions can be checked on both backends.
#[derive(Debug)]
pub struct RenderTarget<N> {
    pub native: N,
    pub width: u32,
    pub height: u32,
    pub format: Format,
    pub texture: TextureHandle,
    pub current_layout: Layout,
}
