//! Typed resource handles
//!
//! A handle packs a slot index and a generation into one `u64`:
//! the low 32 bits hold `index + 1` (so the all-zero value is "none"),
//! the high 32 bits hold the slot generation at the time the handle was
//! issued. Handles are plain data (`Pod`) so they can be embedded in the
//! descriptor-set data blocks passed to `bind_descriptor_set`.

use std::fmt;

/// Common behavior of every typed handle
pub trait Handle: Copy + Eq + fmt::Debug {
    /// Build a handle from its slot index and generation
    fn from_parts(index: u32, generation: u32) -> Self;

    /// Raw packed value (0 means invalid)
    fn raw(self) -> u64;

    /// Slot index, `None` for the invalid handle
    fn index(self) -> Option<u32> {
        match self.raw() as u32 {
            0 => None,
            i => Some(i - 1),
        }
    }

    /// Generation the handle was issued with
    fn generation(self) -> u32 {
        (self.raw() >> 32) as u32
    }

    /// Whether this handle is not the zero value
    fn is_valid(self) -> bool {
        self.raw() as u32 != 0
    }
}

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default, bytemuck::Pod, bytemuck::Zeroable)]
        pub struct $name(u64);

        impl $name {
            /// The invalid ("none") handle
            pub const NONE: Self = Self(0);
        }

        impl Handle for $name {
            fn from_parts(index: u32, generation: u32) -> Self {
                Self(((generation as u64) << 32) | (index as u64 + 1))
            }

            fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.index() {
                    Some(index) => write!(f, "{}({}v{})", stringify!($name), index, self.generation()),
                    None => write!(f, "{}(none)", stringify!($name)),
                }
            }
        }
    };
}

define_handle!(
    /// Handle to a permanent or ephemeral buffer
    BufferHandle
);
define_handle!(
    /// Handle to a 2D texture (sampled, or backing a render target)
    TextureHandle
);
define_handle!(
    /// Handle to a sampler object
    SamplerHandle
);
define_handle!(
    /// Handle to a render target
    RenderTargetHandle
);
define_handle!(
    /// Handle to a render pass declaration
    RenderPassHandle
);
define_handle!(
    /// Handle to a framebuffer
    FramebufferHandle
);
define_handle!(
    /// Handle to a linked pipeline
    PipelineHandle
);
define_handle!(
    /// Handle to a descriptor-set layout
    DsLayoutHandle
);
define_handle!(
    /// Handle to a compiled vertex shader
    VertexShaderHandle
);
define_handle!(
    /// Handle to a compiled fragment shader
    FragmentShaderHandle
);

/// Texture + sampler pair as laid out in a descriptor-set data block
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CombinedSampler {
    pub texture: TextureHandle,
    pub sampler: SamplerHandle,
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
