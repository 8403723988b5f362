//! Texture and sampler descriptors, texture slots

use super::format::Format;

/// Descriptor for an immutable, mip-mapped 2D texture
///
/// `mip_data[i]` holds the pixels of level `i`; level `i` is expected to be
/// `max(width >> i, 1) x max(height >> i, 1)` pixels.
#[derive(Debug, Clone)]
pub struct TextureDesc<'a> {
    pub name: &'a str,
    pub width: u32,
    pub height: u32,
    pub format: Format,
    pub mip_data: Vec<&'a [u8]>,
}

impl<'a> TextureDesc<'a> {
    /// Number of mip levels
    pub fn num_mips(&self) -> u32 {
        self.mip_data.len() as u32
    }

    /// `(width, height)` of every declared mip level
    pub fn mip_extents(&self) -> Vec<(u32, u32)> {
        mip_chain(self.width, self.height, self.num_mips())
    }

    /// Check the descriptor preconditions
    ///
    /// # Panics
    ///
    /// On zero dimensions, an invalid format, no mips, or a mip level whose
    /// byte size is smaller than its halved extent requires.
    pub fn validate(&self) {
        assert!(self.width > 0 && self.height > 0, "texture \"{}\" has zero size", self.name);
        assert!(self.format != Format::Invalid, "texture \"{}\" has invalid format", self.name);
        assert!(!self.mip_data.is_empty(), "texture \"{}\" has no mip levels", self.name);

        let pixel = self.format.size_bytes() as usize;
        for (level, ((w, h), data)) in self.mip_extents().into_iter().zip(&self.mip_data).enumerate() {
            assert!(!data.is_empty(), "texture \"{}\" mip {} has no data", self.name, level);
            assert!(
                data.len() >= w as usize * h as usize * pixel,
                "texture \"{}\" mip {} is {} bytes, needs {}x{}x{}",
                self.name,
                level,
                data.len(),
                w,
                h,
                pixel
            );
        }
    }
}

/// Extents of a mip chain, halving (floor, min 1) per level
pub fn mip_chain(width: u32, height: u32, levels: u32) -> Vec<(u32, u32)> {
    let (mut w, mut h) = (width, height);
    let mut out = Vec::with_capacity(levels as usize);
    for _ in 0..levels {
        out.push((w, h));
        w = (w / 2).max(1);
        h = (h / 2).max(1);
    }
    out
}

/// Texture filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

/// Texture coordinate wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    Clamp,
    Wrap,
}

/// Sampler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SamplerDesc {
    pub min: FilterMode,
    pub mag: FilterMode,
    pub wrap_mode: WrapMode,
}

/// Texture slot stored in the renderer's resource table
#[derive(Debug)]
pub struct Texture<N> {
    pub native: N,
    pub width: u32,
    pub height: u32,
    pub format: Format,
    /// Owned jointly with a render target; only `delete_render_target` frees it
    pub render_target: bool,
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
