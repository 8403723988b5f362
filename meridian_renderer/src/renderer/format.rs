//! Pixel formats, image layouts and descriptor types shared by both backends

/// Texture and render-target pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(non_camel_case_types)]
pub enum Format {
    #[default]
    Invalid,
    R8,
    RG8,
    RGB8,
    RGBA8,
    sRGBA8,
    RG16Float,
    RGBA16Float,
    RGBA32Float,
    Depth16,
    Depth16S8,
    Depth24S8,
    Depth24X8,
    Depth32Float,
}

impl Format {
    /// Every format except `Invalid`
    pub const ALL: [Format; 13] = [
        Format::R8,
        Format::RG8,
        Format::RGB8,
        Format::RGBA8,
        Format::sRGBA8,
        Format::RG16Float,
        Format::RGBA16Float,
        Format::RGBA32Float,
        Format::Depth16,
        Format::Depth16S8,
        Format::Depth24S8,
        Format::Depth24X8,
        Format::Depth32Float,
    ];

    /// Whether this is a depth (or depth/stencil) format
    pub fn is_depth(self) -> bool {
        matches!(
            self,
            Format::Depth16
                | Format::Depth16S8
                | Format::Depth24S8
                | Format::Depth24X8
                | Format::Depth32Float
        )
    }

    /// Bytes per pixel
    ///
    /// # Panics
    ///
    /// On `Format::Invalid`.
    pub fn size_bytes(self) -> u32 {
        match self {
            Format::Invalid => panic!("size of Format::Invalid requested"),
            Format::R8 => 1,
            Format::RG8 => 2,
            Format::RGB8 => 3,
            Format::RGBA8 | Format::sRGBA8 => 4,
            Format::RG16Float => 2 * 2,
            Format::RGBA16Float => 4 * 2,
            Format::RGBA32Float => 4 * 4,
            Format::Depth16 => 2,
            Format::Depth16S8 => 3,
            Format::Depth24S8 | Format::Depth24X8 => 4,
            Format::Depth32Float => 4,
        }
    }

    /// Human readable name
    pub fn name(self) -> &'static str {
        match self {
            Format::Invalid => "Invalid",
            Format::R8 => "R8",
            Format::RG8 => "RG8",
            Format::RGB8 => "RGB8",
            Format::RGBA8 => "RGBA8",
            Format::sRGBA8 => "sRGBA8",
            Format::RG16Float => "RG16Float",
            Format::RGBA16Float => "RGBA16Float",
            Format::RGBA32Float => "RGBA32Float",
            Format::Depth16 => "Depth16",
            Format::Depth16S8 => "Depth16S8",
            Format::Depth24S8 => "Depth24S8",
            Format::Depth24X8 => "Depth24X8",
            Format::Depth32Float => "Depth32Float",
        }
    }
}

/// Image layout / usage state of a render target
///
/// The explicit backend turns these into real layout transitions; the
/// immediate-mode backend only tracks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Layout {
    #[default]
    Undefined,
    ShaderRead,
    TransferSrc,
    TransferDst,
    ColorAttachment,
}

impl Layout {
    pub fn name(self) -> &'static str {
        match self {
            Layout::Undefined => "Undefined",
            Layout::ShaderRead => "ShaderRead",
            Layout::TransferSrc => "TransferSrc",
            Layout::TransferDst => "TransferDst",
            Layout::ColorAttachment => "ColorAttachment",
        }
    }
}

/// Kind of resource bound at one descriptor slot
///
/// `End` terminates a descriptor-set layout array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DescriptorType {
    #[default]
    End,
    UniformBuffer,
    StorageBuffer,
    Sampler,
    Texture,
    CombinedSampler,
}

impl DescriptorType {
    pub fn name(self) -> &'static str {
        match self {
            DescriptorType::End => "End",
            DescriptorType::UniformBuffer => "UniformBuffer",
            DescriptorType::StorageBuffer => "StorageBuffer",
            DescriptorType::Sampler => "Sampler",
            DescriptorType::Texture => "Texture",
            DescriptorType::CombinedSampler => "CombinedSampler",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::fmt::Display for DescriptorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
