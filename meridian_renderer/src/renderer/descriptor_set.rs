//! Descriptor-set layouts and reading descriptor data blocks
//!
//! A descriptor set is bound from a caller-owned `#[repr(C)]` struct whose
//! fields are handles; each layout entry records the byte offset of its field:
//!
//! ```ignore
//! #[repr(C)]
//! #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
//! struct GlobalDs {
//!     globals: BufferHandle,
//!     color: CombinedSampler,
//! }
//!
//! let layout = renderer.create_descriptor_set_layout(&[
//!     DescriptorLayout::new(DescriptorType::UniformBuffer, offset_of!(GlobalDs, globals)),
//!     DescriptorLayout::new(DescriptorType::CombinedSampler, offset_of!(GlobalDs, color)),
//!     DescriptorLayout::END,
//! ]);
//! renderer.bind_descriptor_set(0, layout, bytemuck::bytes_of(&ds))?;
//! ```
//!
//! Shaders declare a combined entry as a separate `texture2D` at the entry's
//! binding and a `sampler` at its sampler binding (the next slot unless set
//! with [`DescriptorLayout::with_sampler_binding`]):
//!
//! ```glsl
//! layout(set = 0, binding = 1) uniform texture2D color_tex;
//! layout(set = 0, binding = 2) uniform sampler color_sampler;
//! ```

use super::format::DescriptorType;

/// One entry of a descriptor-set layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DescriptorLayout {
    pub ty: DescriptorType,
    /// Byte offset of this entry's handle(s) in the data block
    pub offset: u32,
    /// Native binding slot; defaults to the entry's position in the layout
    pub binding: Option<u32>,
    /// Slot of the sampler half of a `CombinedSampler`; defaults to `binding + 1`
    pub sampler_binding: Option<u32>,
}

impl DescriptorLayout {
    /// Sentinel terminating a layout array
    pub const END: DescriptorLayout =
        DescriptorLayout { ty: DescriptorType::End, offset: 0, binding: None, sampler_binding: None };

    pub fn new(ty: DescriptorType, offset: usize) -> Self {
        Self { ty, offset: offset as u32, binding: None, sampler_binding: None }
    }

    /// Bind this entry at an explicit native slot instead of its position
    pub fn at_binding(mut self, binding: u32) -> Self {
        self.binding = Some(binding);
        self
    }

    /// Bind the sampler of a `CombinedSampler` entry at an explicit slot
    pub fn with_sampler_binding(mut self, binding: u32) -> Self {
        self.sampler_binding = Some(binding);
        self
    }

    /// Size in bytes of the entry's field in the data block
    pub fn data_size(&self) -> usize {
        match self.ty {
            DescriptorType::CombinedSampler => 16,
            DescriptorType::End => 0,
            _ => 8,
        }
    }
}

/// Copy entries up to (not including) the `End` sentinel
///
/// # Panics
///
/// If the sentinel carries a non-zero offset, which indicates a malformed
/// array, or if two descriptors end up on the same native slot.
pub fn collect_layout(entries: &[DescriptorLayout]) -> Vec<DescriptorLayout> {
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.ty == DescriptorType::End {
            assert_eq!(entry.offset, 0, "descriptor layout terminator with non-zero offset");
            break;
        }
        out.push(*entry);
    }

    let slots = native_slots(&out);
    for (i, (binding, _)) in slots.iter().enumerate() {
        assert!(
            !slots[..i].iter().any(|(b, _)| b == binding),
            "descriptor layout uses binding {} twice",
            binding
        );
    }
    out
}

/// Native binding slot of `entries[position]`
pub fn binding_at(entries: &[DescriptorLayout], position: usize) -> u32 {
    entries[position].binding.unwrap_or(position as u32)
}

/// Native slot of the sampler half of `entries[position]`
pub fn sampler_binding_at(entries: &[DescriptorLayout], position: usize) -> u32 {
    entries[position]
        .sampler_binding
        .unwrap_or(binding_at(entries, position) + 1)
}

/// Every native slot a layout occupies, in entry order
///
/// A `CombinedSampler` entry takes two: the texture at its binding, reported
/// as `CombinedSampler`, and the sampler at its sampler binding.
pub fn native_slots(entries: &[DescriptorLayout]) -> Vec<(u32, DescriptorType)> {
    let mut slots = Vec::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        slots.push((binding_at(entries, position), entry.ty));
        if entry.ty == DescriptorType::CombinedSampler {
            slots.push((sampler_binding_at(entries, position), DescriptorType::Sampler));
        }
    }
    slots
}

/// Descriptor type declared at native slot `binding`, if any
pub fn slot_at_binding(entries: &[DescriptorLayout], binding: u32) -> Option<DescriptorType> {
    native_slots(entries).into_iter().find(|(b, _)| *b == binding).map(|(_, ty)| ty)
}

/// Descriptor-set layout slot
#[derive(Debug)]
pub struct DescriptorSetLayout<N> {
    pub native: N,
    pub entries: Vec<DescriptorLayout>,
}

impl<N> DescriptorSetLayout<N> {
    /// Native binding slot of entry `position`
    pub fn binding_of(&self, position: usize) -> u32 {
        binding_at(&self.entries, position)
    }

    /// Native slot of the sampler half of combined entry `position`
    pub fn sampler_binding_of(&self, position: usize) -> u32 {
        sampler_binding_at(&self.entries, position)
    }

    /// Descriptor type declared at native slot `binding`, if any
    pub fn slot_at_binding(&self, binding: u32) -> Option<DescriptorType> {
        slot_at_binding(&self.entries, binding)
    }
}

/// Read a plain-data value (a handle or handle pair) from a data block
///
/// # Panics
///
/// If `offset + size_of::<T>()` runs past the end of `data`.
pub fn read_field<T: bytemuck::Pod>(data: &[u8], offset: u32) -> T {
    let start = offset as usize;
    let end = start + std::mem::size_of::<T>();
    assert!(
        end <= data.len(),
        "descriptor field [{}, {}) outside data block of {} bytes",
        start,
        end,
        data.len()
    );
    bytemuck::pod_read_unaligned(&data[start..end])
}

#[cfg(test)]
#[path = "descriptor_set_tests.rs"]
mod tests;
