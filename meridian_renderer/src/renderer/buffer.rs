//! Buffer slots: permanent GPU buffers and ring-backed ephemeral buffers

/// Buffer slot stored in the renderer's resource table
///
/// A permanent buffer owns its native object and starts at offset 0.
/// An ephemeral buffer aliases the shared ring buffer at `begin_offset`
/// and is reclaimed in bulk when its frame is presented.
#[derive(Debug)]
pub struct Buffer<N> {
    /// Native buffer object (the ring buffer's object for ephemeral buffers)
    pub native: N,
    /// Size in bytes
    pub size: u32,
    /// Whether this allocation lives in the ring buffer
    pub ring_buffer_alloc: bool,
    /// Byte offset of the data inside `native`
    pub begin_offset: u32,
    /// Ring buffer generation the allocation was made in (ephemeral only)
    pub ring_generation: u32,
}

impl<N> Buffer<N> {
    /// Assert the residency invariants of this buffer
    ///
    /// `ring_capacity` is the capacity of the ring buffer generation this
    /// buffer was carved from (`None` if that generation never existed).
    /// Ring-backed buffers must lie inside it; permanent buffers always
    /// start at offset 0 and ignore it.
    ///
    /// # Panics
    ///
    /// On a violated invariant.
    pub fn assert_resident(&self, ring_capacity: Option<u32>) {
        assert!(self.size > 0, "buffer has zero size");
        if self.ring_buffer_alloc {
            let capacity = ring_capacity.unwrap_or_else(|| {
                panic!("ephemeral buffer from unknown ring buffer generation {}", self.ring_generation)
            });
            assert!(
                self.begin_offset as u64 + self.size as u64 <= capacity as u64,
                "ephemeral buffer [{}, +{}) outside ring buffer of {} bytes",
                self.begin_offset,
                self.size,
                capacity
            );
        } else {
            assert_eq!(self.begin_offset, 0, "permanent buffer with non-zero offset");
        }
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
