//! Native side of the ephemeral ring buffer
//!
//! Outside debug mode the buffer is persistently and coherently mapped, so
//! ephemeral data is a plain memcpy. In debug mode it is updated with
//! `glBufferSubData` so that tools can see every upload.

use glow::HasContext;
use meridian_renderer::meridian::Result;
use std::ptr::NonNull;

const SOURCE: &str = "meridian::gl";

pub struct GlRingBuffer {
    pub buffer: glow::Buffer,
    pub size: u32,
    mapped: Option<NonNull<u8>>,
}

impl GlRingBuffer {
    /// # Safety
    ///
    /// `gl` must be current on this thread.
    pub unsafe fn new(gl: &glow::Context, size: u32, persistent: bool) -> Result<Self> {
        let buffer = gl
            .create_buffer()
            .map_err(|e| meridian_renderer::render_err!(SOURCE, "Failed to create ring buffer: {}", e))?;
        gl.bind_buffer(glow::COPY_WRITE_BUFFER, Some(buffer));

        let mapped = if persistent {
            let flags = glow::MAP_WRITE_BIT | glow::MAP_PERSISTENT_BIT | glow::MAP_COHERENT_BIT;
            gl.buffer_storage(glow::COPY_WRITE_BUFFER, size as i32, None, flags);
            let ptr = gl.map_buffer_range(glow::COPY_WRITE_BUFFER, 0, size as i32, flags);
            match NonNull::new(ptr) {
                Some(ptr) => Some(ptr),
                None => {
                    gl.delete_buffer(buffer);
                    meridian_renderer::render_bail!(SOURCE, "Failed to map {} byte ring buffer", size);
                }
            }
        } else {
            gl.buffer_storage(glow::COPY_WRITE_BUFFER, size as i32, None, glow::DYNAMIC_STORAGE_BIT);
            None
        };
        gl.bind_buffer(glow::COPY_WRITE_BUFFER, None);

        Ok(Self { buffer, size, mapped })
    }

    /// Copy `data` to `offset`
    ///
    /// # Safety
    ///
    /// `gl` must be current, and `offset + data.len()` must not exceed `size`.
    pub unsafe fn write(&self, gl: &glow::Context, offset: u32, data: &[u8]) {
        debug_assert!(offset as usize + data.len() <= self.size as usize);
        match self.mapped {
            Some(ptr) => std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr().add(offset as usize), data.len()),
            None => {
                gl.bind_buffer(glow::COPY_WRITE_BUFFER, Some(self.buffer));
                gl.buffer_sub_data_u8_slice(glow::COPY_WRITE_BUFFER, offset as i32, data);
                gl.bind_buffer(glow::COPY_WRITE_BUFFER, None);
            }
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped.is_some()
    }

    /// # Safety
    ///
    /// `gl` must be current and no pending GPU work may read the buffer.
    pub unsafe fn destroy(self, gl: &glow::Context) {
        if self.mapped.is_some() {
            gl.bind_buffer(glow::COPY_WRITE_BUFFER, Some(self.buffer));
            gl.unmap_buffer(glow::COPY_WRITE_BUFFER);
            gl.bind_buffer(glow::COPY_WRITE_BUFFER, None);
        }
        gl.delete_buffer(self.buffer);
    }
}
