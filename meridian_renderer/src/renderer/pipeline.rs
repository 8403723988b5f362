//! Pipeline descriptor: program plus the full fixed-function state snapshot

use crate::handle::{DsLayoutHandle, FragmentShaderHandle, RenderPassHandle, VertexShaderHandle};
use crate::shader::{ShaderResource, ShaderStage};

/// Maximum number of vertex attributes (bits of `vertex_attrib_mask`)
pub const MAX_VERTEX_ATTRIBS: usize = 16;
/// Maximum number of vertex buffer bindings
pub const MAX_VERTEX_BUFFERS: usize = 4;
/// Maximum number of descriptor sets a pipeline can use
pub const MAX_DESCRIPTOR_SETS: usize = 4;

/// Component type of a vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexFormat {
    #[default]
    Float,
    /// Unsigned bytes normalized to [0, 1]
    UNorm8,
}

impl VertexFormat {
    pub fn component_size(self) -> u32 {
        match self {
            VertexFormat::Float => 4,
            VertexFormat::UNorm8 => 1,
        }
    }
}

/// One vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VertexAttribute {
    /// Vertex buffer binding the attribute reads from
    pub buf_binding: u32,
    /// Number of components (1..=4)
    pub count: u32,
    pub format: VertexFormat,
    /// Byte offset inside one vertex
    pub offset: u32,
}

/// Per-binding vertex buffer layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VertexBufferLayout {
    pub stride: u32,
}

/// Everything needed to build a pipeline
///
/// Built with chained setters:
///
/// ```ignore
/// let desc = PipelineDesc::new("blit")
///     .vertex_shader(vs)
///     .fragment_shader(fs)
///     .render_pass(pass)
///     .vertex_attrib(0, VertexAttribute { buf_binding: 0, count: 2, format: VertexFormat::Float, offset: 0 })
///     .vertex_buffer_stride(0, 8)
///     .descriptor_set_layout(0, globals_layout);
/// ```
#[derive(Debug, Clone)]
pub struct PipelineDesc {
    pub name: String,
    pub vertex_shader: VertexShaderHandle,
    pub fragment_shader: FragmentShaderHandle,
    pub render_pass: RenderPassHandle,
    pub depth_write: bool,
    pub depth_test: bool,
    pub cull_faces: bool,
    pub scissor_test: bool,
    pub blending: bool,
    /// Bit `i` set means `vertex_attribs[i]` is enabled
    pub vertex_attrib_mask: u32,
    pub vertex_attribs: [VertexAttribute; MAX_VERTEX_ATTRIBS],
    pub vertex_buffers: [VertexBufferLayout; MAX_VERTEX_BUFFERS],
    pub descriptor_set_layouts: [DsLayoutHandle; MAX_DESCRIPTOR_SETS],
}

impl PipelineDesc {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vertex_shader: VertexShaderHandle::NONE,
            fragment_shader: FragmentShaderHandle::NONE,
            render_pass: RenderPassHandle::NONE,
            depth_write: false,
            depth_test: false,
            cull_faces: false,
            scissor_test: false,
            blending: false,
            vertex_attrib_mask: 0,
            vertex_attribs: [VertexAttribute::default(); MAX_VERTEX_ATTRIBS],
            vertex_buffers: [VertexBufferLayout::default(); MAX_VERTEX_BUFFERS],
            descriptor_set_layouts: [DsLayoutHandle::NONE; MAX_DESCRIPTOR_SETS],
        }
    }

    pub fn vertex_shader(mut self, h: VertexShaderHandle) -> Self {
        self.vertex_shader = h;
        self
    }

    pub fn fragment_shader(mut self, h: FragmentShaderHandle) -> Self {
        self.fragment_shader = h;
        self
    }

    pub fn render_pass(mut self, h: RenderPassHandle) -> Self {
        self.render_pass = h;
        self
    }

    pub fn depth_write(mut self, enable: bool) -> Self {
        self.depth_write = enable;
        self
    }

    pub fn depth_test(mut self, enable: bool) -> Self {
        self.depth_test = enable;
        self
    }

    pub fn cull_faces(mut self, enable: bool) -> Self {
        self.cull_faces = enable;
        self
    }

    pub fn scissor_test(mut self, enable: bool) -> Self {
        self.scissor_test = enable;
        self
    }

    pub fn blending(mut self, enable: bool) -> Self {
        self.blending = enable;
        self
    }

    pub fn vertex_attrib(mut self, location: u32, attrib: VertexAttribute) -> Self {
        assert!((location as usize) < MAX_VERTEX_ATTRIBS, "vertex attribute {} out of range", location);
        assert!((1..=4).contains(&attrib.count), "vertex attribute {} has {} components", location, attrib.count);
        self.vertex_attribs[location as usize] = attrib;
        self.vertex_attrib_mask |= 1 << location;
        self
    }

    pub fn vertex_buffer_stride(mut self, binding: u32, stride: u32) -> Self {
        assert!((binding as usize) < MAX_VERTEX_BUFFERS, "vertex buffer binding {} out of range", binding);
        self.vertex_buffers[binding as usize].stride = stride;
        self
    }

    pub fn descriptor_set_layout(mut self, index: u32, layout: DsLayoutHandle) -> Self {
        assert!((index as usize) < MAX_DESCRIPTOR_SETS, "descriptor set {} out of range", index);
        self.descriptor_set_layouts[index as usize] = layout;
        self
    }

    /// Enabled attributes as `(location, attribute)`, lowest location first
    pub fn enabled_attribs(&self) -> impl Iterator<Item = (u32, &VertexAttribute)> + '_ {
        set_bits(self.vertex_attrib_mask).map(move |bit| (bit, &self.vertex_attribs[bit as usize]))
    }
}

/// Indices of the set bits of `mask`, lowest first
pub fn set_bits(mut mask: u32) -> impl Iterator<Item = u32> {
    std::iter::from_fn(move || {
        if mask == 0 {
            return None;
        }
        let bit = mask.trailing_zeros();
        mask &= mask - 1;
        Some(bit)
    })
}

/// Attribute enable changes between two masks: `(location, now_enabled)`
///
/// Only locations whose state differs are produced.
pub fn changed_attribs(old_mask: u32, new_mask: u32) -> impl Iterator<Item = (u32, bool)> {
    set_bits(old_mask ^ new_mask).map(move |bit| (bit, new_mask & (1 << bit) != 0))
}

/// Pipeline slot
#[derive(Debug)]
pub struct Pipeline<N> {
    pub native: N,
    pub desc: PipelineDesc,
}

/// Compiled vertex or fragment shader slot
#[derive(Debug)]
pub struct Shader<N> {
    pub native: N,
    /// Source file the shader was compiled from
    pub name: String,
    pub stage: ShaderStage,
    pub resources: Vec<ShaderResource>,
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
