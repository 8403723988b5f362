//! Shader build pipeline
//!
//! GLSL source goes through `#include` expansion and macro injection, is
//! compiled to SPIR-V (optionally optimized), and is cached on disk keyed by
//! the source name and the sorted macro set. Backends consume the SPIR-V
//! directly (Vulkan) or transpile it back to GLSL with descriptor sets
//! flattened away (OpenGL).
//!
//! ```ignore
//! let mut library = ShaderLibrary::new(NagaCompiler::new(), ShaderLibraryDesc::from(&config));
//! let mut macros = ShaderMacros::new();
//! macros.define_value("SAMPLES", "4");
//! let spirv = library.compile("blur.frag", &macros, ShaderStage::Fragment)?;
//! ```

mod cache;
mod compiler;
mod glsl;
mod include;
mod library;
mod reflect;
mod validate;

pub use cache::{cache_key, spirv_file_name, CacheData, SpirvCache, SHADER_CACHE_VERSION};
pub use compiler::{NagaCompiler, ShaderCompiler};
pub use glsl::{glsl_header, transpile_to_glsl, GlslShader, SamplerUnit};
pub use include::{expand_includes, FileIncluder, IncludeResolver};
pub use library::{ShaderLibrary, ShaderLibraryDesc};
pub use reflect::reflect_resources;
pub use validate::check_shader_resources;

use crate::renderer::DescriptorType;
use std::collections::BTreeMap;
use std::fmt;

/// Pipeline stage a shader is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// File extension of sources for this stage
    pub fn extension(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::Fragment => "frag",
        }
    }

    pub(crate) fn to_naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        })
    }
}

/// Preprocessor definitions injected into a shader compile
///
/// A macro with an empty value is defined without one (`#define NAME`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderMacros {
    defines: BTreeMap<String, String>,
}

impl ShaderMacros {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define `name` without a value
    pub fn define(&mut self, name: &str) -> &mut Self {
        self.defines.insert(name.to_string(), String::new());
        self
    }

    pub fn define_value(&mut self, name: &str, value: impl ToString) -> &mut Self {
        self.defines.insert(name.to_string(), value.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.defines.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Every macro rendered as `NAME` or `NAME=VALUE`, sorted lexicographically
    pub fn sorted_strings(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .iter()
            .map(|(name, value)| if value.is_empty() { name.to_string() } else { format!("{}={}", name, value) })
            .collect();
        out.sort();
        out
    }
}

impl<K: ToString, V: ToString> FromIterator<(K, V)> for ShaderMacros {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            defines: iter.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }
}

/// A resource binding reflected from shader bytecode
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderResource {
    pub name: String,
    pub set: u32,
    pub binding: u32,
    pub ty: DescriptorType,
}
