//! Shader library: source loading, caching and compilation

use super::cache::{cache_key, SpirvCache};
use super::compiler::ShaderCompiler;
use super::include::{expand_includes, FileIncluder, IncludeResolver};
use super::{ShaderMacros, ShaderStage};
use crate::error::Result;
use crate::renderer::RendererConfig;
use rustc_hash::FxHashMap;
use std::fs;
use std::path::{Path, PathBuf};

const SOURCE: &str = "meridian::shader";

/// Where shader sources live and how compiled bytecode is treated
#[derive(Debug, Clone)]
pub struct ShaderLibraryDesc {
    pub shader_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub skip_cache: bool,
    pub optimize: bool,
}

impl From<&RendererConfig> for ShaderLibraryDesc {
    fn from(config: &RendererConfig) -> Self {
        Self {
            shader_dir: config.shader_dir.clone(),
            cache_dir: config.cache_dir.clone(),
            skip_cache: config.skip_shader_cache,
            optimize: config.optimize_shaders,
        }
    }
}

/// Compiles shader sources to SPIR-V, consulting and filling the disk cache
///
/// Source texts are kept in memory for the lifetime of the library so that
/// several variants of one file read it from disk only once.
pub struct ShaderLibrary<C: ShaderCompiler, R: IncludeResolver = FileIncluder> {
    compiler: C,
    includer: R,
    cache: SpirvCache,
    desc: ShaderLibraryDesc,
    sources: FxHashMap<PathBuf, String>,
}

impl<C: ShaderCompiler> ShaderLibrary<C, FileIncluder> {
    /// Library resolving includes relative to the shader directory
    pub fn new(compiler: C, desc: ShaderLibraryDesc) -> Self {
        let includer = FileIncluder::new(&desc.shader_dir);
        Self::with_resolver(compiler, includer, desc)
    }
}

impl<C: ShaderCompiler, R: IncludeResolver> ShaderLibrary<C, R> {
    pub fn with_resolver(compiler: C, includer: R, desc: ShaderLibraryDesc) -> Self {
        Self {
            compiler,
            includer,
            cache: SpirvCache::new(&desc.cache_dir),
            desc,
            sources: FxHashMap::default(),
        }
    }

    pub fn desc(&self) -> &ShaderLibraryDesc {
        &self.desc
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// Path of a shader source
    pub fn source_path(&self, name: &str) -> PathBuf {
        self.desc.shader_dir.join(name)
    }

    /// Compile `name` (relative to the shader directory) with `macros`
    ///
    /// # Errors
    ///
    /// Unreadable sources or includes, compiler and optimizer failures.
    pub fn compile(&mut self, name: &str, macros: &ShaderMacros, stage: ShaderStage) -> Result<Vec<u32>> {
        let key = cache_key(name, macros);
        let path = self.source_path(name);

        if !self.desc.skip_cache {
            if let Some(spirv) = self.cache.load(&key, &path) {
                crate::render_debug!(SOURCE, "\"{}\" found in cache", key);
                return Ok(spirv);
            }
            crate::render_debug!(SOURCE, "\"{}\" not found in cache", key);
        }

        let source = self.load_source(&path)?;
        self.includer.take_dependencies();
        let expanded = expand_includes(&source, &mut self.includer)?;
        let dependencies = self.includer.take_dependencies();

        crate::render_info!(SOURCE, "Compiling {} shader \"{}\"", stage, key);
        let mut spirv = self.compiler.compile(name, &expanded, stage, macros)?;
        if self.desc.optimize {
            spirv = self.compiler.optimize(name, &spirv, stage)?;
        }

        if !self.desc.skip_cache {
            if let Err(e) = self.cache.store(&key, &spirv, &dependencies) {
                crate::render_warn!(SOURCE, "Could not write \"{}\" to the shader cache: {}", key, e);
            }
        }

        Ok(spirv)
    }

    fn load_source(&mut self, path: &Path) -> Result<String> {
        if let Some(source) = self.sources.get(path) {
            return Ok(source.clone());
        }
        let source = fs::read_to_string(path).map_err(|e| {
            crate::render_error!(SOURCE, "Failed to read shader source \"{}\": {}", path.display(), e);
            crate::error::Error::Io(format!("{}: {}", path.display(), e))
        })?;
        self.sources.insert(path.to_path_buf(), source.clone());
        Ok(source)
    }
}

#[cfg(test)]
#[path = "library_tests.rs"]
mod tests;
