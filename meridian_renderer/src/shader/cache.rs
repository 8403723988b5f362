//! On-disk SPIR-V cache
//!
//! Two kinds of files live in the cache directory:
//! - `<key>.cache`: `version,hexHash[,dependency]*`, one per cache key
//! - `<8 hex digits>.spv`: raw SPIR-V words, one per content hash
//!
//! Any parse failure or staleness is a miss, never an error.

use super::ShaderMacros;
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Bump when compiler options change so the same source yields different bytecode
pub const SHADER_CACHE_VERSION: u32 = 20;

const SOURCE: &str = "meridian::shader_cache";

/// Cache key: the source name followed by `_MACRO` / `_MACRO=VALUE` for every
/// macro in sorted order
pub fn cache_key(name: &str, macros: &ShaderMacros) -> String {
    let mut key = name.to_string();
    for s in macros.sorted_strings() {
        key.push('_');
        key.push_str(&s);
    }
    key
}

/// SPIR-V magic number, first word of every module
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Words in a SPIR-V module header
pub const SPIRV_HEADER_WORDS: usize = 5;

/// Bytecode file name for a content hash: its low 32 bits in hex
pub fn spirv_file_name(hash: u64) -> String {
    format!("{:08x}.spv", hash as u32)
}

/// Parsed cache descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheData {
    pub version: u32,
    pub hash: u64,
    pub dependencies: Vec<String>,
}

impl CacheData {
    /// Parse a descriptor; `None` when malformed or from another version
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split(',');
        let version: u32 = parts.next()?.trim().parse().ok()?;
        if version != SHADER_CACHE_VERSION {
            crate::render_debug!(SOURCE, "Cache version mismatch, found {} expected {}", version, SHADER_CACHE_VERSION);
            return None;
        }
        let hash = u64::from_str_radix(parts.next()?.trim(), 16).ok()?;
        let dependencies = parts.filter(|p| !p.is_empty()).map(str::to_string).collect();
        Some(Self { version, hash, dependencies })
    }

    pub fn serialize(&self) -> String {
        let mut out = format!("{},{:x}", self.version, self.hash);
        for dep in &self.dependencies {
            out.push(',');
            out.push_str(dep);
        }
        out
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// SPIR-V cache rooted at one directory
#[derive(Debug, Clone)]
pub struct SpirvCache {
    dir: PathBuf,
}

impl SpirvCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Descriptor file for `key`; path separators in the key are flattened
    pub fn descriptor_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.cache", key.replace(['/', '\\'], "_")))
    }

    /// Look up cached bytecode for `key`, compiled from `source_path`
    pub fn load(&self, key: &str, source_path: &Path) -> Option<Vec<u32>> {
        let descriptor = self.descriptor_path(key);
        let data = CacheData::parse(&fs::read_to_string(&descriptor).ok()?)?;

        let spv_path = self.dir.join(spirv_file_name(data.hash));
        if !spv_path.exists() {
            crate::render_debug!(SOURCE, "\"{}\" missing for \"{}\"", spv_path.display(), key);
            return None;
        }

        let cache_time = modified(&descriptor)?;
        match modified(source_path) {
            Some(t) if t <= cache_time => {}
            _ => {
                crate::render_info!(SOURCE, "Shader \"{}\" source is newer than cache, recompiling", key);
                return None;
            }
        }
        for dep in &data.dependencies {
            match modified(Path::new(dep)) {
                Some(t) if t <= cache_time => {}
                _ => {
                    crate::render_info!(SOURCE, "Include \"{}\" is newer than cache, recompiling", dep);
                    return None;
                }
            }
        }

        let bytes = fs::read(&spv_path).ok()?;
        if bytes.len() < SPIRV_HEADER_WORDS * 4 || bytes.len() % 4 != 0 {
            crate::render_warn!(SOURCE, "Shader \"{}\" has incorrect size {}", spv_path.display(), bytes.len());
            return None;
        }
        if xxhash_rust::xxh64::xxh64(&bytes, 0) != data.hash {
            crate::render_warn!(SOURCE, "Shader \"{}\" does not match its hash, recompiling", spv_path.display());
            return None;
        }
        let words: Vec<u32> = bytes.chunks_exact(4).map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]])).collect();
        if words[0] != SPIRV_MAGIC {
            crate::render_warn!(SOURCE, "Shader \"{}\" is not SPIR-V", spv_path.display());
            return None;
        }

        crate::render_debug!(SOURCE, "Loaded shader \"{}\" from cache", key);
        Some(words)
    }

    /// Write bytecode and its descriptor, returning the content hash
    pub fn store(&self, key: &str, spirv: &[u32], dependencies: &[PathBuf]) -> Result<u64> {
        fs::create_dir_all(&self.dir)?;

        let bytes: Vec<u8> = spirv.iter().flat_map(|w| w.to_le_bytes()).collect();
        let hash = xxhash_rust::xxh64::xxh64(&bytes, 0);
        let data = CacheData {
            version: SHADER_CACHE_VERSION,
            hash,
            dependencies: dependencies.iter().map(|d| d.to_string_lossy().into_owned()).collect(),
        };

        let spv_path = self.dir.join(spirv_file_name(hash));
        crate::render_debug!(SOURCE, "Writing shader \"{}\" to \"{}\"", key, spv_path.display());
        fs::write(&spv_path, &bytes)?;
        fs::write(self.descriptor_path(key), data.serialize())?;
        Ok(hash)
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
