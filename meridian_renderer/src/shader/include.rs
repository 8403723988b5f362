//! `#include` resolution

use crate::error::{Error, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fs;
use std::path::PathBuf;

/// Strategy for loading the body of an `#include "path"` directive
pub trait IncludeResolver {
    /// Return the text of `requested`, recording it as a dependency
    fn load(&mut self, requested: &str) -> Result<String>;

    /// Dependencies recorded since the last call, in first-visit order
    fn take_dependencies(&mut self) -> Vec<PathBuf>;
}

/// Loads includes relative to a base directory and keeps their bodies for
/// the lifetime of the resolver
#[derive(Debug, Default)]
pub struct FileIncluder {
    base_dir: PathBuf,
    bodies: FxHashMap<PathBuf, String>,
    visited: Vec<PathBuf>,
}

impl FileIncluder {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into(), ..Default::default() }
    }

    /// Number of include bodies currently held
    pub fn cached(&self) -> usize {
        self.bodies.len()
    }
}

impl IncludeResolver for FileIncluder {
    fn load(&mut self, requested: &str) -> Result<String> {
        let path = self.base_dir.join(requested);
        if !self.visited.contains(&path) {
            self.visited.push(path.clone());
        }
        if let Some(body) = self.bodies.get(&path) {
            return Ok(body.clone());
        }
        let body = fs::read_to_string(&path).map_err(|e| {
            Error::ShaderCompilationFailed(format!("include \"{}\" not readable: {}", path.display(), e))
        })?;
        self.bodies.insert(path, body.clone());
        Ok(body)
    }

    fn take_dependencies(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.visited)
    }
}

/// Parse an `#include "path"` or `#include <path>` line
fn parse_include_directive(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix('#')?.trim_start().strip_prefix("include")?.trim();
    if let Some(inner) = rest.strip_prefix('"') {
        inner.strip_suffix('"')
    } else if let Some(inner) = rest.strip_prefix('<') {
        inner.strip_suffix('>')
    } else {
        None
    }
}

const MAX_INCLUDE_DEPTH: usize = 32;

/// Replace every include directive in `source` with the resolved text
///
/// Each path is expanded at most once per call, so headers without include
/// guards can be pulled in from several places.
pub fn expand_includes(source: &str, resolver: &mut dyn IncludeResolver) -> Result<String> {
    let mut seen = FxHashSet::default();
    expand(source, resolver, &mut seen, 0)
}

fn expand(
    source: &str,
    resolver: &mut dyn IncludeResolver,
    seen: &mut FxHashSet<String>,
    depth: usize,
) -> Result<String> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(Error::ShaderCompilationFailed(format!(
            "includes nested deeper than {} levels",
            MAX_INCLUDE_DEPTH
        )));
    }

    let mut out = String::with_capacity(source.len());
    for line in source.lines() {
        match parse_include_directive(line) {
            Some(path) => {
                if seen.insert(path.to_string()) {
                    let body = resolver.load(path)?;
                    out.push_str(&expand(&body, resolver, seen, depth + 1)?);
                }
            }
            None => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "include_tests.rs"]
mod tests;
