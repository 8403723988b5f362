//! SPIR-V to desktop GLSL transpilation
//!
//! OpenGL has flat binding slots and no descriptor sets, so every resource
//! keeps its binding number and loses its set. Separate texture/sampler
//! pairs come out as combined `sampler2D` uniforms on the texture's unit;
//! [`GlslShader::sampler_units`] tells the backend which unit each sampler
//! object has to be bound to.
//!
//! Vertex shaders get their clip space converted to GL conventions: Y is
//! flipped and depth is remapped from `[0, 1]` to `[-1, 1]`, so images come
//! out upright in GL window coordinates.

use super::{ShaderMacros, ShaderStage};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const SOURCE: &str = "meridian::glsl";

/// Texture unit a reflected sampler is consumed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerUnit {
    pub set: u32,
    pub binding: u32,
    pub unit: u32,
}

/// Transpiled shader ready for `glShaderSource`
#[derive(Debug, Clone)]
pub struct GlslShader {
    pub source: String,
    pub sampler_units: Vec<SamplerUnit>,
}

impl GlslShader {
    /// Path the preprocessed source is dumped to
    pub fn prep_path(dir: &Path, name: &str, stage: ShaderStage) -> PathBuf {
        dir.join(format!("{}.{}.prep", name, stage.extension()))
    }

    /// Write the source to `<dir>/<name>.<ext>.prep` for inspection
    pub fn save(&self, dir: &Path, name: &str, stage: ShaderStage) -> Result<PathBuf> {
        let path = Self::prep_path(dir, name, stage);
        fs::write(&path, &self.source)?;
        crate::render_debug!(SOURCE, "Wrote preprocessed shader \"{}\"", path.display());
        Ok(path)
    }
}

/// Comment header naming the shader and its sorted macros
pub fn glsl_header(name: &str, macros: &ShaderMacros) -> String {
    let mut header = format!("// {}\n", name);
    for m in macros.sorted_strings() {
        header.push_str("// ");
        header.push_str(&m);
        header.push('\n');
    }
    header
}

fn transpile_error(name: &str, what: &str, detail: impl std::fmt::Display) -> Error {
    crate::render_error!(SOURCE, "Shader {} {}: {}", name, what, detail);
    Error::ShaderCompilationFailed(format!("{}: {}: {}", name, what, detail))
}

/// Translate SPIR-V to GLSL 4.30 with descriptor sets stripped
pub fn transpile_to_glsl(name: &str, macros: &ShaderMacros, spirv: &[u32], stage: ShaderStage) -> Result<GlslShader> {
    let bytes: Vec<u8> = spirv.iter().flat_map(|w| w.to_le_bytes()).collect();
    let module = naga::front::spv::parse_u8_slice(&bytes, &naga::front::spv::Options::default())
        .map_err(|e| transpile_error(name, "SPIR-V parse failed", e))?;
    let info = naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::all())
        .validate(&module)
        .map_err(|e| transpile_error(name, "validation failed", e))?;

    let mut binding_map = BTreeMap::new();
    for (_, var) in module.global_variables.iter() {
        if let Some(rb) = &var.binding {
            let slot = u8::try_from(rb.binding)
                .map_err(|_| transpile_error(name, "binding out of range", rb.binding))?;
            binding_map.insert(rb.clone(), slot);
        }
    }

    let options = naga::back::glsl::Options {
        version: naga::back::glsl::Version::Desktop(430),
        writer_flags: naga::back::glsl::WriterFlags::ADJUST_COORDINATE_SPACE,
        binding_map,
        ..Default::default()
    };
    let pipeline_options = naga::back::glsl::PipelineOptions {
        shader_stage: stage.to_naga(),
        entry_point: "main".to_string(),
        multiview: None,
    };

    let mut body = String::new();
    let reflection = naga::back::glsl::Writer::new(
        &mut body,
        &module,
        &info,
        &options,
        &pipeline_options,
        naga::proc::BoundsCheckPolicies::default(),
    )
    .and_then(|mut writer| writer.write())
    .map_err(|e| transpile_error(name, "GLSL generation failed", e))?;

    let mut sampler_units = Vec::new();
    for mapping in reflection.texture_mapping.values() {
        let texture = module.global_variables[mapping.texture].binding.as_ref();
        let sampler = mapping.sampler.and_then(|s| module.global_variables[s].binding.as_ref());
        if let (Some(texture), Some(sampler)) = (texture, sampler) {
            let unit = SamplerUnit { set: sampler.group, binding: sampler.binding, unit: texture.binding };
            if !sampler_units.contains(&unit) {
                sampler_units.push(unit);
            }
        }
    }
    sampler_units.sort_by_key(|u| (u.set, u.binding, u.unit));

    let source = format!("{}{}", glsl_header(name, macros), body);

    Ok(GlslShader { source, sampler_units })
}

#[cfg(test)]
#[path = "glsl_tests.rs"]
mod tests;
