//! GLSL to SPIR-V compilation

use super::{ShaderMacros, ShaderStage};
use crate::error::{Error, Result};

const SOURCE: &str = "meridian::shader";

/// Native bytecode compiler behind the shader library
pub trait ShaderCompiler {
    /// Compile fully include-expanded GLSL to SPIR-V words
    fn compile(&mut self, name: &str, source: &str, stage: ShaderStage, macros: &ShaderMacros) -> Result<Vec<u32>>;

    /// Performance and canonicalization pass over compiled bytecode
    ///
    /// The output must be deterministic for semantically identical input.
    fn optimize(&mut self, name: &str, spirv: &[u32], stage: ShaderStage) -> Result<Vec<u32>> {
        let _ = (name, stage);
        Ok(spirv.to_vec())
    }
}

/// [`ShaderCompiler`] built on naga's GLSL frontend and SPIR-V backend
#[derive(Debug, Default)]
pub struct NagaCompiler;

impl NagaCompiler {
    pub fn new() -> Self {
        Self
    }

    fn validate(name: &str, module: &naga::Module) -> Result<naga::valid::ModuleInfo> {
        naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::all())
            .validate(module)
            .map_err(|e| {
                crate::render_error!(SOURCE, "Shader {} failed validation: {}", name, e);
                Error::ShaderCompilationFailed(format!("{}: validation error: {}", name, e))
            })
    }

    fn write_spirv(
        name: &str,
        module: &naga::Module,
        info: &naga::valid::ModuleInfo,
        stage: ShaderStage,
    ) -> Result<Vec<u32>> {
        let options = naga::back::spv::Options {
            lang_version: (1, 3),
            flags: naga::back::spv::WriterFlags::empty(),
            ..Default::default()
        };
        let pipeline_options = naga::back::spv::PipelineOptions {
            shader_stage: stage.to_naga(),
            entry_point: "main".to_string(),
        };
        naga::back::spv::write_vec(module, info, &options, Some(&pipeline_options)).map_err(|e| {
            crate::render_error!(SOURCE, "Shader {} SPIR-V generation failed: {}", name, e);
            Error::ShaderCompilationFailed(format!("{}: SPIR-V generation error: {}", name, e))
        })
    }
}

impl ShaderCompiler for NagaCompiler {
    fn compile(&mut self, name: &str, source: &str, stage: ShaderStage, macros: &ShaderMacros) -> Result<Vec<u32>> {
        let mut defines = naga::FastHashMap::default();
        for (macro_name, value) in macros.iter() {
            defines.insert(macro_name.to_string(), value.to_string());
        }

        let options = naga::front::glsl::Options { stage: stage.to_naga(), defines };
        let module = naga::front::glsl::Frontend::default().parse(&options, source).map_err(|errors| {
            crate::render_error!(SOURCE, "Shader {} compile failed:\n{}", name, errors);
            Error::ShaderCompilationFailed(format!("{}:\n{}", name, errors))
        })?;

        let info = Self::validate(name, &module)?;
        Self::write_spirv(name, &module, &info, stage)
    }

    fn optimize(&mut self, name: &str, spirv: &[u32], stage: ShaderStage) -> Result<Vec<u32>> {
        let bytes: Vec<u8> = spirv.iter().flat_map(|w| w.to_le_bytes()).collect();
        let mut module = naga::front::spv::parse_u8_slice(&bytes, &naga::front::spv::Options::default())
            .map_err(|e| {
                crate::render_error!(SOURCE, "Shader {} optimization failed: {}", name, e);
                Error::ShaderCompilationFailed(format!("{}: optimization failed: {}", name, e))
            })?;
        naga::compact::compact(&mut module);

        let info = Self::validate(name, &module)?;
        Self::write_spirv(name, &module, &info, stage)
    }
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod tests;
