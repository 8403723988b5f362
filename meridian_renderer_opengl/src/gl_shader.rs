//! GL shader objects and program linking

use glow::HasContext;
use meridian_renderer::meridian::shader::{SamplerUnit, ShaderStage};
use meridian_renderer::meridian::{Error, Result};

const SOURCE: &str = "meridian::gl";

/// Compiled GL shader plus the sampler routing its GLSL needs
pub struct GlShader {
    pub shader: glow::Shader,
    pub sampler_units: Vec<SamplerUnit>,
}

fn gl_stage(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

/// Compile transpiled GLSL
///
/// # Safety
///
/// `gl` must be current on this thread.
pub unsafe fn compile_shader(gl: &glow::Context, name: &str, stage: ShaderStage, source: &str) -> Result<glow::Shader> {
    let shader = gl
        .create_shader(gl_stage(stage))
        .map_err(|e| meridian_renderer::render_err!(SOURCE, "Failed to create {} shader \"{}\": {}", stage, name, e))?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);

    if !gl.get_shader_compile_status(shader) {
        let log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        meridian_renderer::render_error!(SOURCE, "GLSL compile of \"{}\" failed:\n{}", name, log);
        return Err(Error::ShaderCompilationFailed(format!("{}: {}", name, log)));
    }
    Ok(shader)
}

/// Link a vertex and fragment shader into a program
///
/// # Safety
///
/// `gl` must be current on this thread.
pub unsafe fn link_program(
    gl: &glow::Context,
    name: &str,
    vertex: glow::Shader,
    fragment: glow::Shader,
) -> Result<glow::Program> {
    let program = gl
        .create_program()
        .map_err(|e| meridian_renderer::render_err!(SOURCE, "Failed to create program \"{}\": {}", name, e))?;
    gl.attach_shader(program, vertex);
    gl.attach_shader(program, fragment);
    gl.link_program(program);
    gl.detach_shader(program, vertex);
    gl.detach_shader(program, fragment);

    if !gl.get_program_link_status(program) {
        let log = gl.get_program_info_log(program);
        gl.delete_program(program);
        meridian_renderer::render_error!(SOURCE, "Link of pipeline \"{}\" failed:\n{}", name, log);
        return Err(Error::ShaderLinkFailed(format!("{}: {}", name, log)));
    }
    let log = gl.get_program_info_log(program);
    if !log.trim().is_empty() {
        meridian_renderer::render_warn!(SOURCE, "Link log of pipeline \"{}\":\n{}", name, log);
    }
    Ok(program)
}

/// Union of both stages' sampler routing
pub fn merge_sampler_units(vertex: &[SamplerUnit], fragment: &[SamplerUnit]) -> Vec<SamplerUnit> {
    let mut units = vertex.to_vec();
    for unit in fragment {
        if !units.contains(unit) {
            units.push(*unit);
        }
    }
    units.sort_by_key(|u| (u.set, u.binding, u.unit));
    units
}

/// Texture units the sampler at (`set`, `binding`) must be bound to
pub fn units_for_sampler(units: &[SamplerUnit], set: u32, binding: u32) -> Vec<u32> {
    units.iter().filter(|u| u.set == set && u.binding == binding).map(|u| u.unit).collect()
}

#[cfg(test)]
#[path = "gl_shader_tests.rs"]
mod tests;
