//! Startup capability checks

use meridian_renderer::meridian::{Error, Result};
use std::collections::HashSet;

/// Oldest context the transpiled GLSL 4.30 shaders run on
pub const MIN_VERSION: (u32, u32) = (4, 3);

/// Extensions needed beyond the minimum version, with the version they became core in
pub const REQUIRED_EXTENSIONS: [(&str, (u32, u32)); 1] = [("GL_ARB_buffer_storage", (4, 4))];

/// Names of required features the context lacks
pub fn missing_features(version: (u32, u32), extensions: &HashSet<String>) -> Vec<String> {
    let mut missing = Vec::new();
    if version < MIN_VERSION {
        missing.push(format!("OpenGL {}.{}", MIN_VERSION.0, MIN_VERSION.1));
    }
    for (name, core) in REQUIRED_EXTENSIONS {
        if version < core && !extensions.contains(name) {
            missing.push(name.to_string());
        }
    }
    missing
}

/// Fail initialization if anything in [`missing_features`] is absent
pub fn check_capabilities(version: (u32, u32), extensions: &HashSet<String>) -> Result<()> {
    let missing = missing_features(version, extensions);
    if missing.is_empty() {
        return Ok(());
    }
    let message = format!("Missing required OpenGL features: {}", missing.join(", "));
    meridian_renderer::render_error!("meridian::gl", "{}", message);
    Err(Error::InitializationFailed(message))
}

#[cfg(test)]
#[path = "gl_capabilities_tests.rs"]
mod tests;
