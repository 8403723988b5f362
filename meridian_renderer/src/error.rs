//! Error types for the Meridian renderer
//!
//! Environment failures (native API errors, shader compile/link failures,
//! missing capabilities) are reported through [`Error`]. Contract violations
//! by the calling code are fatal assertions and never reach this type.

use std::fmt;

/// Result type for renderer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Renderer errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (OpenGL, Vulkan)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, buffer, shader, etc.)
    InvalidResource(String),

    /// Initialization failed (device, swapchain, required capability missing)
    InitializationFailed(String),

    /// Shader source could not be compiled or optimized to bytecode
    ShaderCompilationFailed(String),

    /// Vertex and fragment shader could not be linked into a program
    ShaderLinkFailed(String),

    /// File system error while loading sources or writing the shader cache
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::ShaderCompilationFailed(msg) => write!(f, "Shader compilation failed: {}", msg),
            Error::ShaderLinkFailed(msg) => write!(f, "Shader link failed: {}", msg),
            Error::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
