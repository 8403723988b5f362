/*!
# Meridian Renderer

Backend-neutral core of the Meridian graphics layer.

Client code records frames through the [`Renderer`](renderer::Renderer)
facade, which validates every call and forwards it to a backend
[`Device`](renderer::Device). Backends live in their own crates
(`meridian_renderer_opengl`, `meridian_renderer_vulkan`).

## Architecture

- **ResourceTable**: generation-checked handle storage for every object kind
- **Renderer**: resource lifetime, frame/pass state machine, ring buffer
- **Device**: native translation implemented by each backend
- **shader**: GLSL compilation to SPIR-V, disk cache, reflection and
  SPIR-V to GLSL transpilation for the immediate-mode backend
*/

mod error;
pub mod handle;
pub mod log;
pub mod renderer;
pub mod resource_table;
pub mod shader;
pub mod utils;

// Main meridian namespace module
pub mod meridian {
    // Error types
    pub use crate::error::{Error, Result};

    // Facade and backend interface
    pub use crate::renderer::{Device, Renderer, RendererConfig};

    // Logging sub-module (types only, macros are exported at the crate root)
    pub mod log {
        pub use crate::log::{DefaultLogger, Log, LogEntry, LogSeverity, Logger};
    }

    // Render sub-module with all rendering types
    pub mod render {
        pub use crate::handle::*;
        pub use crate::renderer::*;
    }

    pub mod shader {
        pub use crate::shader::*;
    }
}

// Re-export math library at crate root
pub use glam;
