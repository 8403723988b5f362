/*!
# Meridian Renderer - OpenGL Backend

Immediate-mode implementation of the Meridian [`Device`] trait on top of
`glow`. Shaders arrive as SPIR-V and are transpiled to GLSL 4.30 with their
descriptor sets flattened into binding slots.

The application owns the window and the current GL context:

```no_run
use meridian_renderer::meridian::{Renderer, RendererConfig};
use meridian_renderer_opengl::{GlDevice, GlSurface};

fn run<S: GlSurface>(gl: glow::Context, surface: S) -> meridian_renderer::meridian::Result<()> {
    let config = RendererConfig::default();
    let device = GlDevice::new(gl, surface, &config)?;
    let mut renderer = Renderer::new(device, config)?;
    renderer.begin_frame()?;
    // ...
    Ok(())
}
```

[`Device`]: meridian_renderer::meridian::Device
*/

mod gl_capabilities;
mod gl_device;
mod gl_format;
mod gl_ring_buffer;
mod gl_shader;
mod gl_surface;

pub use gl_capabilities::{check_capabilities, missing_features, MIN_VERSION, REQUIRED_EXTENSIONS};
pub use gl_device::{GlDevice, GlPipeline, GlRenderTarget};
pub use gl_format::{gl_format, GlFormat};
pub use gl_shader::GlShader;
pub use gl_surface::GlSurface;
