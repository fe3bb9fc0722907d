//! Procedural lightning background.
//!
//! A single fragment shader draws a vertical bolt whose horizontal position is warped by
//! ten octaves of rotated value noise:
//!
//! ```text
//!   uv ──▶ fbm(uv·size + 0.8·t·speed) ──▶ warp uv.x ──▶ d = |uv.x|
//!                                                      │
//!   hsv(hue/360 + 0.05·t) ◀── core 0.020/(d²+0.0008) + halo 0.009/(d+0.020) × flicker
//! ```
//!
//! [`LightningRenderer`] is the frame-loop component. It owns a [`RenderBackend`]; the
//! [`gpu`] module provides the wgpu implementation and [`field`] evaluates the same function
//! on the CPU for still exports. An [`OverlaySlot`] lets the host hand the wgpu backend a
//! coverage image to blend over the bolt on every frame.

mod component;
pub mod field;
pub mod gpu;
mod overlay;
mod shader;
mod surface;
mod types;
mod uniforms;

pub use component::{BackendProvider, FrameTarget, LightningRenderer, RenderBackend};
pub use field::render_still;
pub use overlay::{OverlayImage, OverlaySlot};
pub use shader::{
    check_glsl, ShaderError, FRAGMENT_SHADER_GLSL, OVERLAY_FRAGMENT_SHADER_GLSL,
    OVERLAY_VERTEX_SHADER_GLSL, UNIFORM_BLOCK, VERTEX_SHADER_GLSL,
};
pub use surface::{clamp_pixel_ratio, swapchain_size, RenderSurface, Viewport};
pub use types::{LightningConfig, SurfaceHeight, SurfaceHeightError};
pub use uniforms::{LightningUniforms, UniformField, UniformLayout};

/// Why a lightning component could not be mounted.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// No usable surface, adapter or device.
    #[error("GPU rendering is unavailable: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Shader(#[from] ShaderError),
}

/// Why a frame could not be drawn.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The swapchain no longer matches the window; it has been reconfigured.
    #[error("surface outdated")]
    Outdated,
    #[error("timed out acquiring the next surface texture")]
    Timeout,
    #[error("GPU out of memory")]
    OutOfMemory,
    #[error("GPU validation failed: {0}")]
    Validation(String),
    #[error("surface error: {0}")]
    Surface(String),
}

impl FrameError {
    /// Whether the next frame may simply try again.
    pub fn is_transient(&self) -> bool {
        matches!(self, FrameError::Outdated | FrameError::Timeout)
    }
}
