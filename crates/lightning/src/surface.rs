use frameloop::SurfaceMetrics;

use crate::types::SurfaceHeight;

pub const MIN_PIXEL_RATIO: f64 = 1.0;
pub const MAX_PIXEL_RATIO: f64 = 2.0;

/// Drawing-buffer sizing for the lightning surface.
///
/// The logical size is what the surface occupies in the host; the physical size is the
/// resolution the shader renders at, using a device pixel ratio clamped to `[1, 2]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSurface {
    pub logical_width: f64,
    pub logical_height: f64,
    pub pixel_ratio: f64,
    pub physical_width: u32,
    pub physical_height: u32,
}

/// Region of the swapchain the lightning is drawn into, in swapchain pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl RenderSurface {
    pub fn new(logical_width: f64, logical_height: f64, scale_factor: f64) -> Self {
        let logical_width = sanitize(logical_width);
        let logical_height = sanitize(logical_height);
        let pixel_ratio = clamp_pixel_ratio(scale_factor);
        Self {
            logical_width,
            logical_height,
            pixel_ratio,
            physical_width: physical(logical_width, pixel_ratio),
            physical_height: physical(logical_height, pixel_ratio),
        }
    }

    /// Sizes the surface for a host: full host width, configured height.
    pub fn for_host(metrics: &SurfaceMetrics, height: SurfaceHeight) -> Self {
        let logical_height = height.resolve(sanitize(metrics.logical_height));
        Self::new(metrics.logical_width, logical_height, metrics.scale_factor)
    }

    /// `[width, height]` handed to the shader as its resolution.
    pub fn resolution(&self) -> [f32; 2] {
        [self.physical_width as f32, self.physical_height as f32]
    }

    /// Where the surface lands in a host swapchain sized by [`swapchain_size`].
    pub fn viewport(&self, metrics: &SurfaceMetrics) -> Viewport {
        let (max_width, max_height) = swapchain_size(metrics);
        let scale = sanitize_scale(metrics.scale_factor);
        Viewport {
            width: physical(self.logical_width, scale).min(max_width),
            height: physical(self.logical_height, scale).min(max_height),
        }
    }
}

/// Physical size of the whole host surface at the host's own (unclamped) scale.
pub fn swapchain_size(metrics: &SurfaceMetrics) -> (u32, u32) {
    let scale = sanitize_scale(metrics.scale_factor);
    (
        physical(sanitize(metrics.logical_width), scale),
        physical(sanitize(metrics.logical_height), scale),
    )
}

pub fn clamp_pixel_ratio(scale_factor: f64) -> f64 {
    sanitize_scale(scale_factor).clamp(MIN_PIXEL_RATIO, MAX_PIXEL_RATIO)
}

fn physical(logical: f64, ratio: f64) -> u32 {
    let value = (logical * ratio).floor();
    if value >= u32::MAX as f64 {
        u32::MAX
    } else {
        (value as u32).max(1)
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

fn sanitize_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}
