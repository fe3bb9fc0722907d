//! wgpu implementation of the lightning render backend.
//!
//! ```text
//!   WgpuProvider::create ──▶ GpuContext (instance, surface, device, queue)
//!                        ├─▶ ShaderProgram (modules, pipeline, quad, uniforms)
//!                        └─▶ OverlayProgram (coverage texture, blended over the bolt)
//! ```
//!
//! Every frame is encoded inside validation and out-of-memory error scopes; anything they
//! catch is reported as a fatal [`FrameError`].

mod context;
mod overlay;
mod program;

use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::component::{BackendProvider, FrameTarget, RenderBackend};
use crate::overlay::OverlaySlot;
use crate::uniforms::LightningUniforms;
use crate::{FrameError, SetupError};

use self::context::GpuContext;
use self::overlay::OverlayProgram;
use self::program::ShaderProgram;

/// Creates GPU backends that present into a window.
pub struct WgpuProvider<W> {
    target: Arc<W>,
    overlay: Option<OverlaySlot>,
}

impl<W> WgpuProvider<W> {
    pub fn new(target: Arc<W>) -> Self {
        Self {
            target,
            overlay: None,
        }
    }

    /// Blends whatever is published to `slot` over every frame.
    pub fn with_overlay(mut self, slot: OverlaySlot) -> Self {
        self.overlay = Some(slot);
        self
    }
}

impl<W> BackendProvider for WgpuProvider<W>
where
    W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
{
    type Backend = WgpuBackend;

    fn create(&mut self, target: &FrameTarget) -> Result<WgpuBackend, SetupError> {
        let (width, height) = target.swapchain;
        let context = GpuContext::new(Arc::clone(&self.target), width, height)?;
        let program = ShaderProgram::new(&context.device, context.format())?;
        let overlay = match &self.overlay {
            Some(slot) => Some(OverlayPass {
                slot: slot.clone(),
                program: OverlayProgram::new(&context.device, context.format())?,
                seen: 0,
            }),
            None => None,
        };
        tracing::info!(
            adapter = %context.adapter_name,
            uniforms = program.layout().present().count(),
            overlay = overlay.is_some(),
            "lightning program ready"
        );
        Ok(WgpuBackend {
            program,
            overlay,
            context,
        })
    }
}

struct OverlayPass {
    slot: OverlaySlot,
    program: OverlayProgram,
    seen: u64,
}

/// Live GPU state of one mounted lightning component.
pub struct WgpuBackend {
    // Field order matters: the programs must drop before the device that owns them.
    program: ShaderProgram,
    overlay: Option<OverlayPass>,
    context: GpuContext,
}

impl RenderBackend for WgpuBackend {
    fn resize(&mut self, width: u32, height: u32) {
        if self.context.resize(width, height) {
            tracing::debug!(width, height, "resized lightning swapchain");
        }
    }

    fn draw(&mut self, target: &FrameTarget, uniforms: &LightningUniforms) -> Result<(), FrameError> {
        let frame = match self.context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                self.context.reconfigure();
                return Err(FrameError::Outdated);
            }
            Err(wgpu::SurfaceError::Timeout) => return Err(FrameError::Timeout),
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(FrameError::OutOfMemory),
            Err(other) => return Err(FrameError::Surface(other.to_string())),
        };

        let (max_width, max_height) = self.context.size();
        let mut viewport = target.viewport;
        viewport.width = viewport.width.clamp(1, max_width);
        viewport.height = viewport.height.clamp(1, max_height);

        let device = &self.context.device;
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        self.program.write_uniforms(&self.context.queue, uniforms);
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("lightning encoder"),
        });
        self.program.encode(&mut encoder, &view, viewport);
        if let Some(pass) = self.overlay.as_mut() {
            let queue = &self.context.queue;
            let program = &mut pass.program;
            pass.seen = pass
                .slot
                .sync(pass.seen, |image| program.upload(device, queue, image));
            program.encode(&mut encoder, &view, (max_width, max_height));
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));

        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());
        if let Some(err) = validation {
            return Err(FrameError::Validation(err.to_string()));
        }
        if out_of_memory.is_some() {
            return Err(FrameError::OutOfMemory);
        }

        frame.present();
        Ok(())
    }

    fn context_lost(&mut self) -> Option<String> {
        self.context.poll_lost()
    }
}
