use std::time::Duration;

use anyhow::Context;
use frameloop::{
    Component, EventResponse, FrameContext, FrameOutcome, HostEvent, HostEventKind, Registrar,
    SurfaceMetrics,
};
use tracing::{debug, error, info, warn};

use crate::surface::{swapchain_size, RenderSurface, Viewport};
use crate::types::{LightningConfig, SurfaceHeight};
use crate::uniforms::LightningUniforms;
use crate::{FrameError, SetupError};

/// Sizing of one frame: the shader's drawing buffer and where it lands in the swapchain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTarget {
    pub surface: RenderSurface,
    pub swapchain: (u32, u32),
    pub viewport: Viewport,
}

impl FrameTarget {
    pub fn for_host(metrics: &SurfaceMetrics, height: SurfaceHeight) -> Self {
        let surface = RenderSurface::for_host(metrics, height);
        Self {
            surface,
            swapchain: swapchain_size(metrics),
            viewport: surface.viewport(metrics),
        }
    }
}

/// GPU side of the lightning component.
pub trait RenderBackend {
    /// Reconfigures the swapchain to a new physical size.
    fn resize(&mut self, width: u32, height: u32);

    /// Pushes `uniforms`, issues one draw and presents.
    fn draw(&mut self, target: &FrameTarget, uniforms: &LightningUniforms) -> Result<(), FrameError>;

    /// Reason the device was lost, once it has been.
    fn context_lost(&mut self) -> Option<String>;
}

/// Acquires a [`RenderBackend`] during mount.
pub trait BackendProvider {
    type Backend: RenderBackend;

    fn create(&mut self, target: &FrameTarget) -> Result<Self::Backend, SetupError>;
}

/// Animated lightning background as a frame-loop component.
///
/// Setup failure leaves nothing behind. Context loss stops the loop; a restored context
/// asks the host to rebuild the scene.
pub struct LightningRenderer<P: BackendProvider> {
    config: LightningConfig,
    provider: P,
    backend: Option<P::Backend>,
    metrics: SurfaceMetrics,
    target: Option<FrameTarget>,
    uniforms: LightningUniforms,
    mounted_at: Duration,
    context_lost: bool,
}

impl<P: BackendProvider> LightningRenderer<P> {
    pub fn new(config: LightningConfig, provider: P) -> Self {
        let uniforms = LightningUniforms::from_config(&config);
        Self {
            config,
            provider,
            backend: None,
            metrics: SurfaceMetrics::default(),
            target: None,
            uniforms,
            mounted_at: Duration::ZERO,
            context_lost: false,
        }
    }

    pub fn config(&self) -> &LightningConfig {
        &self.config
    }

    /// Sizing used by the most recent frame.
    pub fn frame_target(&self) -> Option<&FrameTarget> {
        self.target.as_ref()
    }

    pub fn is_context_lost(&self) -> bool {
        self.context_lost
    }
}

impl<P: BackendProvider> Component for LightningRenderer<P> {
    fn name(&self) -> &str {
        "lightning"
    }

    fn mount(&mut self, registrar: &mut Registrar<'_>, now: Duration) -> anyhow::Result<()> {
        registrar.listen(HostEventKind::Resize);
        registrar.listen(HostEventKind::ContextLost);
        registrar.listen(HostEventKind::ContextRestored);

        self.metrics = registrar.surface_metrics();
        let target = FrameTarget::for_host(&self.metrics, self.config.height);
        let backend = self
            .provider
            .create(&target)
            .context("lightning renderer setup failed")?;

        self.backend = Some(backend);
        self.target = Some(target);
        self.mounted_at = now;
        self.context_lost = false;
        debug!(
            width = target.surface.physical_width,
            height = target.surface.physical_height,
            pixel_ratio = target.surface.pixel_ratio,
            hue = self.config.hue,
            speed = self.config.speed,
            "lightning mounted"
        );
        Ok(())
    }

    fn frame(&mut self, frame: &FrameContext) -> FrameOutcome {
        if self.context_lost {
            return FrameOutcome::Stop;
        }
        let Some(backend) = self.backend.as_mut() else {
            return FrameOutcome::Stop;
        };
        if let Some(reason) = backend.context_lost() {
            warn!(%reason, "GPU device lost; lightning stopped");
            self.context_lost = true;
            return FrameOutcome::Stop;
        }

        let target = FrameTarget::for_host(&self.metrics, self.config.height);
        if self.target.map(|previous| previous.swapchain) != Some(target.swapchain) {
            let (width, height) = target.swapchain;
            backend.resize(width, height);
        }
        self.target = Some(target);

        self.uniforms.resolution = target.surface.resolution();
        self.uniforms.time = frame.now.saturating_sub(self.mounted_at).as_secs_f32();

        match backend.draw(&target, &self.uniforms) {
            Ok(()) => FrameOutcome::Continue,
            Err(err) if err.is_transient() => {
                debug!(error = %err, frame = frame.frame_index, "skipping frame");
                FrameOutcome::Continue
            }
            Err(err) => {
                error!(error = %err, frame = frame.frame_index, "lightning render error; stopping");
                FrameOutcome::Stop
            }
        }
    }

    fn handle_event(&mut self, event: &HostEvent) -> EventResponse {
        match event {
            HostEvent::Resize(metrics) => {
                self.metrics = *metrics;
                EventResponse::Handled
            }
            HostEvent::ContextLost => {
                if !self.context_lost {
                    warn!("rendering context lost; lightning paused");
                }
                self.context_lost = true;
                EventResponse::Handled
            }
            HostEvent::ContextRestored => {
                info!("rendering context restored; requesting scene reload");
                EventResponse::Reload
            }
        }
    }

    fn unmount(&mut self) {
        if self.backend.take().is_some() {
            debug!("lightning GPU resources released");
        }
        self.target = None;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use frameloop::FrameLoop;

    use super::*;
    use crate::ShaderError;

    #[derive(Default)]
    struct Log {
        creates: u32,
        drops: u32,
        draws: Vec<(FrameTarget, LightningUniforms)>,
        resizes: Vec<(u32, u32)>,
        next_error: Option<FrameError>,
        lost: Option<String>,
    }

    struct Recording {
        log: Rc<RefCell<Log>>,
    }

    impl RenderBackend for Recording {
        fn resize(&mut self, width: u32, height: u32) {
            self.log.borrow_mut().resizes.push((width, height));
        }

        fn draw(&mut self, target: &FrameTarget, uniforms: &LightningUniforms) -> Result<(), FrameError> {
            let mut log = self.log.borrow_mut();
            if let Some(err) = log.next_error.take() {
                return Err(err);
            }
            log.draws.push((*target, *uniforms));
            Ok(())
        }

        fn context_lost(&mut self) -> Option<String> {
            self.log.borrow_mut().lost.take()
        }
    }

    impl Drop for Recording {
        fn drop(&mut self) {
            self.log.borrow_mut().drops += 1;
        }
    }

    struct Provider {
        log: Rc<RefCell<Log>>,
        fail: Option<SetupError>,
    }

    impl BackendProvider for Provider {
        type Backend = Recording;

        fn create(&mut self, _target: &FrameTarget) -> Result<Recording, SetupError> {
            if let Some(err) = self.fail.take() {
                return Err(err);
            }
            self.log.borrow_mut().creates += 1;
            Ok(Recording {
                log: Rc::clone(&self.log),
            })
        }
    }

    fn secs(value: f64) -> Duration {
        Duration::from_secs_f64(value)
    }

    fn mounted(config: LightningConfig) -> (FrameLoop, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut frames = FrameLoop::new(SurfaceMetrics::new(1000.0, 500.0, 1.0));
        let provider = Provider {
            log: Rc::clone(&log),
            fail: None,
        };
        frames
            .mount(LightningRenderer::new(config, provider), secs(5.0))
            .unwrap();
        (frames, log)
    }

    #[test]
    fn mount_subscribes_and_creates_one_backend() {
        let (frames, log) = mounted(LightningConfig::default());
        assert_eq!(frames.listener_count(), 3);
        assert_eq!(log.borrow().creates, 1);
        assert!(frames.has_pending_frames());
    }

    #[test]
    fn uniforms_carry_config_and_time_since_mount() {
        let config = LightningConfig {
            hue: 120.0,
            x_offset: -0.25,
            speed: 2.0,
            intensity: 0.5,
            size: 3.0,
            height: SurfaceHeight::Fill,
        };
        let (mut frames, log) = mounted(config);
        frames.tick(secs(6.5));

        let log = log.borrow();
        let (target, uniforms) = log.draws[0];
        assert_eq!(uniforms.resolution, [1000.0, 500.0]);
        assert!((uniforms.time - 1.5).abs() < 1e-6);
        assert_eq!(
            [uniforms.hue, uniforms.x_offset, uniforms.speed, uniforms.intensity, uniforms.size],
            [120.0, -0.25, 2.0, 0.5, 3.0]
        );
        assert_eq!(target.viewport, Viewport { width: 1000, height: 500 });
    }

    #[test]
    fn resize_reconfigures_without_resetting_time() {
        let (mut frames, log) = mounted(LightningConfig::default());
        frames.tick(secs(6.0));
        frames.dispatch(HostEvent::Resize(SurfaceMetrics::new(640.0, 400.0, 2.0)));
        frames.tick(secs(7.0));

        let log = log.borrow();
        assert_eq!(log.resizes, vec![(1280, 800)]);
        let (target, uniforms) = log.draws[1];
        assert!((uniforms.time - 2.0).abs() < 1e-6);
        assert_eq!(target.surface.physical_height, 720);
        assert_eq!(uniforms.resolution, [1280.0, 720.0]);
    }

    #[test]
    fn failed_setup_leaves_nothing_mounted() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut frames = FrameLoop::new(SurfaceMetrics::default());
        let provider = Provider {
            log: Rc::clone(&log),
            fail: Some(SetupError::Shader(ShaderError::Link("bad".into()))),
        };
        let result = frames.mount(LightningRenderer::new(LightningConfig::default(), provider), secs(0.0));

        assert!(result.is_err());
        assert_eq!(frames.listener_count(), 0);
        assert_eq!(frames.tick(secs(1.0)), 0);
        assert!(log.borrow().draws.is_empty());
    }

    #[test]
    fn fatal_draw_error_stops_the_loop() {
        let (mut frames, log) = mounted(LightningConfig::default());
        log.borrow_mut().next_error = Some(FrameError::Validation("boom".into()));
        frames.tick(secs(6.0));
        frames.tick(secs(7.0));
        assert!(log.borrow().draws.is_empty());
        assert!(!frames.has_pending_frames());
    }

    #[test]
    fn transient_surface_errors_keep_drawing() {
        let (mut frames, log) = mounted(LightningConfig::default());
        log.borrow_mut().next_error = Some(FrameError::Timeout);
        frames.tick(secs(6.0));
        log.borrow_mut().next_error = Some(FrameError::Outdated);
        frames.tick(secs(7.0));
        frames.tick(secs(8.0));
        assert_eq!(log.borrow().draws.len(), 1);
        assert!(frames.has_pending_frames());
    }

    #[test]
    fn context_loss_stops_drawing() {
        let (mut frames, log) = mounted(LightningConfig::default());
        frames.tick(secs(6.0));
        frames.dispatch(HostEvent::ContextLost);
        frames.tick(secs(7.0));
        assert_eq!(log.borrow().draws.len(), 1);
        assert!(!frames.has_pending_frames());
    }

    #[test]
    fn device_loss_stops_drawing() {
        let (mut frames, log) = mounted(LightningConfig::default());
        log.borrow_mut().lost = Some("Unknown: device removed".into());
        frames.tick(secs(6.0));
        assert!(log.borrow().draws.is_empty());
        assert!(!frames.has_pending_frames());
    }

    #[test]
    fn restored_context_requests_reload() {
        let (mut frames, _log) = mounted(LightningConfig::default());
        frames.dispatch(HostEvent::ContextLost);
        frames.dispatch(HostEvent::ContextRestored);
        assert!(frames.take_reload_request());
    }

    #[test]
    fn unmount_releases_the_backend_once() {
        let (mut frames, log) = mounted(LightningConfig::default());
        frames.tick(secs(6.0));
        frames.unmount_all();
        frames.unmount_all();
        assert_eq!(log.borrow().drops, 1);
        assert_eq!(frames.listener_count(), 0);
    }
}
