//! Native window host.
//!
//! ```text
//!   winit events ──▶ PageHost ──dispatch()──▶ FrameLoop listeners
//!        │              │
//!   RedrawRequested ──▶ tick(now) ──▶ TextMorphAnimator ──▶ LayerBoard
//!                                 ├─▶ TextCanvas (gooey composite) ──▶ OverlaySlot
//!                                 └─▶ LightningRenderer (bolt, then overlay)
//!                       LayerBoard ──▶ window title
//! ```
//!
//! The host requests a redraw after every event batch while any component still wants a
//! frame. A reload request tears the whole scene down and mounts it again in place.
//! Without a GPU surface or a usable font the text still reaches the window title.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use frameloop::{
    ComponentId, FrameLoop, HostEvent, SurfaceMetrics, SystemTimeSource, TimeSource,
};
use lightning::gpu::WgpuProvider;
use lightning::{LightningRenderer, OverlaySlot};
use morph::TextMorphAnimator;
use pageconfig::{parse_hex_color, PageConfig};
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::board::{BoardLayer, LayerBoard};
use crate::canvas::TextCanvas;
use crate::fonts::load_rasterizer;

/// Opens the page window and drives the frame loop until it is closed.
pub fn run(page: PageConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let window = WindowBuilder::new()
        .with_title(page.window.title.as_str())
        .with_inner_size(LogicalSize::new(page.window.width, page.window.height))
        .build(&event_loop)
        .context("failed to create page window")?;
    let window = Arc::new(window);

    let mut host = PageHost::new(Arc::clone(&window), page);
    host.mount_scene()?;
    window.request_redraw();

    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Wait);

            match event {
                Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        elwt.exit();
                    }
                    WindowEvent::Resized(_) => {
                        host.dispatch(HostEvent::Resize(surface_metrics(&window)));
                    }
                    WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                        let size = window.inner_size();
                        let metrics = SurfaceMetrics::new(
                            f64::from(size.width) / scale_factor,
                            f64::from(size.height) / scale_factor,
                            scale_factor,
                        );
                        host.dispatch(HostEvent::Resize(metrics));
                    }
                    WindowEvent::RedrawRequested => {
                        host.redraw();
                    }
                    _ => {}
                },
                Event::Suspended => {
                    host.suspended = true;
                    host.dispatch(HostEvent::ContextLost);
                }
                Event::Resumed => {
                    if std::mem::take(&mut host.suspended) {
                        host.dispatch(HostEvent::ContextRestored);
                    }
                }
                Event::AboutToWait => {
                    if host.frame_loop.has_pending_frames() {
                        window.request_redraw();
                    } else {
                        tracing::trace!("frame loop idle; waiting for events");
                    }
                }
                Event::LoopExiting => {
                    host.frame_loop.unmount_all();
                }
                _ => {}
            }
        })
        .map_err(|err| anyhow!("event loop error: {err}"))
}

/// Logical size and scale factor of the window's client area.
fn surface_metrics(window: &Window) -> SurfaceMetrics {
    let scale_factor = window.scale_factor();
    let size = window.inner_size().to_logical::<f64>(scale_factor);
    SurfaceMetrics::new(size.width, size.height, scale_factor)
}

struct PageHost {
    window: Arc<Window>,
    page: PageConfig,
    frame_loop: FrameLoop,
    clock: SystemTimeSource,
    board: Rc<RefCell<LayerBoard>>,
    suspended: bool,
}

impl PageHost {
    fn new(window: Arc<Window>, page: PageConfig) -> Self {
        let frame_loop = FrameLoop::new(surface_metrics(&window));
        Self {
            window,
            page,
            frame_loop,
            clock: SystemTimeSource::new(),
            board: LayerBoard::shared(),
            suspended: false,
        }
    }

    /// Mounts every enabled component. A component whose setup fails is left out; the
    /// rest of the page keeps running.
    ///
    /// Mount order is tick order: the animator styles the layers, the canvas composites
    /// them, and the renderer draws the bolt with the composite on top.
    fn mount_scene(&mut self) -> Result<()> {
        let now = self.clock.sample();
        let mut overlay = None;

        if self.page.morph.enabled {
            let (current, next) = BoardLayer::pair(&self.board);
            let animator = TextMorphAnimator::new(self.page.morph_config(), current, next)
                .context("invalid text morph configuration")?;
            match self.frame_loop.mount(animator, now) {
                Ok(_) => overlay = self.mount_canvas(now)?,
                Err(err) => tracing::warn!(error = %err, "continuing without the text morph"),
            }
        }

        if self.page.lightning.enabled {
            let mut provider = WgpuProvider::new(Arc::clone(&self.window));
            if let Some((_, slot)) = &overlay {
                provider = provider.with_overlay(slot.clone());
            }
            let renderer = LightningRenderer::new(self.page.lightning_config(), provider);
            if let Err(err) = self.frame_loop.mount(renderer, now) {
                tracing::warn!(error = %err, "continuing without the lightning background");
                if let Some((canvas, _)) = overlay {
                    self.frame_loop.unmount(canvas);
                }
            }
        }

        tracing::info!(
            components = self.frame_loop.mounted_count(),
            listeners = self.frame_loop.listener_count(),
            "page mounted"
        );
        self.sync_title();
        Ok(())
    }

    /// Mounts the gooey text canvas and returns it with the slot it publishes to. Without
    /// a lightning surface to draw on, or without a font, the title is the only text.
    fn mount_canvas(&mut self, now: Duration) -> Result<Option<(ComponentId, OverlaySlot)>> {
        if !self.page.lightning.enabled {
            tracing::info!("lightning disabled; morphing text is shown in the window title");
            return Ok(None);
        }
        let Some(glyphs) = load_rasterizer(self.page.morph.font.as_deref())? else {
            tracing::warn!("no usable font found; morphing text is shown in the window title");
            return Ok(None);
        };
        let color = parse_hex_color(&self.page.morph.color)?;
        let slot = OverlaySlot::new();
        let canvas = TextCanvas::new(
            Rc::clone(&self.board),
            glyphs,
            slot.clone(),
            self.page.morph.font_size,
            color,
        );
        match self.frame_loop.mount(canvas, now) {
            Ok(id) => Ok(Some((id, slot))),
            Err(err) => {
                tracing::warn!(error = %err, "continuing without the text canvas");
                Ok(None)
            }
        }
    }

    fn dispatch(&mut self, event: HostEvent) {
        self.frame_loop.dispatch(event);
        self.reload_if_requested();
    }

    fn redraw(&mut self) {
        let now = self.clock.sample();
        self.frame_loop.tick(now);
        self.sync_title();
        self.reload_if_requested();
    }

    fn reload_if_requested(&mut self) {
        if !self.frame_loop.take_reload_request() {
            return;
        }
        tracing::info!("reloading page");
        self.frame_loop.unmount_all();
        self.frame_loop = FrameLoop::new(surface_metrics(&self.window));
        self.board = LayerBoard::shared();
        if let Err(err) = self.mount_scene() {
            tracing::error!(error = %err, "failed to remount page");
        }
        self.window.request_redraw();
    }

    fn sync_title(&mut self) {
        let Some(text) = self.board.borrow_mut().take_title_change() else {
            return;
        };
        if text.is_empty() {
            self.window.set_title(&self.page.window.title);
        } else {
            self.window
                .set_title(&format!("{} | {text}", self.page.window.title));
        }
    }
}
