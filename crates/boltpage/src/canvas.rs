//! Live gooey text.
//!
//! ```text
//!   TextMorphAnimator ──▶ LayerBoard ──▶ TextCanvas::frame ──rasterize + composite──▶ OverlaySlot
//!                                                                                       │
//!                                                     WgpuBackend::draw (after the bolt) ◀┘
//! ```
//!
//! The canvas is mounted after the animator and before the lightning renderer, so every
//! tick composites this frame's layer styles and the bolt pass draws them.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use frameloop::{
    Component, EventResponse, FrameContext, FrameOutcome, HostEvent, HostEventKind, Registrar,
    SurfaceMetrics,
};
use lightning::{swapchain_size, OverlayImage, OverlaySlot};
use morph::{composite_layers, AlphaMask, ColorMatrix, GlyphRasterizer, LabelState};

use crate::board::LayerBoard;

/// Widest share of the canvas a line of text may take.
const MAX_TEXT_WIDTH: f32 = 0.9;

/// Canvas resolution relative to the swapchain; the overlay pass stretches it back up.
const CANVAS_SCALE: f64 = 0.5;

/// Anything that can measure and draw a line of text into a coverage mask.
pub trait GlyphSource {
    fn measure(&self, text: &str, px: f32) -> f32;
    fn render(&self, text: &str, px: f32, width: usize, height: usize) -> AlphaMask;
}

impl GlyphSource for GlyphRasterizer {
    fn measure(&self, text: &str, px: f32) -> f32 {
        GlyphRasterizer::measure(self, text, px)
    }

    fn render(&self, text: &str, px: f32, width: usize, height: usize) -> AlphaMask {
        GlyphRasterizer::render(self, text, px, width, height)
    }
}

/// Rasterizes both layers and runs them through the gooey threshold.
///
/// `scale` converts logical pixels (font size and blur radius) to mask pixels. Text wider
/// than the mask allows is shrunk to fit.
pub fn gooey_text<G: GlyphSource + ?Sized>(
    glyphs: &G,
    layers: [&LabelState; 2],
    font_size: f32,
    scale: f32,
    width: usize,
    height: usize,
    color: [f32; 3],
) -> AlphaMask {
    let masks = layers.map(|layer| {
        let px = font_size * scale;
        let measured = glyphs.measure(&layer.text, px);
        let limit = width as f32 * MAX_TEXT_WIDTH;
        let px = if measured > limit { px * limit / measured } else { px };
        glyphs.render(&layer.text, px, width, height)
    });
    let styles = layers.map(|layer| {
        let mut style = layer.style;
        style.blur *= scale;
        style
    });
    composite_layers(
        &[(&masks[0], styles[0]), (&masks[1], styles[1])],
        &ColorMatrix::GOOEY_THRESHOLD,
        color,
    )
}

/// Quantizes coverage to one byte per pixel.
pub fn coverage_bytes(mask: &AlphaMask) -> Vec<u8> {
    mask.data()
        .iter()
        .map(|value| (value.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect()
}

/// Composites the shared morph layers into an [`OverlaySlot`] each frame they change.
pub struct TextCanvas<G> {
    board: Rc<RefCell<LayerBoard>>,
    glyphs: G,
    slot: OverlaySlot,
    font_size: f32,
    color: [f32; 3],
    metrics: SurfaceMetrics,
    composed: Option<(u64, (u32, u32))>,
}

impl<G: GlyphSource> TextCanvas<G> {
    pub fn new(
        board: Rc<RefCell<LayerBoard>>,
        glyphs: G,
        slot: OverlaySlot,
        font_size: f32,
        color: [f32; 3],
    ) -> Self {
        Self {
            board,
            glyphs,
            slot,
            font_size,
            color,
            metrics: SurfaceMetrics::default(),
            composed: None,
        }
    }

    /// Mask size and the logical-to-mask pixel ratio for the current window.
    fn canvas_size(&self) -> ((u32, u32), f32) {
        let (width, height) = swapchain_size(&self.metrics);
        let width = ((f64::from(width) * CANVAS_SCALE).round() as u32).max(1);
        let height = ((f64::from(height) * CANVAS_SCALE).round() as u32).max(1);
        let scale = if self.metrics.logical_width > 0.0 {
            f64::from(width) / self.metrics.logical_width
        } else {
            CANVAS_SCALE
        };
        ((width, height), scale as f32)
    }

    fn compose(&mut self, size: (u32, u32), scale: f32) {
        let board = self.board.borrow();
        let [current, next] = board.layers();
        let mask = gooey_text(
            &self.glyphs,
            [current, next],
            self.font_size,
            scale,
            size.0 as usize,
            size.1 as usize,
            self.color,
        );
        match OverlayImage::new(size.0, size.1, coverage_bytes(&mask), self.color) {
            Some(image) => self.slot.publish(image),
            None => self.slot.clear(),
        }
    }
}

impl<G: GlyphSource> Component for TextCanvas<G> {
    fn name(&self) -> &str {
        "text-canvas"
    }

    fn mount(&mut self, registrar: &mut Registrar<'_>, _now: Duration) -> anyhow::Result<()> {
        registrar.listen(HostEventKind::Resize);
        self.metrics = registrar.surface_metrics();
        self.composed = None;
        let ((width, height), _) = self.canvas_size();
        tracing::debug!(width, height, font_size = self.font_size, "text canvas mounted");
        Ok(())
    }

    fn frame(&mut self, frame: &FrameContext) -> FrameOutcome {
        let (size, scale) = self.canvas_size();
        let revision = self.board.borrow().revision();
        if self.composed == Some((revision, size)) {
            return FrameOutcome::Continue;
        }
        self.compose(size, scale);
        self.composed = Some((revision, size));
        tracing::trace!(frame = frame.frame_index, revision, "composited text layers");
        FrameOutcome::Continue
    }

    fn handle_event(&mut self, event: &HostEvent) -> EventResponse {
        if let HostEvent::Resize(metrics) = event {
            self.metrics = *metrics;
        }
        EventResponse::Handled
    }

    fn unmount(&mut self) {
        self.slot.clear();
        self.composed = None;
    }
}

#[cfg(test)]
mod tests {
    use frameloop::FrameLoop;
    use morph::{LayerStyle, MorphConfig, TextMorphAnimator};

    use super::*;
    use crate::board::BoardLayer;

    /// Each character is a solid block `0.6·px` wide and `px` tall, centered as a line.
    struct BlockGlyphs;

    impl GlyphSource for BlockGlyphs {
        fn measure(&self, text: &str, px: f32) -> f32 {
            text.chars().count() as f32 * px * 0.6
        }

        fn render(&self, text: &str, px: f32, width: usize, height: usize) -> AlphaMask {
            let mut mask = AlphaMask::new(width, height);
            let line = self.measure(text, px);
            let left = ((width as f32 - line) / 2.0).max(0.0) as usize;
            let top = ((height as f32 - px) / 2.0).max(0.0) as usize;
            for y in top..(top + px as usize).min(height) {
                for x in left..(left + line as usize).min(width) {
                    mask.set(x, y, 1.0);
                }
            }
            mask
        }
    }

    fn morph_config(morph_ms: u64, cooldown_ms: u64) -> MorphConfig {
        MorphConfig {
            texts: vec!["AB".into(), "CDEF".into()],
            morph_duration: Duration::from_millis(morph_ms),
            cooldown_duration: Duration::from_millis(cooldown_ms),
        }
    }

    fn mounted(
        morph_ms: u64,
        cooldown_ms: u64,
    ) -> (FrameLoop, Rc<RefCell<LayerBoard>>, OverlaySlot) {
        let board = LayerBoard::shared();
        let slot = OverlaySlot::new();
        let mut frames = FrameLoop::new(SurfaceMetrics::new(200.0, 100.0, 1.0));
        let (current, next) = BoardLayer::pair(&board);
        let animator =
            TextMorphAnimator::new(morph_config(morph_ms, cooldown_ms), current, next).unwrap();
        frames.mount(animator, Duration::ZERO).unwrap();
        let canvas = TextCanvas::new(Rc::clone(&board), BlockGlyphs, slot.clone(), 20.0, [1.0; 3]);
        frames.mount(canvas, Duration::ZERO).unwrap();
        (frames, board, slot)
    }

    fn assert_close(actual: LayerStyle, expected: LayerStyle) {
        assert!((actual.opacity - expected.opacity).abs() < 1e-4, "{actual:?} vs {expected:?}");
        assert!((actual.blur - expected.blur).abs() < 1e-2, "{actual:?} vs {expected:?}");
    }

    fn published(slot: &OverlaySlot) -> Option<OverlayImage> {
        let mut image = None;
        slot.sync(u64::MAX, |current| image = current.cloned());
        image
    }

    #[test]
    fn layer_sink_gets_opacity_and_blur_every_frame() {
        let (mut frames, board, slot) = mounted(1000, 0);
        let mut revision = slot.revision();
        for ms in [100, 300, 500, 700, 900] {
            frames.tick(Duration::from_millis(ms));
            {
                let board = board.borrow();
                let [current, next] = board.layers();
                assert_eq!((current.text.as_str(), next.text.as_str()), ("AB", "CDEF"));
                let fraction = ms as f32 / 1000.0;
                assert_close(next.style, LayerStyle::at_fraction(fraction));
                assert_close(current.style, LayerStyle::at_fraction(1.0 - fraction));
                assert!(current.style.opacity > 0.0 && current.style.blur > 0.0);
                assert!(next.style.opacity > 0.0 && next.style.blur > 0.0);
            }
            assert!(slot.revision() > revision, "no overlay published at {ms} ms");
            revision = slot.revision();
            let image = published(&slot).unwrap();
            assert_eq!(image.size(), (100, 50));
        }
    }

    #[test]
    fn resting_text_is_composited_once() {
        let (mut frames, board, slot) = mounted(1000, 10_000);
        for ms in [0, 16, 33, 50] {
            frames.tick(Duration::from_millis(ms));
        }
        assert_eq!(slot.revision(), 1);
        assert_eq!(board.borrow().layers()[1].style, LayerStyle::VISIBLE);

        let image = published(&slot).unwrap();
        let expected = coverage_bytes(&BlockGlyphs.render("AB", 10.0, 100, 50));
        assert_eq!(image.coverage(), expected.as_slice());
    }

    #[test]
    fn resize_recomposites_at_the_new_size() {
        let (mut frames, _board, slot) = mounted(1000, 10_000);
        frames.tick(Duration::ZERO);
        frames.dispatch(HostEvent::Resize(SurfaceMetrics::new(300.0, 100.0, 2.0)));
        frames.tick(Duration::from_millis(16));
        assert_eq!(slot.revision(), 2);
        assert_eq!(published(&slot).unwrap().size(), (300, 100));
    }

    #[test]
    fn unmount_clears_the_overlay() {
        let (mut frames, _board, slot) = mounted(1000, 10_000);
        frames.tick(Duration::ZERO);
        assert!(published(&slot).is_some());
        frames.unmount_all();
        assert!(published(&slot).is_none());
    }

    #[test]
    fn hidden_layer_adds_no_coverage() {
        let visible = LabelState {
            text: "AB".into(),
            style: LayerStyle::VISIBLE,
        };
        let hidden = LabelState {
            text: "CDEFGH".into(),
            style: LayerStyle::HIDDEN,
        };
        let mask = gooey_text(&BlockGlyphs, [&hidden, &visible], 20.0, 1.0, 200, 100, [1.0; 3]);
        let alone = gooey_text(&BlockGlyphs, [&visible, &visible], 20.0, 1.0, 200, 100, [1.0; 3]);
        assert_eq!(mask, alone);
        assert!(!mask.is_empty());
    }

    #[test]
    fn heavy_blur_falls_under_the_threshold() {
        let faint = LabelState {
            text: "AB".into(),
            style: LayerStyle::at_fraction(0.05),
        };
        let mask = gooey_text(&BlockGlyphs, [&faint, &faint], 20.0, 1.0, 200, 100, [1.0; 3]);
        let sharp = LabelState {
            text: "AB".into(),
            style: LayerStyle::VISIBLE,
        };
        let reference = gooey_text(&BlockGlyphs, [&sharp, &sharp], 20.0, 1.0, 200, 100, [1.0; 3]);
        assert!(mask.sum() < reference.sum());
    }

    #[test]
    fn long_text_is_shrunk_to_fit() {
        let wide = LabelState {
            text: "ABCDEFGHIJKLMNOPQRST".into(),
            style: LayerStyle::VISIBLE,
        };
        let mask = gooey_text(&BlockGlyphs, [&wide, &wide], 40.0, 1.0, 200, 100, [1.0; 3]);
        assert_eq!(mask.get(5, 50), 0.0);
        assert!(mask.get(100, 50) > 0.0);
    }
}
