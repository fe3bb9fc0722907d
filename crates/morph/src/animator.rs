use std::time::Duration;

use frameloop::{Component, FrameContext, FrameOutcome, Registrar};
use tracing::{debug, trace};

use crate::curve::LayerStyle;
use crate::machine::{step, LayerTexts, MorphPhase, MorphState, MorphTiming, RenderCommands};
use crate::MorphError;

/// Handle to one rendered text layer owned by the host.
pub trait TextLayer {
    fn set_text(&mut self, text: &str);
    fn set_style(&mut self, style: LayerStyle);
}

/// Plain in-memory layer; records the last text and style it was given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelState {
    pub text: String,
    pub style: LayerStyle,
}

impl TextLayer for LabelState {
    fn set_text(&mut self, text: &str) {
        if self.text != text {
            self.text.clear();
            self.text.push_str(text);
        }
    }

    fn set_style(&mut self, style: LayerStyle) {
        self.style = style;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MorphConfig {
    pub texts: Vec<String>,
    pub morph_duration: Duration,
    pub cooldown_duration: Duration,
}

impl MorphConfig {
    pub fn new<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            texts: texts.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

impl Default for MorphConfig {
    fn default() -> Self {
        Self {
            texts: Vec::new(),
            morph_duration: Duration::from_secs(1),
            cooldown_duration: Duration::from_millis(250),
        }
    }
}

/// Drives two [`TextLayer`]s through the morph cycle from monotonic frame timestamps.
pub struct TextMorphAnimator<L> {
    texts: Vec<String>,
    timing: MorphTiming,
    state: MorphState,
    current: L,
    next: L,
    last_now: Option<Duration>,
}

impl<L: TextLayer> TextMorphAnimator<L> {
    pub fn new(config: MorphConfig, current: L, next: L) -> Result<Self, MorphError> {
        if config.texts.is_empty() {
            return Err(MorphError::EmptyTexts);
        }
        let timing = MorphTiming::new(config.morph_duration, config.cooldown_duration)?;
        let state = MorphState::initial(config.texts.len(), &timing);
        let mut animator = Self {
            texts: config.texts,
            timing,
            state,
            current,
            next,
            last_now: None,
        };
        animator.reset();
        Ok(animator)
    }

    pub fn state(&self) -> &MorphState {
        &self.state
    }

    pub fn timing(&self) -> &MorphTiming {
        &self.timing
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    /// Current and next layer handles.
    pub fn layers(&self) -> (&L, &L) {
        (&self.current, &self.next)
    }

    /// Returns to the initial cooldown and re-texts both layers.
    pub fn reset(&mut self) {
        self.state = MorphState::initial(self.texts.len(), &self.timing);
        self.last_now = None;
        let texts = self.state.layer_texts(self.texts.len());
        self.apply(&RenderCommands::resting(Some(texts)));
    }

    /// Advances to the frame timestamp `now`; the first call after a reset only
    /// records the time origin.
    pub fn advance(&mut self, now: Duration) -> RenderCommands {
        let dt = match self.last_now {
            Some(last) => now.saturating_sub(last).as_secs_f32(),
            None => 0.0,
        };
        self.last_now = Some(now);
        self.advance_by(dt)
    }

    pub fn advance_by(&mut self, dt: f32) -> RenderCommands {
        let before = self.state.phase;
        let (state, commands) = step(self.state, dt, &self.timing, self.texts.len());
        self.state = state;
        if before != state.phase {
            match state.phase {
                MorphPhase::Morphing => debug!(
                    index = state.active_index,
                    from = %self.texts[state.active_index],
                    "text morph started"
                ),
                MorphPhase::Cooldown => trace!(index = state.active_index, "text morph settled"),
            }
        }
        self.apply(&commands);
        commands
    }

    fn apply(&mut self, commands: &RenderCommands) {
        if let Some(LayerTexts { current, next }) = commands.texts {
            self.current.set_text(&self.texts[current]);
            self.next.set_text(&self.texts[next]);
        }
        self.current.set_style(commands.current);
        self.next.set_style(commands.next);
    }
}

impl<L: TextLayer> Component for TextMorphAnimator<L> {
    fn name(&self) -> &str {
        "text-morph"
    }

    fn mount(&mut self, _registrar: &mut Registrar<'_>, now: Duration) -> anyhow::Result<()> {
        self.reset();
        self.last_now = Some(now);
        debug!(
            texts = self.texts.len(),
            morph = self.timing.morph_seconds(),
            cooldown = self.timing.cooldown_seconds(),
            "text morph mounted"
        );
        Ok(())
    }

    fn frame(&mut self, frame: &FrameContext) -> FrameOutcome {
        self.advance(frame.now);
        FrameOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use frameloop::{FrameLoop, SurfaceMetrics};

    use super::*;

    fn animator(texts: &[&str], morph: u64, cooldown: u64) -> TextMorphAnimator<LabelState> {
        let config = MorphConfig {
            texts: texts.iter().map(|text| text.to_string()).collect(),
            morph_duration: Duration::from_millis(morph),
            cooldown_duration: Duration::from_millis(cooldown),
        };
        TextMorphAnimator::new(config, LabelState::default(), LabelState::default()).unwrap()
    }

    #[test]
    fn empty_text_list_is_rejected() {
        let result =
            TextMorphAnimator::new(MorphConfig::default(), LabelState::default(), LabelState::default());
        assert!(matches!(result, Err(MorphError::EmptyTexts)));
    }

    #[test]
    fn first_text_rests_on_the_next_layer() {
        let animator = animator(&["one", "two", "three"], 1000, 250);
        let (current, next) = animator.layers();
        assert_eq!(current.text, "three");
        assert_eq!(current.style, LayerStyle::HIDDEN);
        assert_eq!(next.text, "one");
        assert_eq!(next.style, LayerStyle::VISIBLE);
    }

    #[test]
    fn two_texts_cross_at_the_midpoint() {
        let mut animator = animator(&["A", "B"], 1000, 0);
        animator.advance(Duration::ZERO);
        let (current, next) = animator.layers();
        assert_eq!((current.text.as_str(), next.text.as_str()), ("A", "B"));
        assert_eq!(current.style.opacity, 1.0);
        assert_eq!(next.style.opacity, 0.0);

        animator.advance(Duration::from_millis(500));
        let (current, next) = animator.layers();
        assert!((current.style.opacity_percent() - 75.79).abs() < 0.01);
        assert!((next.style.opacity_percent() - 75.79).abs() < 0.01);
        assert!((current.style.blur - 8.0).abs() < 1e-4);
        assert!((next.style.blur - 8.0).abs() < 1e-4);
    }

    #[test]
    fn single_text_never_changes_content() {
        let mut animator = animator(&["solo"], 500, 0);
        for step in 0..40 {
            animator.advance(Duration::from_millis(step * 50));
            let (current, next) = animator.layers();
            assert_eq!(current.text, "solo");
            assert_eq!(next.text, "solo");
        }
    }

    #[test]
    fn reset_returns_to_the_initial_cooldown() {
        let mut animator = animator(&["a", "b", "c"], 1000, 0);
        animator.advance(Duration::ZERO);
        animator.advance(Duration::from_millis(400));
        assert_eq!(animator.state().phase, MorphPhase::Morphing);

        animator.reset();
        assert_eq!(animator.state().phase, MorphPhase::Cooldown);
        assert_eq!(animator.state().active_index, 2);
        assert_eq!(animator.layers().1.text, "a");
    }

    #[test]
    fn runs_as_a_frame_loop_component() {
        let mut frames = FrameLoop::new(SurfaceMetrics::default());
        let animator = animator(&["x", "y"], 1000, 250);
        frames.mount(animator, Duration::from_secs(10)).unwrap();
        assert_eq!(frames.listener_count(), 0);
        for step in 0..=100 {
            assert_eq!(frames.tick(Duration::from_secs(10) + Duration::from_millis(step * 16)), 1);
        }
        assert!(frames.has_pending_frames());
    }
}
