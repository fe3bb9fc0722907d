use std::time::Duration;

use crate::curve::LayerStyle;
use crate::MorphError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphPhase {
    /// Holding the last completed state: "next" fully shown, "current" hidden.
    Cooldown,
    /// Progress advancing from "current" towards "next".
    Morphing,
}

/// Validated morph/cooldown durations, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MorphTiming {
    morph: f32,
    cooldown: f32,
}

impl MorphTiming {
    pub fn new(morph: Duration, cooldown: Duration) -> Result<Self, MorphError> {
        let morph = morph.as_secs_f32();
        if morph <= 0.0 {
            return Err(MorphError::NonPositiveMorphDuration);
        }
        Ok(Self {
            morph,
            cooldown: cooldown.as_secs_f32(),
        })
    }

    pub fn morph_seconds(&self) -> f32 {
        self.morph
    }

    pub fn cooldown_seconds(&self) -> f32 {
        self.cooldown
    }
}

impl Default for MorphTiming {
    fn default() -> Self {
        Self {
            morph: 1.0,
            cooldown: 0.25,
        }
    }
}

/// Indices of the texts the two layers must show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerTexts {
    pub current: usize,
    pub next: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MorphState {
    pub phase: MorphPhase,
    pub active_index: usize,
    /// Seconds left before the next morph begins.
    pub cooldown_remaining: f32,
    /// Seconds of morph progress, in `[0, morph duration]`.
    pub morph_progress: f32,
}

impl MorphState {
    /// Cooling down with the last entry as "current" and `texts[0]` resting on the
    /// "next" layer, so the first text on screen is `texts[0]`.
    pub fn initial(len: usize, timing: &MorphTiming) -> Self {
        Self {
            phase: MorphPhase::Cooldown,
            active_index: len.saturating_sub(1),
            cooldown_remaining: timing.cooldown,
            morph_progress: 0.0,
        }
    }

    pub fn layer_texts(&self, len: usize) -> LayerTexts {
        let len = len.max(1);
        LayerTexts {
            current: self.active_index % len,
            next: (self.active_index + 1) % len,
        }
    }

    pub fn fraction(&self, timing: &MorphTiming) -> f32 {
        (self.morph_progress / timing.morph).clamp(0.0, 1.0)
    }
}

/// Everything a host must apply to its layers after one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderCommands {
    /// Set when the layers must be re-texted before styling.
    pub texts: Option<LayerTexts>,
    pub current: LayerStyle,
    pub next: LayerStyle,
}

impl RenderCommands {
    pub fn resting(texts: Option<LayerTexts>) -> Self {
        Self {
            texts,
            current: LayerStyle::HIDDEN,
            next: LayerStyle::VISIBLE,
        }
    }

    fn morphing(fraction: f32, texts: Option<LayerTexts>) -> Self {
        Self {
            texts,
            current: LayerStyle::at_fraction(1.0 - fraction),
            next: LayerStyle::at_fraction(fraction),
        }
    }
}

/// Advances the morph by `dt` seconds over a list of `len` texts.
///
/// Negative or non-finite `dt` counts as zero. Time left over when a cooldown expires is
/// carried into the morph; time past the end of a morph is dropped.
pub fn step(
    state: MorphState,
    dt: f32,
    timing: &MorphTiming,
    len: usize,
) -> (MorphState, RenderCommands) {
    let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
    let len = len.max(1);
    let mut next = state;

    match state.phase {
        MorphPhase::Cooldown => {
            next.cooldown_remaining -= dt;
            if next.cooldown_remaining > 0.0 {
                return (next, RenderCommands::resting(None));
            }
            let overflow = -next.cooldown_remaining;
            next.phase = MorphPhase::Morphing;
            next.cooldown_remaining = 0.0;
            next.morph_progress = 0.0;
            next.active_index = (state.active_index + 1) % len;
            let texts = next.layer_texts(len);
            advance_morph(next, overflow, timing, Some(texts))
        }
        MorphPhase::Morphing => advance_morph(next, dt, timing, None),
    }
}

fn advance_morph(
    mut state: MorphState,
    dt: f32,
    timing: &MorphTiming,
    texts: Option<LayerTexts>,
) -> (MorphState, RenderCommands) {
    state.morph_progress += dt;
    let fraction = state.morph_progress / timing.morph;
    if fraction >= 1.0 {
        state.phase = MorphPhase::Cooldown;
        state.morph_progress = 0.0;
        state.cooldown_remaining = timing.cooldown;
        return (state, RenderCommands::morphing(1.0, texts));
    }
    (state, RenderCommands::morphing(fraction, texts))
}
