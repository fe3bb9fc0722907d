//! Gooey text morphing.
//!
//! Two overlapping text layers cycle through an immutable list of strings. While the
//! machine is cooling down the "next" layer rests fully visible; while morphing, the
//! layers trade opacity and blur along complementary curves. A hard alpha threshold over
//! both layers turns the soft blur cross-fade into the merged "gooey" look.
//!
//! ```text
//!   (MorphState, dt) ──step()──▶ (MorphState, RenderCommands) ──▶ TextLayer handles
//!                                                            └──▶ compose + threshold (CPU)
//! ```
//!
//! [`step`] is pure; [`TextMorphAnimator`] wraps it as a [`frameloop::Component`] and
//! applies the commands to whatever [`TextLayer`] the host provides.

mod animator;
mod compose;
mod curve;
mod filter;
mod machine;
mod raster;

pub use animator::{LabelState, MorphConfig, TextLayer, TextMorphAnimator};
pub use compose::{composite_layers, gaussian_blur, AlphaMask};
pub use curve::{layer_blur, layer_opacity, LayerStyle, BLUR_CAP};
pub use filter::ColorMatrix;
pub use machine::{step, LayerTexts, MorphPhase, MorphState, MorphTiming, RenderCommands};
pub use raster::GlyphRasterizer;

/// Errors raised while configuring the morph animation.
#[derive(Debug, thiserror::Error)]
pub enum MorphError {
    #[error("text morph requires at least one text entry")]
    EmptyTexts,
    #[error("morph duration must be greater than zero")]
    NonPositiveMorphDuration,
    #[error("failed to load font: {0}")]
    Font(String),
}
