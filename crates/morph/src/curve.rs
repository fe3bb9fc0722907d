/// Largest blur radius (px) a layer is ever given.
pub const BLUR_CAP: f32 = 100.0;

const OPACITY_EXPONENT: f32 = 0.4;
const BLUR_SCALE: f32 = 8.0;
const FRACTION_EPSILON: f32 = 1e-6;

/// Visual state of one text layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerStyle {
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
    /// Blur radius in pixels; zero means unfiltered.
    pub blur: f32,
}

impl LayerStyle {
    pub const VISIBLE: Self = Self {
        opacity: 1.0,
        blur: 0.0,
    };
    pub const HIDDEN: Self = Self {
        opacity: 0.0,
        blur: 0.0,
    };

    /// Style of a layer that is `fraction` of the way to being fully shown.
    pub fn at_fraction(fraction: f32) -> Self {
        Self {
            opacity: layer_opacity(fraction),
            blur: layer_blur(fraction),
        }
    }

    pub fn opacity_percent(&self) -> f32 {
        self.opacity * 100.0
    }

    pub fn is_unfiltered(&self) -> bool {
        self.blur <= 0.0
    }
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self::VISIBLE
    }
}

/// `f^0.4`: fades in quickly, then eases into full opacity.
pub fn layer_opacity(fraction: f32) -> f32 {
    clamp_fraction(fraction).powf(OPACITY_EXPONENT)
}

/// `min(8 / f - 8, 100)`, with `f` floored at a tiny epsilon.
pub fn layer_blur(fraction: f32) -> f32 {
    let fraction = clamp_fraction(fraction).max(FRACTION_EPSILON);
    (BLUR_SCALE / fraction - BLUR_SCALE).min(BLUR_CAP)
}

fn clamp_fraction(fraction: f32) -> f32 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opacity_crossfades_fully_at_both_ends() {
        assert!((layer_opacity(0.0) - 0.0).abs() < 1e-6);
        assert!((layer_opacity(1.0) - 1.0).abs() < 1e-6);
        for step in 0..=20 {
            let f = step as f32 / 20.0;
            let next = layer_opacity(f);
            let current = layer_opacity(1.0 - f);
            assert!((next - f.powf(0.4)).abs() < 1e-6);
            assert!((current - (1.0 - f).powf(0.4)).abs() < 1e-6);
        }
    }

    #[test]
    fn blur_is_capped_near_zero() {
        assert_eq!(layer_blur(0.0), BLUR_CAP);
        assert_eq!(layer_blur(1e-9), BLUR_CAP);
        assert_eq!(layer_blur(0.05), BLUR_CAP);
        assert_eq!(layer_blur(f32::NAN), BLUR_CAP);
    }

    #[test]
    fn blur_decreases_towards_zero() {
        assert!(layer_blur(1.0).abs() < 1e-6);
        let mut last = layer_blur(0.0);
        for step in 1..=100 {
            let f = step as f32 / 100.0;
            let blur = layer_blur(f);
            assert!(blur <= last, "blur rose at f={f}");
            if f > 0.08 {
                assert!(blur < last, "blur not strictly decreasing at f={f}");
            }
            last = blur;
        }
    }

    #[test]
    fn midpoint_is_symmetric() {
        let style = LayerStyle::at_fraction(0.5);
        assert!((style.opacity_percent() - 75.79).abs() < 0.01);
        assert!((style.blur - 8.0).abs() < 1e-5);
    }

    #[test]
    fn out_of_range_fractions_are_clamped() {
        assert_eq!(LayerStyle::at_fraction(2.0), LayerStyle::at_fraction(1.0));
        assert_eq!(LayerStyle::at_fraction(-1.0), LayerStyle::at_fraction(0.0));
    }
}
