//! CPU rendition of the gooey layer stack.
//!
//! ```text
//!  current mask ─blur(σ)─×opacity─┐
//!                                 ├─ source-over ─▶ color matrix ─▶ coverage
//!  next mask    ─blur(σ)─×opacity─┘
//! ```
//!
//! The Gaussian is approximated by three successive box blurs with zero padding.

use crate::curve::LayerStyle;
use crate::filter::ColorMatrix;

const BOX_PASSES: usize = 3;

/// Single-channel coverage buffer in row-major order, values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaMask {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl AlphaMask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Wraps an existing buffer; `None` when its length does not match the size.
    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Option<Self> {
        (data.len() == width * height).then_some(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        if x < self.width && y < self.height {
            self.data[y * self.width + x]
        } else {
            0.0
        }
    }

    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }

    /// Total coverage.
    pub fn sum(&self) -> f32 {
        self.data.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|value| *value <= 0.0)
    }
}

/// Blurs `mask` with an approximate Gaussian of standard deviation `sigma` pixels.
pub fn gaussian_blur(mask: &AlphaMask, sigma: f32) -> AlphaMask {
    if !(sigma.is_finite() && sigma > 0.0) || mask.data.is_empty() {
        return mask.clone();
    }

    let mut front = mask.data.clone();
    let mut back = vec![0.0; front.len()];
    for size in box_sizes(sigma) {
        let radius = (size - 1) / 2;
        if radius == 0 {
            continue;
        }
        box_blur_rows(&front, &mut back, mask.width, mask.height, radius);
        box_blur_columns(&back, &mut front, mask.width, mask.height, radius);
    }

    AlphaMask {
        width: mask.width,
        height: mask.height,
        data: front,
    }
}

/// Odd box widths whose three-pass convolution matches a Gaussian of `sigma`.
fn box_sizes(sigma: f32) -> [usize; BOX_PASSES] {
    let n = BOX_PASSES as f32;
    let ideal = (12.0 * sigma * sigma / n + 1.0).sqrt();
    let mut lower = ideal.floor() as i64;
    if lower % 2 == 0 {
        lower -= 1;
    }
    let lower = lower.max(1);
    let upper = lower + 2;

    let wl = lower as f32;
    let m_ideal = (12.0 * sigma * sigma - n * wl * wl - 4.0 * n * wl - 3.0 * n) / (-4.0 * wl - 4.0);
    let m = m_ideal.round().max(0.0) as usize;

    let mut sizes = [0; BOX_PASSES];
    for (pass, size) in sizes.iter_mut().enumerate() {
        let width = if pass < m { lower } else { upper };
        *size = width as usize;
    }
    sizes
}

fn box_blur_rows(src: &[f32], dst: &mut [f32], width: usize, height: usize, radius: usize) {
    let norm = 1.0 / (2 * radius + 1) as f32;
    for y in 0..height {
        let row = &src[y * width..(y + 1) * width];
        let out = &mut dst[y * width..(y + 1) * width];
        let mut acc: f32 = row[..=radius.min(width - 1)].iter().sum();
        for x in 0..width {
            out[x] = (acc * norm).max(0.0);
            if x + radius + 1 < width {
                acc += row[x + radius + 1];
            }
            if x >= radius {
                acc -= row[x - radius];
            }
        }
    }
}

fn box_blur_columns(src: &[f32], dst: &mut [f32], width: usize, height: usize, radius: usize) {
    let norm = 1.0 / (2 * radius + 1) as f32;
    for x in 0..width {
        let at = |y: usize| src[y * width + x];
        let mut acc: f32 = (0..=radius.min(height - 1)).map(at).sum();
        for y in 0..height {
            dst[y * width + x] = (acc * norm).max(0.0);
            if y + radius + 1 < height {
                acc += at(y + radius + 1);
            }
            if y >= radius {
                acc -= at(y - radius);
            }
        }
    }
}

/// Blurs and fades each layer, stacks them source-over and runs the result through
/// `matrix`. All masks must share the first mask's size; missing pixels count as empty.
pub fn composite_layers(
    layers: &[(&AlphaMask, LayerStyle)],
    matrix: &ColorMatrix,
    color: [f32; 3],
) -> AlphaMask {
    let Some((first, _)) = layers.first() else {
        return AlphaMask::new(0, 0);
    };
    let (width, height) = (first.width, first.height);
    let mut stacked = AlphaMask::new(width, height);

    for (mask, style) in layers {
        if style.opacity <= 0.0 {
            continue;
        }
        let blurred = if style.is_unfiltered() {
            (*mask).clone()
        } else {
            gaussian_blur(mask, style.blur)
        };
        for y in 0..height {
            for x in 0..width {
                let src = blurred.get(x, y) * style.opacity;
                let index = y * width + x;
                let dst = stacked.data[index];
                stacked.data[index] = src + dst * (1.0 - src);
            }
        }
    }

    for value in &mut stacked.data {
        *value = matrix.apply_alpha([color[0], color[1], color[2], *value]);
    }
    stacked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: usize, from: usize, to: usize) -> AlphaMask {
        let mut mask = AlphaMask::new(size, size);
        for y in from..to {
            for x in from..to {
                mask.set(x, y, 1.0);
            }
        }
        mask
    }

    #[test]
    fn box_sizes_are_odd_and_ordered() {
        for sigma in [0.5_f32, 1.0, 3.0, 8.0, 25.0, 100.0] {
            let sizes = box_sizes(sigma);
            for size in sizes {
                assert_eq!(size % 2, 1, "even box for sigma {sigma}");
            }
            assert!(sizes.windows(2).all(|pair| pair[0] <= pair[1]));
        }
    }

    #[test]
    fn blur_conserves_energy_away_from_edges() {
        let mask = square(96, 44, 52);
        let blurred = gaussian_blur(&mask, 4.0);
        assert!((blurred.sum() - mask.sum()).abs() < 1e-2);
        assert!(blurred.get(48, 48) < 1.0);
        assert!(blurred.get(40, 48) > 0.0);
    }

    #[test]
    fn zero_sigma_is_identity() {
        let mask = square(16, 4, 8);
        assert_eq!(gaussian_blur(&mask, 0.0), mask);
        assert_eq!(gaussian_blur(&mask, f32::NAN), mask);
    }

    #[test]
    fn blur_is_symmetric_around_a_centered_dot() {
        let mut mask = AlphaMask::new(33, 33);
        mask.set(16, 16, 1.0);
        let blurred = gaussian_blur(&mask, 2.0);
        let left = blurred.get(12, 16);
        let right = blurred.get(20, 16);
        let up = blurred.get(16, 12);
        assert!((left - right).abs() < 1e-6);
        assert!((left - up).abs() < 1e-6);
    }

    #[test]
    fn threshold_keeps_solid_glyphs_solid() {
        let mask = square(16, 4, 12);
        let out = composite_layers(
            &[(&mask, LayerStyle::VISIBLE)],
            &ColorMatrix::GOOEY_THRESHOLD,
            [1.0, 1.0, 1.0],
        );
        assert_eq!(out.get(8, 8), 1.0);
        assert_eq!(out.get(0, 0), 0.0);
    }

    #[test]
    fn faint_layer_vanishes_but_overlap_merges() {
        let mask = square(16, 4, 12);
        let half = LayerStyle {
            opacity: 0.5,
            blur: 0.0,
        };
        let single = composite_layers(&[(&mask, half)], &ColorMatrix::GOOEY_THRESHOLD, [1.0; 3]);
        assert!(single.is_empty());

        // 0.5 over 0.5 stacks to 0.75, above the threshold.
        let merged = composite_layers(
            &[(&mask, half), (&mask, half)],
            &ColorMatrix::GOOEY_THRESHOLD,
            [1.0; 3],
        );
        assert_eq!(merged.get(8, 8), 1.0);
    }

    #[test]
    fn hidden_layers_contribute_nothing() {
        let mask = square(16, 4, 12);
        let out = composite_layers(
            &[(&mask, LayerStyle::HIDDEN)],
            &ColorMatrix::IDENTITY,
            [1.0; 3],
        );
        assert!(out.is_empty());
    }
}
