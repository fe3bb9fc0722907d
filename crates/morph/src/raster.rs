use fontdue::{Font, FontSettings};
use tracing::trace;

use crate::compose::AlphaMask;
use crate::MorphError;

/// Renders single-line strings into coverage masks.
pub struct GlyphRasterizer {
    font: Font,
}

impl GlyphRasterizer {
    /// Parses a TTF/OTF font (or one face of a collection).
    pub fn from_bytes(bytes: &[u8], collection_index: u32) -> Result<Self, MorphError> {
        let settings = FontSettings {
            collection_index,
            ..FontSettings::default()
        };
        let font = Font::from_bytes(bytes, settings).map_err(|err| MorphError::Font(err.to_string()))?;
        Ok(Self { font })
    }

    /// Horizontal extent of `text` at `px`, including kerning.
    pub fn measure(&self, text: &str, px: f32) -> f32 {
        self.pen_positions(text, px)
            .last()
            .map(|(_, pen, advance)| pen + advance)
            .unwrap_or(0.0)
    }

    /// Draws `text` centered in a `width × height` mask.
    pub fn render(&self, text: &str, px: f32, width: usize, height: usize) -> AlphaMask {
        let mut mask = AlphaMask::new(width, height);
        if width == 0 || height == 0 || !(px > 0.0) {
            return mask;
        }

        let (ascent, descent) = self
            .font
            .horizontal_line_metrics(px)
            .map(|line| (line.ascent, line.descent))
            .unwrap_or((px * 0.8, -px * 0.2));
        let baseline = (height as f32 - (ascent - descent)) / 2.0 + ascent;
        let origin_x = (width as f32 - self.measure(text, px)) / 2.0;

        for (glyph, pen, _) in self.pen_positions(text, px) {
            let (metrics, coverage) = self.font.rasterize(glyph, px);
            let left = (origin_x + pen).round() as i64 + metrics.xmin as i64;
            let top = baseline.round() as i64 - (metrics.ymin as i64 + metrics.height as i64);
            for row in 0..metrics.height {
                let y = top + row as i64;
                if y < 0 || y >= height as i64 {
                    continue;
                }
                for column in 0..metrics.width {
                    let x = left + column as i64;
                    if x < 0 || x >= width as i64 {
                        continue;
                    }
                    let value = coverage[row * metrics.width + column] as f32 / 255.0;
                    let (x, y) = (x as usize, y as usize);
                    if value > mask.get(x, y) {
                        mask.set(x, y, value);
                    }
                }
            }
        }

        trace!(text, px, width, height, "rasterized text mask");
        mask
    }

    /// `(glyph, pen x, advance)` for every character, kerning applied.
    fn pen_positions(&self, text: &str, px: f32) -> Vec<(char, f32, f32)> {
        let mut positions = Vec::with_capacity(text.len());
        let mut pen = 0.0;
        let mut previous: Option<char> = None;
        for glyph in text.chars() {
            if let Some(left) = previous {
                pen += self.font.horizontal_kern(left, glyph, px).unwrap_or(0.0);
            }
            let advance = self.font.metrics(glyph, px).advance_width;
            positions.push((glyph, pen, advance));
            pen += advance;
            previous = Some(glyph);
        }
        positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage_font_data() {
        let result = GlyphRasterizer::from_bytes(b"definitely not a font", 0);
        assert!(matches!(result, Err(MorphError::Font(_))));
    }
}
