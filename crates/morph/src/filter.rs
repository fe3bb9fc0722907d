/// 4×5 RGBA color matrix, applied to straight (non-premultiplied) channels in `[0, 1]`.
///
/// Each output channel is `row · [r, g, b, a, 1]`, clamped back into `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix {
    pub rows: [[f32; 5]; 4],
}

impl ColorMatrix {
    pub const IDENTITY: Self = Self {
        rows: [
            [1.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0, 0.0],
        ],
    };

    /// Alpha threshold that snaps blurred text edges into a merged blob:
    /// `a' = clamp(255·a − 140)`.
    pub const GOOEY_THRESHOLD: Self = Self {
        rows: [
            [1.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 255.0, -140.0],
        ],
    };

    pub fn apply(&self, rgba: [f32; 4]) -> [f32; 4] {
        let input = [rgba[0], rgba[1], rgba[2], rgba[3], 1.0];
        let mut out = [0.0; 4];
        for (channel, row) in out.iter_mut().zip(&self.rows) {
            let value: f32 = row.iter().zip(&input).map(|(m, v)| m * v).sum();
            *channel = value.clamp(0.0, 1.0);
        }
        out
    }

    /// Alpha channel only; the compositor keeps color separate from coverage.
    pub fn apply_alpha(&self, rgba: [f32; 4]) -> f32 {
        self.apply(rgba)[3]
    }
}

impl Default for ColorMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}
