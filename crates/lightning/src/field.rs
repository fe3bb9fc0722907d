//! CPU evaluation of the lightning fragment shader.
//!
//! Mirrors `FRAGMENT_SHADER_GLSL` operation for operation in `f32`, so a still export
//! looks like a GPU frame at the same time and resolution.

use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::types::LightningConfig;

const OCTAVE_COUNT: usize = 10;
const OCTAVE_ROTATION: f32 = 0.45;

/// Evaluates the shader for one fragment. `frag_coord` has a bottom-left origin and
/// addresses pixel centers at `+0.5`.
pub fn shade(
    frag_coord: [f32; 2],
    resolution: [f32; 2],
    time: f32,
    config: &LightningConfig,
) -> [f32; 3] {
    let mut uv = [
        2.0 * (frag_coord[0] / resolution[0]) - 1.0,
        2.0 * (frag_coord[1] / resolution[1]) - 1.0,
    ];
    uv[0] *= resolution[0] / resolution[1];
    uv[0] += config.x_offset;

    let drift = 0.8 * time * config.speed;
    let warp = fbm([uv[0] * config.size + drift, uv[1] * config.size + drift]);
    uv[0] += (warp - 0.5) * 0.35;

    let dist = uv[0].abs();
    let h = fract(config.hue / 360.0 + 0.05 * time);
    let base = hsv2rgb(h, 0.75, 1.0);

    let core = 0.020 / (dist * dist + 0.0008);
    let halo = 0.009 / (dist + 0.020);
    let gain = (core + halo) * flicker(time, config.speed) * config.intensity;
    base.map(|channel| (channel * gain).clamp(0.0, 1.0))
}

/// Brightness jitter shared by every pixel of a frame, in `[0.85, 1.15]`.
pub fn flicker(time: f32, speed: f32) -> f32 {
    mix(0.85, 1.15, hash11(time * speed * 3.0))
}

/// Renders a full frame at `time` seconds into an opaque RGBA image (top row first).
pub fn render_still(config: &LightningConfig, width: u32, height: u32, time: f32) -> RgbaImage {
    let width = width.max(1);
    let height = height.max(1);
    let resolution = [width as f32, height as f32];
    let image = RgbaImage::from_fn(width, height, |x, y| {
        let frag = [x as f32 + 0.5, (height - 1 - y) as f32 + 0.5];
        let [r, g, b] = shade(frag, resolution, time, config);
        Rgba([to_byte(r), to_byte(g), to_byte(b), 255])
    });
    debug!(width, height, time, "rendered lightning still");
    image
}

fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

pub(crate) fn hsv2rgb(h: f32, s: f32, v: f32) -> [f32; 3] {
    [0.0_f32, 4.0, 2.0].map(|offset| {
        let k = glsl_mod(h * 6.0 + offset, 6.0);
        let rgb = ((k - 3.0).abs() - 1.0).clamp(0.0, 1.0);
        v * mix(1.0, rgb, s)
    })
}

pub(crate) fn hash11(p: f32) -> f32 {
    let mut p = fract(p * 0.1031);
    p *= p + 33.33;
    p *= p + p;
    fract(p)
}

pub(crate) fn hash12(p: [f32; 2]) -> f32 {
    let mut p3 = [p[0], p[1], p[0]].map(|value| fract(value * 0.1031));
    let shifted = [p3[1] + 33.33, p3[2] + 33.33, p3[0] + 33.33];
    let dot = p3[0] * shifted[0] + p3[1] * shifted[1] + p3[2] * shifted[2];
    for value in &mut p3 {
        *value += dot;
    }
    fract((p3[0] + p3[1]) * p3[2])
}

pub(crate) fn value_noise(p: [f32; 2]) -> f32 {
    let ip = [p[0].floor(), p[1].floor()];
    let fp = [fract(p[0]), fract(p[1])];
    let a = hash12(ip);
    let b = hash12([ip[0] + 1.0, ip[1]]);
    let c = hash12([ip[0], ip[1] + 1.0]);
    let d = hash12([ip[0] + 1.0, ip[1] + 1.0]);
    let t = fp.map(smoothstep);
    mix(mix(a, b, t[0]), mix(c, d, t[0]), t[1])
}

pub(crate) fn fbm(mut p: [f32; 2]) -> f32 {
    let (s, c) = OCTAVE_ROTATION.sin_cos();
    let mut value = 0.0;
    let mut amplitude = 0.5;
    for _ in 0..OCTAVE_COUNT {
        value += amplitude * value_noise(p);
        p = [(c * p[0] - s * p[1]) * 2.0, (s * p[0] + c * p[1]) * 2.0];
        amplitude *= 0.5;
    }
    value
}

fn fract(value: f32) -> f32 {
    value - value.floor()
}

fn glsl_mod(x: f32, y: f32) -> f32 {
    x - y * (x / y).floor()
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
