use std::fs;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use frameloop::{SteppedTimeSource, TimeSource};
use image::{imageops, ImageFormat, Rgba, RgbaImage};
use morph::{AlphaMask, LabelState, MorphConfig, TextMorphAnimator};
use pageconfig::{parse_hex_color, PageConfig};

use crate::canvas::gooey_text;
use crate::cli::StillArgs;
use crate::fonts::load_rasterizer;

/// Frame rate the morph is replayed at before the exported instant.
const REPLAY_FPS: f32 = 60.0;

pub fn export(page: &PageConfig, args: &StillArgs) -> Result<()> {
    let width = args.width.unwrap_or(page.window.width);
    let height = args.height.unwrap_or(page.window.height);
    if width == 0 || height == 0 {
        bail!("still size must be non-zero (got {width}x{height})");
    }
    let time = Duration::try_from_secs_f32(args.time)
        .with_context(|| format!("invalid still time {}", args.time))?;

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
    if page.lightning.enabled {
        let surface_height = page.lightning.height.resolve(f64::from(height)).round() as u32;
        if surface_height > 0 {
            let bolt = lightning::render_still(
                &page.lightning_config(),
                width,
                surface_height,
                time.as_secs_f32(),
            );
            imageops::replace(&mut canvas, &bolt, 0, 0);
        }
    }

    if page.morph.enabled && !args.no_text {
        match load_rasterizer(page.morph.font.as_deref())? {
            Some(rasterizer) => {
                let color = parse_hex_color(&page.morph.color)?;
                let (current, next) = morph_layers_at(page.morph_config(), time)?;
                let mask = gooey_text(
                    &rasterizer,
                    [&current, &next],
                    page.morph.font_size,
                    1.0,
                    width as usize,
                    height as usize,
                    color,
                );
                overlay(&mut canvas, &mask, color);
                tracing::debug!(current = %current.text, next = %next.text, "composited text layers");
            }
            None => tracing::warn!("no usable font found; exporting without text (pass --font)"),
        }
    }

    if let Some(parent) = args.out.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    canvas
        .save_with_format(&args.out, ImageFormat::Png)
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    tracing::info!(
        path = %args.out.display(),
        width,
        height,
        time = args.time,
        "still frame exported"
    );
    Ok(())
}

/// Replays the morph from mount to `time` and returns the two layers at that instant.
///
/// The layers repeat once every text has had a full cooldown and morph, so only the
/// offset into that rotation is replayed.
fn morph_layers_at(config: MorphConfig, time: Duration) -> Result<(LabelState, LabelState)> {
    let time = fold_into_rotation(&config, time);
    let mut animator =
        TextMorphAnimator::new(config, LabelState::default(), LabelState::default())?;
    let mut clock = SteppedTimeSource::from_fps(REPLAY_FPS);
    loop {
        let now = clock.sample();
        if now >= time {
            break;
        }
        animator.advance(now);
    }
    animator.advance(time);
    let (current, next) = animator.layers();
    Ok((current.clone(), next.clone()))
}

fn fold_into_rotation(config: &MorphConfig, time: Duration) -> Duration {
    let rotation = u32::try_from(config.texts.len())
        .ok()
        .and_then(|len| (config.morph_duration + config.cooldown_duration).checked_mul(len))
        .map(|rotation| rotation.as_nanos())
        .unwrap_or(0);
    if rotation == 0 {
        return time;
    }
    let offset = time.as_nanos() % rotation;
    let secs = (offset / 1_000_000_000) as u64;
    let nanos = (offset % 1_000_000_000) as u32;
    Duration::new(secs, nanos)
}

/// Paints `color` over `canvas` with `mask` as coverage.
fn overlay(canvas: &mut RgbaImage, mask: &AlphaMask, color: [f32; 3]) {
    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        let alpha = mask.get(x as usize, y as usize).clamp(0.0, 1.0);
        if alpha <= 0.0 {
            continue;
        }
        for (channel, tint) in pixel.0.iter_mut().zip(color) {
            let base = f32::from(*channel) / 255.0;
            let mixed = base + (tint - base) * alpha;
            *channel = (mixed.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use morph::LayerStyle;

    use super::*;

    fn config(texts: &[&str], morph_ms: u64, cooldown_ms: u64) -> MorphConfig {
        MorphConfig {
            texts: texts.iter().map(|text| text.to_string()).collect(),
            morph_duration: Duration::from_millis(morph_ms),
            cooldown_duration: Duration::from_millis(cooldown_ms),
        }
    }

    #[test]
    fn replay_at_zero_shows_resting_layers() {
        let (current, next) =
            morph_layers_at(config(&["ONE", "TWO", "THREE"], 1000, 500), Duration::ZERO).unwrap();
        assert_eq!(next.text, "ONE");
        assert_eq!(next.style, LayerStyle::VISIBLE);
        assert_eq!(current.text, "THREE");
        assert_eq!(current.style.opacity, 0.0);
    }

    #[test]
    fn replay_lands_mid_morph() {
        let (current, next) =
            morph_layers_at(config(&["ONE", "TWO"], 1000, 500), Duration::from_millis(1000))
                .unwrap();
        assert_eq!(current.text, "ONE");
        assert_eq!(next.text, "TWO");
        assert!(next.style.opacity > 0.0 && next.style.opacity < 1.0);
        assert!(current.style.opacity > 0.0 && current.style.opacity < 1.0);
        assert!(next.style.blur > 0.0);
    }

    #[test]
    fn distant_instants_replay_their_offset_into_the_rotation() {
        let config = config(&["ONE", "TWO", "THREE"], 1000, 500);
        let rotation = Duration::from_millis(4500);
        for offset in [Duration::ZERO, Duration::from_millis(700), Duration::from_millis(3200)] {
            let distant = rotation * 222_222_222 + offset;
            assert_eq!(fold_into_rotation(&config, distant), offset);
            assert_eq!(
                morph_layers_at(config.clone(), distant).unwrap(),
                morph_layers_at(config.clone(), offset).unwrap()
            );
        }
    }

    #[test]
    fn replay_of_the_longest_instant_finishes() {
        let config = config(&["ONE", "TWO"], 1000, 500);
        let (current, next) = morph_layers_at(config, Duration::MAX).unwrap();
        assert!(["ONE", "TWO"].contains(&current.text.as_str()));
        assert!(["ONE", "TWO"].contains(&next.text.as_str()));
    }

    #[test]
    fn overlay_tints_only_covered_pixels() {
        let mut canvas = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        let mut mask = AlphaMask::new(2, 1);
        mask.set(1, 0, 1.0);
        overlay(&mut canvas, &mask, [1.0, 0.5, 0.0]);
        assert_eq!(canvas.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(1, 0).0, [255, 128, 0, 255]);
    }
}
