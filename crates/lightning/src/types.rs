use std::fmt;
use std::str::FromStr;

/// How tall the lightning surface is relative to its host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceHeight {
    /// Percentage of the host viewport height (`"90vh"`).
    ViewportPercent(f64),
    /// Percentage of the containing surface (`"50%"`); the host window is the container.
    Percent(f64),
    /// Absolute logical pixels (`"480px"` or `"480"`).
    Pixels(f64),
    /// Fill the host height (`"auto"` / `"fill"`).
    Fill,
}

impl SurfaceHeight {
    /// Logical height for a host of `host_height` logical pixels, never exceeding it.
    pub fn resolve(&self, host_height: f64) -> f64 {
        let host_height = host_height.max(0.0);
        let height = match *self {
            SurfaceHeight::ViewportPercent(value) | SurfaceHeight::Percent(value) => {
                host_height * value / 100.0
            }
            SurfaceHeight::Pixels(value) => value,
            SurfaceHeight::Fill => host_height,
        };
        height.clamp(0.0, host_height)
    }
}

impl Default for SurfaceHeight {
    fn default() -> Self {
        SurfaceHeight::ViewportPercent(90.0)
    }
}

impl fmt::Display for SurfaceHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceHeight::ViewportPercent(value) => write!(f, "{value}vh"),
            SurfaceHeight::Percent(value) => write!(f, "{value}%"),
            SurfaceHeight::Pixels(value) => write!(f, "{value}px"),
            SurfaceHeight::Fill => f.write_str("fill"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid surface height '{0}' (expected e.g. '90vh', '75%', '480px', '480' or 'fill')")]
pub struct SurfaceHeightError(pub String);

impl FromStr for SurfaceHeight {
    type Err = SurfaceHeightError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if matches!(lower.as_str(), "auto" | "fill") {
            return Ok(SurfaceHeight::Fill);
        }

        let (number, make): (&str, fn(f64) -> SurfaceHeight) =
            if let Some(number) = lower.strip_suffix("vh") {
                (number, SurfaceHeight::ViewportPercent)
            } else if let Some(number) = lower.strip_suffix('%') {
                (number, SurfaceHeight::Percent)
            } else if let Some(number) = lower.strip_suffix("px") {
                (number, SurfaceHeight::Pixels)
            } else {
                (lower.as_str(), SurfaceHeight::Pixels)
            };

        match number.trim().parse::<f64>() {
            Ok(value) if value.is_finite() && value >= 0.0 => Ok(make(value)),
            _ => Err(SurfaceHeightError(trimmed.to_string())),
        }
    }
}

/// Parameters of the lightning field.
#[derive(Debug, Clone, PartialEq)]
pub struct LightningConfig {
    /// Base hue in degrees, `[0, 360)`.
    pub hue: f32,
    /// Horizontal offset of the bolt in normalized device units.
    pub x_offset: f32,
    /// Animation speed; zero freezes the warp, negative values reverse it.
    pub speed: f32,
    /// Brightness multiplier.
    pub intensity: f32,
    /// Spatial scale of the warp noise.
    pub size: f32,
    pub height: SurfaceHeight,
}

impl Default for LightningConfig {
    fn default() -> Self {
        Self {
            hue: 230.0,
            x_offset: 0.0,
            speed: 1.0,
            intensity: 1.0,
            size: 1.0,
            height: SurfaceHeight::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_css_like_heights() {
        assert_eq!("90vh".parse::<SurfaceHeight>(), Ok(SurfaceHeight::ViewportPercent(90.0)));
        assert_eq!(" 50% ".parse::<SurfaceHeight>(), Ok(SurfaceHeight::Percent(50.0)));
        assert_eq!("480px".parse::<SurfaceHeight>(), Ok(SurfaceHeight::Pixels(480.0)));
        assert_eq!("320".parse::<SurfaceHeight>(), Ok(SurfaceHeight::Pixels(320.0)));
        assert_eq!("AUTO".parse::<SurfaceHeight>(), Ok(SurfaceHeight::Fill));
        assert_eq!("fill".parse::<SurfaceHeight>(), Ok(SurfaceHeight::Fill));
    }

    #[test]
    fn rejects_malformed_heights() {
        for raw in ["", "vh", "-10px", "tall", "NaN%", "12em"] {
            assert!(raw.parse::<SurfaceHeight>().is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn resolves_against_host_height() {
        assert_eq!(SurfaceHeight::ViewportPercent(90.0).resolve(1000.0), 900.0);
        assert_eq!(SurfaceHeight::Percent(25.0).resolve(800.0), 200.0);
        assert_eq!(SurfaceHeight::Pixels(480.0).resolve(1000.0), 480.0);
        assert_eq!(SurfaceHeight::Pixels(4800.0).resolve(1000.0), 1000.0);
        assert_eq!(SurfaceHeight::Fill.resolve(640.0), 640.0);
    }

    #[test]
    fn display_round_trips_through_parse() {
        let height = SurfaceHeight::ViewportPercent(90.0);
        assert_eq!(height.to_string(), "90vh");
        assert_eq!(height.to_string().parse::<SurfaceHeight>(), Ok(height));
    }

    #[test]
    fn defaults_match_the_landing_page() {
        let config = LightningConfig::default();
        assert_eq!(config.hue, 230.0);
        assert_eq!(config.speed, 1.0);
        assert_eq!(config.height, SurfaceHeight::ViewportPercent(90.0));
    }
}
