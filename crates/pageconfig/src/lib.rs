use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lightning::{LightningConfig, SurfaceHeight};
use morph::MorphConfig;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

pub const CONFIG_FILE_NAME: &str = "page.toml";

pub const DEMO_TEXTS: [&str; 4] = ["PSYPSYPSY", "It's a Vice.", "Made in INDIA", "COMING SOON."];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialise configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PageConfig {
    pub version: u32,
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub lightning: LightningSection,
    #[serde(default)]
    pub morph: MorphSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowSection {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LightningSection {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_hue")]
    pub hue: f32,
    #[serde(default)]
    pub x_offset: f32,
    #[serde(default = "default_unit")]
    pub speed: f32,
    #[serde(default = "default_unit")]
    pub intensity: f32,
    #[serde(default = "default_unit")]
    pub size: f32,
    #[serde(
        default,
        deserialize_with = "deserialize_height",
        serialize_with = "serialize_height"
    )]
    pub height: SurfaceHeight,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MorphSection {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_texts")]
    pub texts: Vec<String>,
    #[serde(
        default = "default_morph_duration",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub morph_duration: Duration,
    #[serde(
        default = "default_cooldown_duration",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub cooldown_duration: Duration,
    /// Fill colour of the text, `#rrggbb` or `#rgb`.
    #[serde(default = "default_color")]
    pub color: String,
    /// Glyph size in logical pixels.
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    /// TTF/OTF font; a bold system sans-serif when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<PathBuf>,
}

fn default_enabled() -> bool {
    true
}

fn default_hue() -> f32 {
    230.0
}

fn default_unit() -> f32 {
    1.0
}

fn default_texts() -> Vec<String> {
    DEMO_TEXTS.iter().map(|text| text.to_string()).collect()
}

fn default_morph_duration() -> Duration {
    Duration::from_secs(3)
}

fn default_cooldown_duration() -> Duration {
    Duration::from_millis(1250)
}

fn default_color() -> String {
    "#ffffff".to_string()
}

fn default_font_size() -> f32 {
    96.0
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            version: 1,
            window: WindowSection::default(),
            lightning: LightningSection::default(),
            morph: MorphSection::default(),
        }
    }
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            title: "boltpage".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

impl Default for LightningSection {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            hue: default_hue(),
            x_offset: 0.0,
            speed: default_unit(),
            intensity: default_unit(),
            size: default_unit(),
            height: SurfaceHeight::default(),
        }
    }
}

impl Default for MorphSection {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            texts: default_texts(),
            morph_duration: default_morph_duration(),
            cooldown_duration: default_cooldown_duration(),
            color: default_color(),
            font_size: default_font_size(),
            font: None,
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_duration_opt(deserializer)?
        .ok_or_else(|| de::Error::custom("expected a duration"))
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v.trim())
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be a non-negative number of seconds"));
            }
            Duration::try_from_secs_f64(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&humantime::format_duration(*value))
}

fn deserialize_height<'de, D>(deserializer: D) -> Result<SurfaceHeight, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = SurfaceHeight;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a height such as \"90vh\", \"75%\", \"480px\", 480 or \"fill\"")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            v.parse().map_err(E::custom)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(SurfaceHeight::Pixels(v as f64))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("height must be non-negative"));
            }
            Ok(SurfaceHeight::Pixels(v as f64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v < 0.0 {
                return Err(E::custom("height must be a non-negative number of pixels"));
            }
            Ok(SurfaceHeight::Pixels(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_height<S>(value: &SurfaceHeight, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(value)
}

/// Parses `#rrggbb` or `#rgb` into linear `[0, 1]` channels.
pub fn parse_hex_color(raw: &str) -> Result<[f32; 3], ConfigError> {
    let invalid = || ConfigError::Invalid(format!("invalid colour '{raw}'; expected '#rrggbb'"));
    let digits = raw.trim().strip_prefix('#').ok_or_else(invalid)?;
    if !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let channel = |hex: &str| u8::from_str_radix(hex, 16).map(|value| value as f32 / 255.0);
    let channels = match digits.len() {
        6 => [&digits[0..2], &digits[2..4], &digits[4..6]].map(|hex| channel(hex)),
        3 => [&digits[0..1], &digits[1..2], &digits[2..3]]
            .map(|nibble| channel(&nibble.repeat(2))),
        _ => return Err(invalid()),
    };
    let mut rgb = [0.0; 3];
    for (slot, value) in rgb.iter_mut().zip(channels) {
        *slot = value.map_err(|_| invalid())?;
    }
    Ok(rgb)
}

impl PageConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: PageConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded page config");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn lightning_config(&self) -> LightningConfig {
        let section = &self.lightning;
        LightningConfig {
            hue: section.hue,
            x_offset: section.x_offset,
            speed: section.speed,
            intensity: section.intensity,
            size: section.size,
            height: section.height,
        }
    }

    pub fn morph_config(&self) -> MorphConfig {
        MorphConfig {
            texts: self.morph.texts.clone(),
            morph_duration: self.morph.morph_duration,
            cooldown_duration: self.morph.cooldown_duration,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(
                "window width and height must be greater than zero".into(),
            ));
        }

        let lightning = &self.lightning;
        if !(lightning.hue.is_finite() && (0.0..360.0).contains(&lightning.hue)) {
            return Err(ConfigError::Invalid(format!(
                "lightning.hue must be in [0, 360), got {}",
                lightning.hue
            )));
        }
        if !lightning.x_offset.is_finite() || !lightning.speed.is_finite() {
            return Err(ConfigError::Invalid(
                "lightning.x_offset and lightning.speed must be finite".into(),
            ));
        }
        if !(lightning.intensity.is_finite() && lightning.intensity >= 0.0) {
            return Err(ConfigError::Invalid(
                "lightning.intensity must be >= 0".into(),
            ));
        }
        if !(lightning.size.is_finite() && lightning.size > 0.0) {
            return Err(ConfigError::Invalid("lightning.size must be > 0".into()));
        }

        let morph = &self.morph;
        if morph.enabled && morph.texts.is_empty() {
            return Err(ConfigError::Invalid(
                "morph.texts must contain at least one entry".into(),
            ));
        }
        if morph.morph_duration.is_zero() {
            return Err(ConfigError::Invalid(
                "morph.morph_duration must be greater than zero".into(),
            ));
        }
        if !(morph.font_size.is_finite() && morph.font_size > 0.0) {
            return Err(ConfigError::Invalid("morph.font_size must be > 0".into()));
        }
        parse_hex_color(&morph.color)?;

        Ok(())
    }
}
