use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pageconfig::PageConfig;

use crate::cli::RunArgs;
use crate::paths::AppPaths;

/// Where the effective page config came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Passed with `--config`.
    Explicit(PathBuf),
    /// Found in the config directory.
    Discovered(PathBuf),
    BuiltIn,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Explicit(path) => write!(f, "{} (--config)", path.display()),
            ConfigSource::Discovered(path) => write!(f, "{}", path.display()),
            ConfigSource::BuiltIn => f.write_str("built-in defaults"),
        }
    }
}

/// Loads the page config: `--config`, else `page.toml` in the config dir, else defaults.
pub fn load_page_config(
    explicit: Option<&Path>,
    paths: &AppPaths,
) -> Result<(PageConfig, ConfigSource)> {
    if let Some(path) = explicit {
        let config = PageConfig::load(path)
            .with_context(|| format!("failed to load page config {}", path.display()))?;
        return Ok((config, ConfigSource::Explicit(path.to_path_buf())));
    }

    let candidate = paths.config_file();
    if candidate.is_file() {
        let config = PageConfig::load(&candidate)
            .with_context(|| format!("failed to load page config {}", candidate.display()))?;
        return Ok((config, ConfigSource::Discovered(candidate)));
    }

    tracing::debug!(
        path = %candidate.display(),
        "no page config found; using built-in defaults"
    );
    Ok((PageConfig::default(), ConfigSource::BuiltIn))
}

/// Folds command-line overrides into `page` and re-validates the result.
pub fn apply_overrides(page: &mut PageConfig, args: &RunArgs) -> Result<()> {
    let lightning = &mut page.lightning;
    if let Some(hue) = args.hue {
        lightning.hue = hue;
    }
    if let Some(x_offset) = args.x_offset {
        lightning.x_offset = x_offset;
    }
    if let Some(speed) = args.speed {
        lightning.speed = speed;
    }
    if let Some(intensity) = args.intensity {
        lightning.intensity = intensity;
    }
    if let Some(size) = args.size {
        lightning.size = size;
    }
    if let Some(height) = args.height {
        lightning.height = height;
    }
    if args.no_lightning {
        lightning.enabled = false;
    }

    let morph = &mut page.morph;
    if !args.texts.is_empty() {
        morph.texts = args.texts.clone();
    }
    if let Some(duration) = args.morph_time {
        morph.morph_duration = duration;
    }
    if let Some(duration) = args.cooldown_time {
        morph.cooldown_duration = duration;
    }
    if args.no_morph {
        morph.enabled = false;
    }
    if let Some(font) = &args.font {
        morph.font = Some(font.clone());
    }

    page.validate()
        .context("command-line overrides produce an invalid configuration")
}
