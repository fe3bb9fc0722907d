use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lightning::SurfaceHeight;

#[derive(Parser, Debug)]
#[command(
    name = "boltpage",
    author,
    version,
    about = "Lightning hero page with morphing text",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Page config file; defaults to `page.toml` in the config directory.
    #[arg(long, global = true, value_name = "FILE", env = "BOLTPAGE_CONFIG")]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Base hue of the bolt in degrees (0-360).
    #[arg(long, value_name = "DEGREES")]
    pub hue: Option<f32>,

    /// Horizontal offset of the bolt in normalized device units.
    #[arg(long, value_name = "OFFSET", allow_negative_numbers = true)]
    pub x_offset: Option<f32>,

    /// Animation speed; 0 freezes the bolt, negative values run it backward.
    #[arg(long, value_name = "FACTOR", allow_negative_numbers = true)]
    pub speed: Option<f32>,

    /// Brightness multiplier.
    #[arg(long, value_name = "FACTOR")]
    pub intensity: Option<f32>,

    /// Spatial scale of the warp noise.
    #[arg(long, value_name = "FACTOR")]
    pub size: Option<f32>,

    /// Height of the lightning surface (`90vh`, `75%`, `480px`, `fill`).
    #[arg(long, value_name = "HEIGHT", value_parser = parse_surface_height)]
    pub height: Option<SurfaceHeight>,

    /// Text to morph through; repeat for several entries.
    #[arg(long = "text", value_name = "TEXT")]
    pub texts: Vec<String>,

    /// Length of one morph (seconds or `1500ms`-style duration).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub morph_time: Option<std::time::Duration>,

    /// Rest between morphs (seconds or `250ms`-style duration).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub cooldown_time: Option<std::time::Duration>,

    /// Do not mount the lightning background.
    #[arg(long)]
    pub no_lightning: bool,

    /// Do not mount the text morph.
    #[arg(long)]
    pub no_morph: bool,

    /// TTF/OTF font for the text; defaults to a bold system sans-serif.
    #[arg(long, global = true, value_name = "PATH")]
    pub font: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render one frame on the CPU and save it as PNG.
    Still(StillArgs),
    /// Inspect the resolved page configuration.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct StillArgs {
    /// Destination PNG path.
    #[arg(long, value_name = "PATH")]
    pub out: PathBuf,

    /// Seconds since mount to evaluate.
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    pub time: f32,

    /// Image width in pixels (defaults to the configured window width).
    #[arg(long, value_name = "PIXELS")]
    pub width: Option<u32>,

    /// Image height in pixels (defaults to the configured window height).
    #[arg(long, value_name = "PIXELS")]
    pub height: Option<u32>,

    /// Skip the text overlay.
    #[arg(long)]
    pub no_text: bool,
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,
    /// Print the config directory and which file is in use.
    Where,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_height(value: &str) -> Result<SurfaceHeight, String> {
    value.parse().map_err(|err: lightning::SurfaceHeightError| err.to_string())
}

pub fn parse_duration(value: &str) -> Result<std::time::Duration, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("duration must not be empty".to_string());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(format!("duration '{trimmed}' must be a non-negative number of seconds"));
        }
        return std::time::Duration::try_from_secs_f64(seconds)
            .map_err(|err| format!("duration '{trimmed}' is out of range: {err}"));
    }

    humantime::parse_duration(trimmed).map_err(|err| format!("invalid duration '{trimmed}': {err}"))
}
