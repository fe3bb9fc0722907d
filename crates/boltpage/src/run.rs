use std::path::Path;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::cli::{RunArgs, StillArgs};
use crate::paths::AppPaths;
use crate::settings::{apply_overrides, load_page_config};
use crate::{still, window};

pub fn run(config: Option<&Path>, args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let (mut page, source) = load_page_config(config, &paths)?;
    apply_overrides(&mut page, &args)?;
    tracing::info!(
        config = %source,
        lightning = page.lightning.enabled,
        morph = page.morph.enabled,
        texts = page.morph.texts.len(),
        "starting boltpage"
    );
    window::run(page)
}

pub fn run_still(config: Option<&Path>, overrides: &RunArgs, args: &StillArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let (mut page, source) = load_page_config(config, &paths)?;
    apply_overrides(&mut page, overrides)?;
    tracing::debug!(config = %source, out = %args.out.display(), "exporting still frame");
    still::export(&page, args)
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
