mod board;
mod canvas;
mod cli;
mod fonts;
mod paths;
mod run;
mod settings;
mod still;
mod window;

use std::path::Path;

use anyhow::Result;
use cli::{Command, ConfigAction};
use paths::{AppPaths, ENV_CONFIG_DIR};
use settings::{apply_overrides, load_page_config};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Still(args)) => run::run_still(cli.config.as_deref(), &cli.run, &args),
        Some(Command::Config(config_cmd)) => {
            handle_config_command(cli.config.as_deref(), &cli.run, config_cmd.action)
        }
        None => run::run(cli.config.as_deref(), cli.run),
    }
}

fn handle_config_command(
    config: Option<&Path>,
    overrides: &cli::RunArgs,
    action: ConfigAction,
) -> Result<()> {
    let paths = AppPaths::discover()?;
    let (mut page, source) = load_page_config(config, &paths)?;

    match action {
        ConfigAction::Show => {
            apply_overrides(&mut page, overrides)?;
            println!("# source: {source}");
            print!("{}", page.to_toml_string()?);
        }
        ConfigAction::Where => {
            println!("Configuration:");
            println!("  directory:  {}", paths.config_dir().display());
            println!("  file:       {}", paths.config_file().display());
            println!("  in use:     {source}");
            println!("  override:   ${ENV_CONFIG_DIR}");
        }
    }
    Ok(())
}
