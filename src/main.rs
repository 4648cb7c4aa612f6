//! contentpipe - a content build pipeline with incremental watch mode.

use anyhow::{Result, bail};
use clap::Parser;
use contentpipe::{Pipeline, cli::Cli, config::PipelineConfig, log};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let mut pipeline = Pipeline::from_config(&config)?;

    pipeline.build()?;
    if cli.is_watch() {
        pipeline.watch(config.debounce())?;
    }
    Ok(())
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    if !config_path.exists() {
        bail!("Config file not found: {}", config_path.display());
    }
    let mut config = PipelineConfig::from_path(&config_path)?;
    config.update_with_cli(cli);
    config.validate()?;

    log!(
        "config";
        "{} rules, source `{}`, target `{}`",
        config.rules.len(),
        config.content.source.display(),
        config.content.target.display()
    );
    Ok(config)
}
