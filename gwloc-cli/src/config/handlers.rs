use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use log::info;

use gwloc_core::GwlocConfig;

pub fn run_config(matches: &ArgMatches) -> Result<()> {
    let output = matches
        .get_one::<String>("output")
        .context("--output is required")?;
    let path = Path::new(output);

    if path.exists() && !matches.get_flag("force") {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let config = GwlocConfig::default();
    let text = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => config.to_toml()?,
        _ => config.to_yaml()?,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Example configuration written to {}", path.display());
    Ok(())
}
