use anyhow::{Context, Result};
use pricescout::config::{Config, DEFAULT_CONFIG_FILE};
use std::path::{Path, PathBuf};

pub fn init_config(path: &Path, force: bool) -> Result<()> {
    let config_path: PathBuf = if path.is_dir() {
        path.join(DEFAULT_CONFIG_FILE)
    } else {
        path.to_path_buf()
    };

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    std::fs::write(&config_path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("Created configuration file: {}", config_path.display());

    Ok(())
}
