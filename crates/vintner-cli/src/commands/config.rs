use std::path::PathBuf;

use anyhow::Result;

pub fn print_effective(config_path: Option<PathBuf>) -> Result<()> {
    let (_paths, config) = super::load_environment(config_path)?;
    println!("{}", config.to_toml_string()?);
    Ok(())
}
