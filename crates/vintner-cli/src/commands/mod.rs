pub mod config;
pub mod launch;
pub mod prefix;
pub mod wine;

use std::path::PathBuf;

use anyhow::{Context, Result};

use vintner_core::config::Config;
use vintner_core::paths::LauncherPaths;
use vintner_core::settings::GameSettings;

/// Shared wiring for every subcommand: resolved paths, loaded config, and
/// the per-game settings file.
pub(crate) fn load_environment(config_path: Option<PathBuf>) -> Result<(LauncherPaths, Config)> {
    let paths = LauncherPaths::resolve()?;
    let config_path = config_path.unwrap_or_else(|| paths.config_path.clone());
    let config = Config::load_or_default(&config_path)?;
    Ok((paths, config))
}

pub(crate) fn load_game_settings(paths: &LauncherPaths, app_name: &str) -> Result<GameSettings> {
    let settings_path = paths.game_settings_path(app_name);
    GameSettings::load(&settings_path).with_context(|| {
        format!(
            "no settings for {app_name}; expected a file at {}",
            settings_path.display()
        )
    })
}
