use std::path::{Path, PathBuf};

use anyhow::Result;
use directories::{BaseDirs, ProjectDirs};

/// Well-known directories used across the launch machinery.
#[derive(Debug, Clone)]
pub struct LauncherPaths {
    pub config_path: PathBuf,
    /// Per-game settings files, one TOML per game.
    pub games_dir: PathBuf,
    pub data_dir: PathBuf,
    /// Per-game output logs, truncated on every launch.
    pub log_dir: PathBuf,
    /// Playtime session records.
    pub session_dir: PathBuf,
    /// Anti-cheat runtimes (EAC, BattlEye) unpacked by the installer layer.
    pub runtime_dir: PathBuf,
    /// Steam client root, needed by Proton's compat tooling.
    pub steam_root: PathBuf,
    /// CrossOver bottle collection.
    pub crossover_bottles: PathBuf,
    pub home_dir: PathBuf,
}

impl LauncherPaths {
    pub fn resolve() -> Result<Self> {
        let project_dirs = ProjectDirs::from("io", "vintner", "vintner")
            .ok_or_else(|| anyhow::anyhow!("unable to determine project directories"))?;
        let base_dirs =
            BaseDirs::new().ok_or_else(|| anyhow::anyhow!("unable to determine home directory"))?;
        let home_dir = base_dirs.home_dir().to_path_buf();
        let config_dir = project_dirs.config_dir().to_path_buf();
        let data_dir = project_dirs.data_dir().to_path_buf();
        Ok(Self {
            config_path: config_dir.join("config.toml"),
            games_dir: config_dir.join("games"),
            log_dir: data_dir.join("logs"),
            session_dir: data_dir.join("sessions"),
            runtime_dir: data_dir.join("runtimes"),
            steam_root: home_dir.join(".steam").join("steam"),
            crossover_bottles: home_dir.join("Library/Application Support/CrossOver/Bottles"),
            data_dir,
            home_dir,
        })
    }

    /// Anchors every directory under one root. Used for portable installs
    /// and throughout the test suites.
    pub fn under_root(root: &Path) -> Self {
        Self {
            config_path: root.join("config").join("config.toml"),
            games_dir: root.join("config").join("games"),
            data_dir: root.join("data"),
            log_dir: root.join("data").join("logs"),
            session_dir: root.join("data").join("sessions"),
            runtime_dir: root.join("data").join("runtimes"),
            steam_root: root.join(".steam").join("steam"),
            crossover_bottles: root.join("Bottles"),
            home_dir: root.to_path_buf(),
        }
    }

    pub fn game_settings_path(&self, app_name: &str) -> PathBuf {
        self.games_dir.join(format!("{app_name}.toml"))
    }

    pub fn game_log_path(&self, app_name: &str) -> PathBuf {
        self.log_dir.join(format!("{app_name}-last-run.log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rooted_paths_stay_under_root() {
        let paths = LauncherPaths::under_root(Path::new("/tmp/vintner-test"));
        assert!(paths.game_settings_path("Odyssey").starts_with("/tmp/vintner-test"));
        assert!(paths
            .game_log_path("Odyssey")
            .to_string_lossy()
            .ends_with("Odyssey-last-run.log"));
    }
}
