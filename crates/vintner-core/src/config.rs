use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Launcher-wide configuration. Per-game settings live in their own files;
/// this covers the pieces shared by every launch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    pub stores: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Announce the running game over the rich-presence client.
    pub discord_rpc: bool,
    /// Keep the display awake while a game runs.
    pub inhibit_sleep: bool,
    /// Write a playtime session record when a launch ends.
    pub store_session_records: bool,
}

/// Overrides for the store runner binaries; unset means PATH lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub legendary_bin: Option<PathBuf>,
    pub gogdl_bin: Option<PathBuf>,
}

impl Config {
    pub fn default_config() -> Self {
        Self {
            general: GeneralConfig {
                discord_rpc: false,
                inhibit_sleep: true,
                store_session_records: true,
            },
            stores: StoreConfig {
                legendary_bin: None,
                gogdl_bin: None,
            },
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("parse config TOML")?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        let output = toml::to_string_pretty(self).context("render config TOML")?;
        Ok(output)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("read config at {}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    /// Missing config is not an error; every field has a sane default.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config dir {}", parent.display()))?;
        }
        let contents = self.to_toml_string()?;
        fs::write(path, contents).with_context(|| format!("write config at {}", path.display()))?;
        Ok(())
    }
}
