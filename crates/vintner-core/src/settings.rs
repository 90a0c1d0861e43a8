use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// The compatibility layer a game is configured to run under. Exactly one
/// variant is active per game; fields a variant cannot function without are
/// required on that variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WineRuntime {
    Wine(WineBuild),
    Proton(ProtonBuild),
    Crossover(CrossoverBuild),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WineBuild {
    pub name: String,
    pub bin: PathBuf,
    pub wineserver: Option<PathBuf>,
    pub lib32: Option<PathBuf>,
    pub lib: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtonBuild {
    pub name: String,
    pub bin: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossoverBuild {
    pub name: String,
    pub bin: PathBuf,
    pub bottle: String,
}

impl WineRuntime {
    pub fn bin(&self) -> &Path {
        match self {
            WineRuntime::Wine(build) => &build.bin,
            WineRuntime::Proton(build) => &build.bin,
            WineRuntime::Crossover(build) => &build.bin,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            WineRuntime::Wine(build) => &build.name,
            WineRuntime::Proton(build) => &build.name,
            WineRuntime::Crossover(build) => &build.name,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WineRuntime::Wine(_) => "wine",
            WineRuntime::Proton(_) => "proton",
            WineRuntime::Crossover(_) => "crossover",
        }
    }

    pub fn is_proton(&self) -> bool {
        matches!(self, WineRuntime::Proton(_))
    }

    pub fn is_wine(&self) -> bool {
        matches!(self, WineRuntime::Wine(_))
    }
}

/// An environment override as entered by the user. Keys may repeat across
/// entries; the last entry wins once composed into a map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvEntry {
    pub key: String,
    pub value: String,
}

/// A wrapper executable plus its argument string, split shell-style at
/// composition time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrapperEntry {
    pub exe: String,
    #[serde(default)]
    pub args: String,
}

/// Per-game launch settings, persisted as one TOML file per game and
/// consumed read-only by the launch machinery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub runtime: WineRuntime,
    pub wine_prefix: PathBuf,
    pub offline_mode: bool,
    pub nvidia_prime: bool,
    pub audio_fix: bool,
    pub show_fps: bool,
    pub enable_fsr: bool,
    /// FSR sharpness, 1 to 5.
    pub max_sharpness: u8,
    pub enable_esync: bool,
    pub enable_fsync: bool,
    pub enable_resizable_bar: bool,
    pub eac_runtime: bool,
    pub battleye_runtime: bool,
    pub prefer_system_libs: bool,
    pub use_game_mode: bool,
    pub show_mangohud: bool,
    pub use_steam_runtime: bool,
    pub auto_install_dxvk: bool,
    pub auto_install_vkd3d: bool,
    pub env_entries: Vec<EnvEntry>,
    pub wrapper_entries: Vec<WrapperEntry>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            // An empty binary path means no wine build has been picked yet;
            // the launch preconditions reject it.
            runtime: WineRuntime::Wine(WineBuild {
                name: String::new(),
                bin: PathBuf::new(),
                wineserver: None,
                lib32: None,
                lib: None,
            }),
            wine_prefix: PathBuf::new(),
            offline_mode: false,
            nvidia_prime: false,
            audio_fix: false,
            show_fps: false,
            enable_fsr: false,
            max_sharpness: 2,
            enable_esync: true,
            enable_fsync: true,
            enable_resizable_bar: false,
            eac_runtime: false,
            battleye_runtime: false,
            prefer_system_libs: false,
            use_game_mode: false,
            show_mangohud: false,
            use_steam_runtime: false,
            auto_install_dxvk: false,
            auto_install_vkd3d: false,
            env_entries: Vec::new(),
            wrapper_entries: Vec::new(),
        }
    }
}

impl GameSettings {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings: GameSettings = toml::from_str(contents).context("parse game settings TOML")?;
        Ok(settings)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        let output = toml::to_string_pretty(self).context("render game settings TOML")?;
        Ok(output)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("read game settings at {}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create settings dir {}", parent.display()))?;
        }
        let contents = self.to_toml_string()?;
        fs::write(path, contents)
            .with_context(|| format!("write game settings at {}", path.display()))?;
        Ok(())
    }
}

/// Game metadata owned by the library layer, not editable by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMeta {
    pub app_name: String,
    pub title: String,
    #[serde(default)]
    pub can_run_offline: bool,
    #[serde(default)]
    pub store: Store,
}

/// Distribution backend a game was installed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Store {
    Epic,
    Gog,
}

impl Store {
    /// Default name of the store's command line runner.
    pub fn runner_bin(&self) -> &'static str {
        match self {
            Store::Epic => "legendary",
            Store::Gog => "gogdl",
        }
    }

    /// Stable tag identifying the runner in log lines and diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Store::Epic => "legendary",
            Store::Gog => "gogdl",
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Store::Epic
    }
}

impl FromStr for Store {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "epic" | "legendary" => Ok(Store::Epic),
            "gog" | "gogdl" => Ok(Store::Gog),
            _ => Err(format!("unknown store: {value}")),
        }
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Store::Epic => "epic",
            Store::Gog => "gog",
        };
        write!(f, "{value}")
    }
}
