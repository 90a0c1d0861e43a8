use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

use vintner_core::paths::LauncherPaths;
use vintner_core::settings::{GameSettings, WineRuntime};

/// Derives the environment overlay for one launch attempt from the game's
/// settings. The inherited process environment is captured at construction
/// time, so composition itself is deterministic and free of side effects.
pub struct EnvComposer<'a> {
    settings: &'a GameSettings,
    app_name: &'a str,
    paths: &'a LauncherPaths,
    inherited: HashMap<String, String>,
}

impl<'a> EnvComposer<'a> {
    pub fn new(settings: &'a GameSettings, app_name: &'a str, paths: &'a LauncherPaths) -> Self {
        Self {
            settings,
            app_name,
            paths,
            inherited: std::env::vars().collect(),
        }
    }

    /// Replaces the captured environment. Test seam.
    pub fn with_inherited(mut self, inherited: HashMap<String, String>) -> Self {
        self.inherited = inherited;
        self
    }

    /// Variables independent of the compatibility layer: GPU offload, audio
    /// latency, user overrides, and the preload guard.
    pub fn general(&self) -> HashMap<String, String> {
        let settings = self.settings;
        let mut env = HashMap::new();

        if settings.nvidia_prime {
            env.insert("DRI_PRIME".to_string(), "1".to_string());
            env.insert("__NV_PRIME_RENDER_OFFLOAD".to_string(), "1".to_string());
            env.insert("__GLX_VENDOR_LIBRARY_NAME".to_string(), "nvidia".to_string());
        }
        if settings.audio_fix {
            env.insert("PULSE_LATENCY_MSEC".to_string(), "60".to_string());
        }
        for entry in &settings.env_entries {
            env.insert(
                entry.key.clone(),
                strip_outer_quotes(&entry.value).to_string(),
            );
        }
        // A preload path leaking in from the host session crashes some games.
        if !self.inherited.contains_key("LD_PRELOAD") && !env.contains_key("LD_PRELOAD") {
            env.insert("LD_PRELOAD".to_string(), String::new());
        }

        env
    }

    /// Variables tied to the configured wine/proton/crossover runtime.
    pub fn wine(&self) -> HashMap<String, String> {
        let settings = self.settings;
        let mut env = HashMap::new();

        match &settings.runtime {
            WineRuntime::Wine(_) => {
                env.insert("WINEPREFIX".to_string(), path_string(&settings.wine_prefix));
            }
            WineRuntime::Proton(_) => {
                env.insert(
                    "STEAM_COMPAT_CLIENT_INSTALL_PATH".to_string(),
                    path_string(&self.paths.steam_root),
                );
                env.insert(
                    "STEAM_COMPAT_DATA_PATH".to_string(),
                    path_string(&settings.wine_prefix),
                );
            }
            WineRuntime::Crossover(build) => {
                env.insert("CX_BOTTLE".to_string(), build.bottle.clone());
            }
        }

        if settings.show_fps {
            env.insert("DXVK_HUD".to_string(), "fps".to_string());
        }
        if settings.enable_fsr {
            env.insert("WINE_FULLSCREEN_FSR".to_string(), "1".to_string());
            env.insert(
                "WINE_FULLSCREEN_FSR_STRENGTH".to_string(),
                settings.max_sharpness.to_string(),
            );
        }

        // Proton defaults esync/fsync on and wine defaults them off, so each
        // side only needs the variable for its non-default state.
        let proton = settings.runtime.is_proton();
        if settings.enable_esync && !proton {
            env.insert("WINEESYNC".to_string(), "1".to_string());
        }
        if !settings.enable_esync && proton {
            env.insert("PROTON_NO_ESYNC".to_string(), "1".to_string());
        }
        if settings.enable_fsync && !proton {
            env.insert("WINEFSYNC".to_string(), "1".to_string());
        }
        if !settings.enable_fsync && proton {
            env.insert("PROTON_NO_FSYNC".to_string(), "1".to_string());
        }

        if settings.enable_resizable_bar {
            env.insert("VKD3D_CONFIG".to_string(), "upload_hvv".to_string());
        }
        if settings.eac_runtime {
            env.insert(
                "PROTON_EAC_RUNTIME".to_string(),
                path_string(&self.paths.runtime_dir.join("eac_runtime")),
            );
        }
        if settings.battleye_runtime {
            env.insert(
                "PROTON_BATTLEYE_RUNTIME".to_string(),
                path_string(&self.paths.runtime_dir.join("battleye_runtime")),
            );
        }

        if proton {
            // GE-Proton guesses the app id from the prefix path unless pinned.
            env.insert("STEAM_COMPAT_APP_ID".to_string(), "0".to_string());
            env.insert("SteamAppId".to_string(), "0".to_string());
            // Proton names its log file after this value.
            env.insert("SteamGameId".to_string(), format!("heroic-{}", self.app_name));
            env.insert("PROTON_LOG_DIR".to_string(), path_string(&self.paths.home_dir));

            if settings.env_entries.iter().any(|entry| entry.key == "PROTON_LOG") {
                // Left to its own devices Proton widens WINEDEBUG, and some
                // games then log gigabytes per session.
                env.insert("WINEDEBUG".to_string(), "timestamp".to_string());
            }
        }

        if !settings.prefer_system_libs {
            if let WineRuntime::Wine(build) = &settings.runtime {
                match (&build.lib32, &build.lib) {
                    (Some(lib32), Some(lib)) => {
                        let mut parts = vec![path_string(lib32), path_string(lib)];
                        if let Some(current) = self.inherited.get("LD_LIBRARY_PATH") {
                            parts.push(current.clone());
                        }
                        env.insert("LD_LIBRARY_PATH".to_string(), parts.join(":"));
                    }
                    _ => {
                        warn!(
                            target: "launcher",
                            wine = %build.name,
                            "library folders of the selected wine build are incomplete, falling back to system libraries"
                        );
                    }
                }
            }
        }

        env
    }

    /// Full overlay for a launch: the general pass first, the runtime pass
    /// layered on top so its mandatory variables win on key collisions.
    pub fn compose(&self) -> HashMap<String, String> {
        let mut env = self.general();
        env.extend(self.wine());
        env
    }
}

/// Drops one layer of redundant surrounding quotes from a user-entered value.
fn strip_outer_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
