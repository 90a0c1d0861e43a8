use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use vintner_core::settings::Store;

/// Connectivity signals sourced from the launcher's network monitor.
#[async_trait]
pub trait Connectivity: Send + Sync {
    /// Cached network state maintained by the monitor.
    fn is_online(&self) -> bool;
    /// Whether the storefront's own service reports an outage.
    async fn is_store_service_offline(&self, store: Store) -> bool;
}

/// Monitor stand-in that assumes the network is reachable.
#[derive(Debug, Default)]
pub struct AssumeOnline;

#[async_trait]
impl Connectivity for AssumeOnline {
    fn is_online(&self) -> bool {
        true
    }

    async fn is_store_service_offline(&self, _store: Store) -> bool {
        false
    }
}

/// Steam runtime generations a native build can be contained in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeFlavor {
    Scout,
    Soldier,
}

#[derive(Debug, Clone)]
pub struct SteamRuntime {
    pub path: PathBuf,
    pub flavor: RuntimeFlavor,
    pub version: String,
}

impl SteamRuntime {
    /// Command string spliced into the wrapper chain. Soldier's entry point
    /// needs `--` between itself and the wrapped command.
    pub fn wrapper_command(&self) -> String {
        match self.flavor {
            RuntimeFlavor::Soldier => format!("{} --", self.path.display()),
            RuntimeFlavor::Scout => self.path.display().to_string(),
        }
    }
}

/// Locates helper tools used in the wrapper chain.
pub trait ToolResolver: Send + Sync {
    fn find_on_path(&self, name: &str) -> Option<PathBuf>;
    fn steam_runtime(&self, flavor: RuntimeFlavor) -> Option<SteamRuntime>;
}

/// PATH-backed resolver. Steam runtimes live in external catalogs, so this
/// one reports none.
#[derive(Debug, Default)]
pub struct PathResolver;

impl ToolResolver for PathResolver {
    fn find_on_path(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }

    fn steam_runtime(&self, _flavor: RuntimeFlavor) -> Option<SteamRuntime> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphicsLayer {
    Dxvk,
    Vkd3d,
}

impl GraphicsLayer {
    pub fn label(&self) -> &'static str {
        match self {
            GraphicsLayer::Dxvk => "dxvk",
            GraphicsLayer::Vkd3d => "vkd3d",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerAction {
    /// Install the layer's DLLs, backing up the originals.
    Backup,
    /// Restore the original DLLs.
    Restore,
}

/// Installs or removes DXVK/VKD3D DLL overrides inside a verified prefix.
#[async_trait]
pub trait GraphicsLayerInstaller: Send + Sync {
    async fn apply(
        &self,
        prefix: &Path,
        wine_bin: &Path,
        layer: GraphicsLayer,
        action: LayerAction,
    ) -> anyhow::Result<()>;
}

/// Default installer: graphics layers are left to external tooling.
#[derive(Debug, Default)]
pub struct UnmanagedGraphicsLayers;

#[async_trait]
impl GraphicsLayerInstaller for UnmanagedGraphicsLayers {
    async fn apply(
        &self,
        prefix: &Path,
        _wine_bin: &Path,
        layer: GraphicsLayer,
        _action: LayerAction,
    ) -> anyhow::Result<()> {
        debug!(
            target: "launcher",
            layer = layer.label(),
            prefix = %prefix.display(),
            "no graphics layer installer wired, skipping"
        );
        Ok(())
    }
}

/// Store-specific fixups that must run once a prefix was created or
/// rewritten (registry tweaks, redistributable installs).
#[async_trait]
pub trait PostPrefixSetup: Send + Sync {
    async fn run(&self, app_name: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct NoPostPrefixSetup;

#[async_trait]
impl PostPrefixSetup for NoPostPrefixSetup {
    async fn run(&self, app_name: &str) -> anyhow::Result<()> {
        debug!(target: "launcher", app = app_name, "no post-prefix setup wired, skipping");
        Ok(())
    }
}

/// Rich-presence integration; connected while at least one game runs.
pub trait PresenceClient: Send + Sync {
    fn connect(&self, title: &str);
    fn disconnect(&self);
}

/// Presence stand-in that only logs.
#[derive(Debug, Default)]
pub struct LogPresence;

impl PresenceClient for LogPresence {
    fn connect(&self, title: &str) {
        info!(target: "launcher", "updated rich presence to {title}");
    }

    fn disconnect(&self) {
        info!(target: "launcher", "stopped rich presence");
    }
}

/// Keeps the display awake while at least one game runs.
pub trait SleepInhibitor: Send + Sync {
    fn inhibit(&self);
    fn release(&self);
}

/// Inhibitor stand-in that only logs.
#[derive(Debug, Default)]
pub struct LogSleepInhibitor;

impl SleepInhibitor for LogSleepInhibitor {
    fn inhibit(&self) {
        debug!(target: "launcher", "display sleep inhibited");
    }

    fn release(&self) {
        debug!(target: "launcher", "display sleep allowed again");
    }
}
