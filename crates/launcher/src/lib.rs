use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use launch_env::{build_wrapper_chain, EnvComposer, ResolvedTools};
use prefix_manager::{ensure_prefix, PrefixStatus};
use runner::wine::WineCommandOptions;
use runner::{run_process, CommandSpec, ExecResult, RunOptions};
use vintner_core::config::Config;
use vintner_core::diagnostics::{should_surface_dialog, DiagnosticsSink, LogDiagnostics};
use vintner_core::error::LaunchError;
use vintner_core::paths::LauncherPaths;
use vintner_core::settings::{GameMeta, GameSettings, Store, WineRuntime};

mod preconditions;
pub mod session;
pub mod traits;

use session::{SessionRecord, SessionResources};
use traits::{
    AssumeOnline, Connectivity, GraphicsLayer, GraphicsLayerInstaller, LayerAction, LogPresence,
    LogSleepInhibitor, NoPostPrefixSetup, PathResolver, PostPrefixSetup, RuntimeFlavor,
    ToolResolver, UnmanagedGraphicsLayers,
};

/// One launch attempt: game identity plus extra arguments forwarded to the
/// store runner's launch command.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub meta: GameMeta,
    pub settings: GameSettings,
    pub extra_args: Vec<String>,
}

/// Coordinates a launch end to end: preconditions, prefix verification,
/// environment and wrapper composition, then supervised execution. One
/// instance serves any number of launches; per-attempt state lives on the
/// stack of `launch`.
pub struct Launcher {
    config: Config,
    paths: LauncherPaths,
    connectivity: Arc<dyn Connectivity>,
    resolver: Arc<dyn ToolResolver>,
    graphics: Arc<dyn GraphicsLayerInstaller>,
    post_setup: Arc<dyn PostPrefixSetup>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    resources: Arc<SessionResources>,
}

impl Launcher {
    pub fn new(config: Config, paths: LauncherPaths) -> Self {
        let resources = SessionResources::new(
            Arc::new(LogPresence),
            Arc::new(LogSleepInhibitor),
            config.general.discord_rpc,
            config.general.inhibit_sleep,
        );
        Self {
            config,
            paths,
            connectivity: Arc::new(AssumeOnline),
            resolver: Arc::new(PathResolver),
            graphics: Arc::new(UnmanagedGraphicsLayers),
            post_setup: Arc::new(NoPostPrefixSetup),
            diagnostics: Arc::new(LogDiagnostics),
            resources,
        }
    }

    pub fn with_connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ToolResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_graphics_installer(mut self, graphics: Arc<dyn GraphicsLayerInstaller>) -> Self {
        self.graphics = graphics;
        self
    }

    pub fn with_post_prefix_setup(mut self, post_setup: Arc<dyn PostPrefixSetup>) -> Self {
        self.post_setup = post_setup;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_session_resources(mut self, resources: Arc<SessionResources>) -> Self {
        self.resources = resources;
        self
    }

    /// Launches a game through its store runner. Resolves once the game
    /// process ends; the result carries the captured output and the redacted
    /// command line.
    pub async fn launch(&self, request: LaunchRequest) -> Result<ExecResult> {
        let LaunchRequest {
            meta,
            settings,
            extra_args,
        } = request;

        info!(target: "launcher", app = %meta.app_name, "preparing launch");

        // Preconditions; nothing is spawned past a failing check.
        if !meta.can_run_offline
            && preconditions::effective_offline(&settings, &meta, self.connectivity.as_ref()).await
        {
            return Err(LaunchError::OfflineNotSupported.into());
        }
        preconditions::check_wine_binary(&settings)?;
        preconditions::check_crossover_bottle(&settings, &self.paths)?;

        if settings.runtime.is_proton() {
            warn!(
                target: "launcher",
                "proton is selected; game bugs under proton are not launcher bugs"
            );
        }

        let _session = self.resources.acquire(&meta.title);
        let mut record = SessionRecord::begin(&meta);

        let tools = self.resolve_tools(&settings);

        let status = ensure_prefix(&settings, &meta.app_name, &self.paths)
            .await
            .map_err(|source| LaunchError::PrefixInit {
                prefix: settings.wine_prefix.clone(),
                reason: format!("{source:#}"),
            })?;
        if status.updated {
            self.post_setup
                .run(&meta.app_name)
                .await
                .context("post-prefix setup")?;
        }
        self.install_graphics_layers(&settings).await?;

        let env = EnvComposer::new(&settings, &meta.app_name, &self.paths).compose();
        let wrappers = build_wrapper_chain(&settings, &tools);

        let runner_bin = self.store_runner_bin(meta.store)?;
        let mut parts = vec!["launch".to_string(), meta.app_name.clone()];
        parts.extend(extra_args);

        let mut spec = CommandSpec::new(&runner_bin, parts);
        if let Some(dir) = runner_bin.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            spec = spec.with_cwd(dir);
        }

        let options = RunOptions {
            env,
            wrappers,
            log_file: Some(self.paths.game_log_path(&meta.app_name)),
            on_output: None,
            runner_label: meta.store.label().to_string(),
            app_name: meta.app_name.clone(),
            log_message_prefix: Some(format!("launching {}", meta.title)),
            diagnostics: Some(Arc::clone(&self.diagnostics)),
        };

        let outcome = run_process(spec, options).await;

        record.finish();
        if self.config.general.store_session_records {
            record.save_or_warn(&self.paths.session_dir);
        }

        match outcome {
            Ok(result) => {
                info!(target: "launcher", app = %meta.app_name, "game process ended");
                Ok(result)
            }
            Err(source) => {
                let text = source.to_string();
                if should_surface_dialog(&text) {
                    error!(target: "launcher", app = %meta.app_name, "launch failed: {text}");
                } else {
                    info!(target: "launcher", app = %meta.app_name, "launch ended: {text}");
                }
                Err(source.into())
            }
        }
    }

    /// Verifies the game's wine prefix, creating and booting it if needed.
    pub async fn verify_prefix(
        &self,
        meta: &GameMeta,
        settings: &GameSettings,
    ) -> Result<PrefixStatus> {
        preconditions::check_wine_binary(settings)?;
        let status = ensure_prefix(settings, &meta.app_name, &self.paths)
            .await
            .map_err(|source| LaunchError::PrefixInit {
                prefix: settings.wine_prefix.clone(),
                reason: format!("{source:#}"),
            })?;
        Ok(status)
    }

    /// Runs an ad-hoc command (winecfg, winetricks, an arbitrary EXE)
    /// through the game's wine environment.
    pub async fn run_wine_command(
        &self,
        meta: &GameMeta,
        settings: &GameSettings,
        args: Vec<String>,
        wait: bool,
    ) -> Result<ExecResult> {
        preconditions::check_wine_binary(settings)?;
        let result = runner::wine::run_wine_command(
            settings,
            &meta.app_name,
            &self.paths,
            args,
            WineCommandOptions {
                wait,
                force_prefix_verb: false,
            },
        )
        .await?;
        Ok(result)
    }

    /// Resolves the helper tools enabled in the settings. Misses are
    /// warnings; the corresponding feature is disabled for this attempt.
    fn resolve_tools(&self, settings: &GameSettings) -> ResolvedTools {
        let mut tools = ResolvedTools::default();
        if settings.show_mangohud {
            match self.resolver.find_on_path("mangohud") {
                Some(path) => {
                    // The overlay needs --dlsym alongside the wrapped command.
                    tools.mangohud = Some(format!("{} --dlsym", path.display()));
                }
                None => warn!(target: "launcher", "mangohud is enabled but not installed"),
            }
        }
        if settings.use_game_mode {
            match self.resolver.find_on_path("gamemoderun") {
                Some(path) => tools.gamemode = Some(path.display().to_string()),
                None => warn!(target: "launcher", "gamemode is enabled but not installed"),
            }
        }
        if settings.use_steam_runtime {
            match self.resolver.steam_runtime(RuntimeFlavor::Scout) {
                Some(runtime) => {
                    info!(target: "launcher", "using {} steam runtime", runtime.version);
                    tools.steam_runtime = Some(runtime.wrapper_command());
                }
                None => warn!(target: "launcher", "no usable steam runtime found"),
            }
        }
        tools
    }

    /// DLL overrides must be in place before the game process spawns.
    async fn install_graphics_layers(&self, settings: &GameSettings) -> Result<()> {
        let WineRuntime::Wine(build) = &settings.runtime else {
            return Ok(());
        };
        if settings.auto_install_dxvk {
            self.graphics
                .apply(
                    &settings.wine_prefix,
                    &build.bin,
                    GraphicsLayer::Dxvk,
                    LayerAction::Backup,
                )
                .await
                .context("install dxvk")?;
        }
        if settings.auto_install_vkd3d {
            self.graphics
                .apply(
                    &settings.wine_prefix,
                    &build.bin,
                    GraphicsLayer::Vkd3d,
                    LayerAction::Backup,
                )
                .await
                .context("install vkd3d")?;
        }
        Ok(())
    }

    fn store_runner_bin(&self, store: Store) -> Result<PathBuf> {
        let configured = match store {
            Store::Epic => &self.config.stores.legendary_bin,
            Store::Gog => &self.config.stores.gogdl_bin,
        };
        if let Some(path) = configured {
            debug!(target: "launcher", "using configured {} at {}", store.runner_bin(), path.display());
            return Ok(path.clone());
        }
        self.resolver
            .find_on_path(store.runner_bin())
            .ok_or_else(|| anyhow::anyhow!("{} was not found on PATH", store.runner_bin()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use async_trait::async_trait;
    use vintner_core::settings::{CrossoverBuild, WineBuild};

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let bin = dir.join(name);
        let mut file = std::fs::File::create(&bin).unwrap();
        writeln!(file, "#!/bin/sh\n{body}").unwrap();
        drop(file);
        let mut perms = std::fs::metadata(&bin).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&bin, perms).unwrap();
        bin
    }

    fn wine_settings(dir: &Path) -> GameSettings {
        GameSettings {
            runtime: WineRuntime::Wine(WineBuild {
                name: "test wine".to_string(),
                bin: script(dir, "wine", "exit 0"),
                wineserver: None,
                lib32: None,
                lib: None,
            }),
            wine_prefix: dir.join("prefix"),
            ..GameSettings::default()
        }
    }

    fn meta(can_run_offline: bool) -> GameMeta {
        GameMeta {
            app_name: "Odyssey".to_string(),
            title: "Odyssey".to_string(),
            can_run_offline,
            store: Store::Epic,
        }
    }

    struct OfflineConnectivity;

    #[async_trait]
    impl Connectivity for OfflineConnectivity {
        fn is_online(&self) -> bool {
            false
        }

        async fn is_store_service_offline(&self, _store: Store) -> bool {
            false
        }
    }

    struct NothingResolver;

    impl ToolResolver for NothingResolver {
        fn find_on_path(&self, _name: &str) -> Option<PathBuf> {
            None
        }

        fn steam_runtime(&self, _flavor: RuntimeFlavor) -> Option<traits::SteamRuntime> {
            None
        }
    }

    #[derive(Default)]
    struct CountingSetup(AtomicUsize);

    #[async_trait]
    impl PostPrefixSetup for CountingSetup {
        async fn run(&self, _app_name: &str) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_online_only_game_aborts_offline() {
        let dir = tempfile::tempdir().unwrap();
        let paths = LauncherPaths::under_root(dir.path());
        let launcher = Launcher::new(Config::default_config(), paths)
            .with_connectivity(Arc::new(OfflineConnectivity));

        let request = LaunchRequest {
            meta: meta(false),
            settings: wine_settings(dir.path()),
            extra_args: Vec::new(),
        };
        let error = launcher.launch(request).await.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<LaunchError>(),
            Some(LaunchError::OfflineNotSupported)
        ));
    }

    #[tokio::test]
    async fn test_unselected_wine_aborts_before_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let paths = LauncherPaths::under_root(dir.path());
        let launcher = Launcher::new(Config::default_config(), paths);

        let settings = GameSettings {
            wine_prefix: dir.path().join("prefix"),
            ..GameSettings::default()
        };
        let request = LaunchRequest {
            meta: meta(true),
            settings,
            extra_args: Vec::new(),
        };
        let error = launcher.launch(request).await.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<LaunchError>(),
            Some(LaunchError::WineNotConfigured)
        ));
        assert!(!dir.path().join("prefix").exists());
    }

    #[tokio::test]
    async fn test_missing_bottle_aborts_before_prefix_work() {
        let dir = tempfile::tempdir().unwrap();
        let paths = LauncherPaths::under_root(dir.path());
        let launcher = Launcher::new(Config::default_config(), paths);

        let settings = GameSettings {
            runtime: WineRuntime::Crossover(CrossoverBuild {
                name: "CrossOver 22".to_string(),
                bin: PathBuf::from("/opt/cx/bin/wine"),
                bottle: "MyBottle".to_string(),
            }),
            wine_prefix: dir.path().join("prefix"),
            ..GameSettings::default()
        };
        let request = LaunchRequest {
            meta: meta(true),
            settings,
            extra_args: Vec::new(),
        };
        let error = launcher.launch(request).await.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<LaunchError>(),
            Some(LaunchError::MissingBottle(name)) if name == "MyBottle"
        ));
        assert!(!dir.path().join("prefix").exists());
    }

    #[tokio::test]
    async fn test_full_launch_against_fake_runner() {
        let dir = tempfile::tempdir().unwrap();
        let paths = LauncherPaths::under_root(dir.path());

        let mut config = Config::default_config();
        config.stores.legendary_bin = Some(script(dir.path(), "legendary", "echo launched $@"));

        let setup = Arc::new(CountingSetup::default());
        let launcher = Launcher::new(config, paths.clone())
            .with_post_prefix_setup(Arc::clone(&setup) as Arc<dyn PostPrefixSetup>);

        let mut settings = wine_settings(dir.path());
        settings.runtime = WineRuntime::Wine(WineBuild {
            name: "test wine".to_string(),
            bin: script(dir.path(), "wine", "echo 'prefix has been updated' >&2"),
            wineserver: None,
            lib32: None,
            lib: None,
        });

        let request = LaunchRequest {
            meta: meta(true),
            settings,
            extra_args: vec!["--skip-version-check".to_string()],
        };
        let result = launcher.launch(request).await.unwrap();
        assert_eq!(result.stdout, "launched launch Odyssey --skip-version-check");
        assert_eq!(setup.0.load(Ordering::SeqCst), 1);

        let log = std::fs::read_to_string(paths.game_log_path("Odyssey")).unwrap();
        assert!(log.contains("launched"));
    }

    #[tokio::test]
    async fn test_missing_tools_disable_features_without_failing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = LauncherPaths::under_root(dir.path());
        let launcher = Launcher::new(Config::default_config(), paths)
            .with_resolver(Arc::new(NothingResolver));

        let mut settings = wine_settings(dir.path());
        settings.show_mangohud = true;
        settings.use_game_mode = true;
        settings.use_steam_runtime = true;

        let tools = launcher.resolve_tools(&settings);
        assert!(tools.mangohud.is_none());
        assert!(tools.gamemode.is_none());
        assert!(tools.steam_runtime.is_none());
        assert!(build_wrapper_chain(&settings, &tools).is_empty());
    }

    #[tokio::test]
    async fn test_failed_boot_surfaces_as_prefix_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = LauncherPaths::under_root(dir.path());
        let launcher = Launcher::new(Config::default_config(), paths);

        let settings = GameSettings {
            runtime: WineRuntime::Wine(WineBuild {
                name: "missing wine".to_string(),
                bin: PathBuf::from("/nonexistent/wine"),
                wineserver: None,
                lib32: None,
                lib: None,
            }),
            wine_prefix: dir.path().join("prefix"),
            ..GameSettings::default()
        };
        let error = launcher
            .verify_prefix(&meta(true), &settings)
            .await
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<LaunchError>(),
            Some(LaunchError::PrefixInit { .. })
        ));
    }

    #[tokio::test]
    async fn test_verify_prefix_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let paths = LauncherPaths::under_root(dir.path());
        let launcher = Launcher::new(Config::default_config(), paths);

        let settings = GameSettings {
            runtime: WineRuntime::Wine(WineBuild {
                name: "test wine".to_string(),
                bin: script(
                    dir.path(),
                    "wine",
                    "if [ ! -f \"$WINEPREFIX/system.reg\" ]; then \
                       echo 'prefix has been updated' >&2; \
                       touch \"$WINEPREFIX/system.reg\"; \
                     fi",
                ),
                wineserver: None,
                lib32: None,
                lib: None,
            }),
            wine_prefix: dir.path().join("prefix"),
            ..GameSettings::default()
        };

        let first = launcher.verify_prefix(&meta(true), &settings).await.unwrap();
        assert!(first.updated);
        let second = launcher.verify_prefix(&meta(true), &settings).await.unwrap();
        assert!(!second.updated);
    }
}
