use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use launch_env::EnvComposer;
use vintner_core::paths::LauncherPaths;
use vintner_core::settings::{GameSettings, WineRuntime};

use crate::{run_process, CommandSpec, ExecError, ExecResult, RunOptions};

/// How a wine invocation synchronizes with the prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct WineCommandOptions {
    /// Wait for the command to fully settle inside the prefix. Plain wine
    /// waits through the wineserver; Proton has a dedicated verb.
    pub wait: bool,
    /// Force Proton's `runinprefix` verb instead of `run`.
    pub force_prefix_verb: bool,
}

/// Runs a command through the game's wine environment. This is the shared
/// execution path for prefix boots, winecfg, winetricks, and ad-hoc EXEs.
pub async fn run_wine_command(
    settings: &GameSettings,
    app_name: &str,
    paths: &LauncherPaths,
    args: Vec<String>,
    options: WineCommandOptions,
) -> Result<ExecResult, ExecError> {
    let env = EnvComposer::new(settings, app_name, paths).compose();

    let mut command_args = args;
    if settings.runtime.is_proton() {
        let verb = if options.force_prefix_verb {
            "runinprefix"
        } else if options.wait {
            "waitforexitandrun"
        } else {
            "run"
        };
        command_args.insert(0, verb.to_string());
    }

    let wine_bin = unquoted_bin(settings.runtime.bin());
    debug!(target: "wine", app = app_name, "running wine command: {}", command_args.join(" "));

    let run_options = RunOptions {
        env: env.clone(),
        runner_label: "wine".to_string(),
        app_name: app_name.to_string(),
        ..RunOptions::default()
    };
    let result = match run_process(CommandSpec::new(wine_bin, command_args), run_options).await {
        Ok(result) => result,
        Err(source) => {
            error!(target: "wine", app = app_name, "error running wine command: {source}");
            return Err(source);
        }
    };

    // Plain wine returns as soon as the request is handed to the wineserver;
    // waiting means waiting on the server itself.
    if options.wait {
        if let WineRuntime::Wine(build) = &settings.runtime {
            match &build.wineserver {
                Some(wineserver) => {
                    let wait_options = RunOptions {
                        env,
                        runner_label: "wine".to_string(),
                        app_name: app_name.to_string(),
                        ..RunOptions::default()
                    };
                    run_process(
                        CommandSpec::new(wineserver.clone(), vec!["--wait".to_string()]),
                        wait_options,
                    )
                    .await?;
                }
                None => warn!(
                    target: "wine",
                    app = app_name,
                    "unable to wait on the wine command, no wineserver configured"
                ),
            }
        }
    }

    Ok(result)
}

/// Stray quotes in stored binary paths break spawning; drop them.
fn unquoted_bin(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    if raw.contains('\'') {
        PathBuf::from(raw.replace('\'', ""))
    } else {
        path.to_path_buf()
    }
}
