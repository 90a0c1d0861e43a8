use std::path::PathBuf;

use anyhow::Result;

use launcher::{LaunchRequest, Launcher};
use vintner_core::settings::{GameMeta, Store};

pub struct LaunchInputs {
    pub config_path: Option<PathBuf>,
    pub app_name: String,
    pub store: Store,
    pub title: Option<String>,
    pub can_run_offline: bool,
    pub offline: bool,
    pub extra_args: Vec<String>,
}

pub async fn execute(inputs: LaunchInputs) -> Result<()> {
    let (paths, config) = super::load_environment(inputs.config_path)?;
    let mut settings = super::load_game_settings(&paths, &inputs.app_name)?;
    if inputs.offline {
        settings.offline_mode = true;
    }

    let meta = GameMeta {
        title: inputs.title.unwrap_or_else(|| inputs.app_name.clone()),
        app_name: inputs.app_name,
        can_run_offline: inputs.can_run_offline,
        store: inputs.store,
    };
    let log_path = paths.game_log_path(&meta.app_name);

    let launcher = Launcher::new(config, paths);
    let result = launcher
        .launch(LaunchRequest {
            meta,
            settings,
            extra_args: inputs.extra_args,
        })
        .await?;

    println!("Game process ended; output captured in {}", log_path.display());
    if !result.stderr.is_empty() {
        println!("The run reported errors, see the log for details");
    }
    Ok(())
}
