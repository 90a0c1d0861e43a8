use std::path::PathBuf;

use anyhow::Result;

use launcher::Launcher;
use vintner_core::settings::GameMeta;

pub async fn execute(config_path: Option<PathBuf>, app_name: String) -> Result<()> {
    let (paths, config) = super::load_environment(config_path)?;
    let settings = super::load_game_settings(&paths, &app_name)?;
    let meta = GameMeta {
        title: app_name.clone(),
        app_name,
        can_run_offline: true,
        store: Default::default(),
    };

    let launcher = Launcher::new(config, paths);
    let status = launcher.verify_prefix(&meta, &settings).await?;

    if status.updated {
        println!("Prefix created or updated at {}", settings.wine_prefix.display());
    } else {
        println!("Prefix already in place at {}", settings.wine_prefix.display());
    }
    Ok(())
}
