use std::path::PathBuf;

use anyhow::Result;

use launcher::Launcher;
use vintner_core::settings::GameMeta;

pub async fn execute(
    config_path: Option<PathBuf>,
    app_name: String,
    args: Vec<String>,
    wait: bool,
) -> Result<()> {
    let (paths, config) = super::load_environment(config_path)?;
    let settings = super::load_game_settings(&paths, &app_name)?;
    let meta = GameMeta {
        title: app_name.clone(),
        app_name,
        can_run_offline: true,
        store: Default::default(),
    };

    let launcher = Launcher::new(config, paths);
    let result = launcher.run_wine_command(&meta, &settings, args, wait).await?;

    if !result.stdout.is_empty() {
        println!("{}", result.stdout);
    }
    if !result.stderr.is_empty() {
        eprintln!("{}", result.stderr);
    }
    Ok(())
}
