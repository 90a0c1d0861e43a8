use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vintner_core::settings::Store;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "vintner",
    version,
    about = "Launch preparation and process supervision for wine and proton games"
)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default launcher config
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Launch a game through its store runner
    Launch {
        app_name: String,
        #[arg(long, default_value_t = Store::Epic)]
        store: Store,
        /// Game title shown in logs and rich presence
        #[arg(long)]
        title: Option<String>,
        /// The game supports running without a connection
        #[arg(long)]
        can_run_offline: bool,
        /// Force offline mode for this launch
        #[arg(long)]
        offline: bool,
        /// Extra arguments forwarded to the store runner
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },
    /// Ensure the game's wine prefix exists and is bootstrapped
    VerifyPrefix {
        app_name: String,
    },
    /// Run an ad-hoc command through the game's wine environment
    Wine {
        app_name: String,
        #[arg(long)]
        wait: bool,
        #[arg(trailing_var_arg = true, required = true)]
        args: Vec<String>,
    },
    /// Print the effective launcher config
    Config {
        #[arg(long)]
        print: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => init_config(cli.config, force),
        Commands::Launch {
            app_name,
            store,
            title,
            can_run_offline,
            offline,
            args,
        } => {
            commands::launch::execute(commands::launch::LaunchInputs {
                config_path: cli.config,
                app_name,
                store,
                title,
                can_run_offline,
                offline,
                extra_args: args,
            })
            .await
        }
        Commands::VerifyPrefix { app_name } => {
            commands::prefix::execute(cli.config, app_name).await
        }
        Commands::Wine {
            app_name,
            wait,
            args,
        } => commands::wine::execute(cli.config, app_name, args, wait).await,
        Commands::Config { print } => {
            if print {
                commands::config::print_effective(cli.config)
            } else {
                Ok(())
            }
        }
    }
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let paths = vintner_core::paths::LauncherPaths::resolve()?;
    let config_path = path.unwrap_or(paths.config_path);
    if config_path.exists() && !force {
        return Err(anyhow::anyhow!(
            "config already exists at {}, pass --force to overwrite",
            config_path.display()
        ));
    }
    let config = vintner_core::config::Config::default_config();
    config.save(&config_path)?;
    println!("Default config written to {}", config_path.display());
    Ok(())
}
