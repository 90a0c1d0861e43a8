pub mod config;
pub mod diagnostics;
pub mod error;
pub mod paths;
pub mod settings;

pub use config::Config;
pub use diagnostics::{DiagnosticsSink, ErrorReport, LogDiagnostics};
pub use error::LaunchError;
pub use paths::LauncherPaths;
pub use settings::{
    CrossoverBuild, EnvEntry, GameMeta, GameSettings, ProtonBuild, Store, WineBuild, WineRuntime,
    WrapperEntry,
};
