use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a launch attempt. Precondition variants are raised
/// before any process is spawned and carry no partial side effects.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("launch aborted: the game requires an internet connection to run")]
    OfflineNotSupported,
    #[error("no wine version selected, check the game settings")]
    WineNotConfigured,
    #[error("the crossover bottle \"{0}\" does not exist")]
    MissingBottle(String),
    #[error("unable to create wine prefix at {}: {reason}", .prefix.display())]
    PrefixInit { prefix: PathBuf, reason: String },
}
