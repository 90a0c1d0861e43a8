use vintner_core::error::LaunchError;
use vintner_core::paths::LauncherPaths;
use vintner_core::settings::{GameMeta, GameSettings, WineRuntime};

use crate::traits::Connectivity;

/// Effective offline state for this attempt: the user toggle, the network
/// monitor, and a storefront outage all force offline mode.
pub(crate) async fn effective_offline(
    settings: &GameSettings,
    meta: &GameMeta,
    connectivity: &dyn Connectivity,
) -> bool {
    settings.offline_mode
        || !connectivity.is_online()
        || connectivity.is_store_service_offline(meta.store).await
}

/// A game without a selected wine build cannot launch. Happens when no wine
/// versions are installed at all.
pub(crate) fn check_wine_binary(settings: &GameSettings) -> Result<(), LaunchError> {
    if settings.runtime.bin().as_os_str().is_empty() {
        return Err(LaunchError::WineNotConfigured);
    }
    Ok(())
}

/// CrossOver bottles are configured by name; the launch must fail fast when
/// the named bottle is gone from disk.
pub(crate) fn check_crossover_bottle(
    settings: &GameSettings,
    paths: &LauncherPaths,
) -> Result<(), LaunchError> {
    if let WineRuntime::Crossover(build) = &settings.runtime {
        let marker = paths
            .crossover_bottles
            .join(&build.bottle)
            .join("cxbottle.conf");
        if !marker.exists() {
            return Err(LaunchError::MissingBottle(build.bottle.clone()));
        }
    }
    Ok(())
}
