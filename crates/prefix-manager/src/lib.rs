use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{error, info};

use runner::wine::{run_wine_command, WineCommandOptions};
use vintner_core::paths::LauncherPaths;
use vintner_core::settings::{GameSettings, WineRuntime};

/// Outcome of a prefix verification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixStatus {
    /// The prefix exists and is bootstrapped after this call.
    pub initialized: bool,
    /// This call created or rewrote the prefix.
    pub updated: bool,
}

/// Makes sure the configured wine prefix exists and has been booted.
/// Idempotent: a second pass over a healthy wine prefix reports
/// `updated: false`. Never deletes anything; prefix removal belongs to the
/// uninstall path.
pub async fn ensure_prefix(
    settings: &GameSettings,
    app_name: &str,
    paths: &LauncherPaths,
) -> Result<PrefixStatus> {
    // CrossOver creates and maintains its bottles on its own.
    if matches!(settings.runtime, WineRuntime::Crossover(_)) {
        return Ok(PrefixStatus {
            initialized: true,
            updated: false,
        });
    }

    let prefix = &settings.wine_prefix;
    if !prefix.exists() {
        fs::create_dir_all(prefix)
            .with_context(|| format!("create wine prefix {}", prefix.display()))?;
    }

    // Proton drives its own boot sequence once a pfx tree exists.
    if settings.runtime.is_proton() && prefix.join("pfx").exists() {
        return Ok(PrefixStatus {
            initialized: true,
            updated: false,
        });
    }

    // Without the registry, follow-up tool installs fail intermittently, so
    // the boot must be waited on whenever the marker is missing.
    let must_wait = !registry_marker(settings).exists();

    let boot = run_wine_command(
        settings,
        app_name,
        paths,
        vec!["wineboot".to_string(), "--init".to_string()],
        WineCommandOptions {
            wait: must_wait,
            force_prefix_verb: false,
        },
    )
    .await;

    let result = match boot {
        Ok(result) => result,
        Err(source) => {
            error!(
                target: "launcher",
                prefix = %prefix.display(),
                "unable to create wine prefix: {source}"
            );
            return Err(source).context("run wineboot --init");
        }
    };

    // Proton rewrites the compat data on this path every time.
    let updated = settings.runtime.is_proton() || stderr_reports_update(&result.stderr);
    if updated {
        info!(
            target: "launcher",
            app = app_name,
            "created or updated wine prefix at {}",
            prefix.display()
        );
    }

    Ok(PrefixStatus {
        initialized: true,
        updated,
    })
}

/// Registry file whose presence marks a bootstrapped prefix.
pub fn registry_marker(settings: &GameSettings) -> PathBuf {
    if settings.runtime.is_proton() {
        settings.wine_prefix.join("pfx").join("system.reg")
    } else {
        settings.wine_prefix.join("system.reg")
    }
}

/// Wine reports a prefix rewrite with this phrase on stderr. The check is
/// coupled to wine's diagnostic text; if the message changes upstream this
/// predicate is the only place to touch.
pub fn stderr_reports_update(stderr: &str) -> bool {
    stderr.contains("has been updated")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use vintner_core::settings::{CrossoverBuild, ProtonBuild, WineBuild};

    /// Fake wine binary emitting the given stderr line.
    fn fake_wine(dir: &Path, stderr_line: &str) -> PathBuf {
        let bin = dir.join("wine");
        let mut file = std::fs::File::create(&bin).unwrap();
        writeln!(file, "#!/bin/sh\necho \"{stderr_line}\" >&2").unwrap();
        drop(file);
        let mut perms = std::fs::metadata(&bin).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&bin, perms).unwrap();
        bin
    }

    fn wine_settings(bin: PathBuf, prefix: PathBuf) -> GameSettings {
        GameSettings {
            runtime: WineRuntime::Wine(WineBuild {
                name: "test wine".to_string(),
                bin,
                wineserver: None,
                lib32: None,
                lib: None,
            }),
            wine_prefix: prefix,
            ..GameSettings::default()
        }
    }

    #[tokio::test]
    async fn test_crossover_bottles_are_externally_managed() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("never-created");
        let settings = GameSettings {
            runtime: WineRuntime::Crossover(CrossoverBuild {
                name: "CrossOver 22".to_string(),
                bin: PathBuf::from("/opt/cx/bin/wine"),
                bottle: "MyBottle".to_string(),
            }),
            wine_prefix: prefix.clone(),
            ..GameSettings::default()
        };
        let paths = LauncherPaths::under_root(dir.path());
        let status = ensure_prefix(&settings, "Odyssey", &paths).await.unwrap();
        assert!(!status.updated);
        assert!(!prefix.exists());
    }

    #[tokio::test]
    async fn test_fresh_wine_prefix_boots_and_reports_update() {
        let dir = tempfile::tempdir().unwrap();
        let bin = fake_wine(dir.path(), "wine: prefix has been updated");
        let prefix = dir.path().join("prefix");
        let settings = wine_settings(bin, prefix.clone());
        let paths = LauncherPaths::under_root(dir.path());

        let status = ensure_prefix(&settings, "Odyssey", &paths).await.unwrap();
        assert!(status.initialized);
        assert!(status.updated);
        assert!(prefix.is_dir());
    }

    #[tokio::test]
    async fn test_settled_wine_prefix_reports_no_update() {
        let dir = tempfile::tempdir().unwrap();
        let bin = fake_wine(dir.path(), "wine: nothing to do");
        let prefix = dir.path().join("prefix");
        std::fs::create_dir_all(&prefix).unwrap();
        std::fs::write(prefix.join("system.reg"), "WINE REGISTRY").unwrap();
        let settings = wine_settings(bin, prefix);
        let paths = LauncherPaths::under_root(dir.path());

        let status = ensure_prefix(&settings, "Odyssey", &paths).await.unwrap();
        assert!(status.initialized);
        assert!(!status.updated);
    }

    #[tokio::test]
    async fn test_missing_proton_prefix_is_created_and_booted() {
        let dir = tempfile::tempdir().unwrap();
        let bin = fake_wine(dir.path(), "");
        let prefix = dir.path().join("compatdata");
        let settings = GameSettings {
            runtime: WineRuntime::Proton(ProtonBuild {
                name: "test proton".to_string(),
                bin,
            }),
            wine_prefix: prefix.clone(),
            ..GameSettings::default()
        };
        let paths = LauncherPaths::under_root(dir.path());

        let status = ensure_prefix(&settings, "Odyssey", &paths).await.unwrap();
        assert!(status.initialized);
        assert!(status.updated);
        assert!(prefix.is_dir());
    }

    #[tokio::test]
    async fn test_existing_proton_pfx_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        // No fake binary on purpose: the boot must not run at all.
        let prefix = dir.path().join("compatdata");
        std::fs::create_dir_all(prefix.join("pfx")).unwrap();
        let settings = GameSettings {
            runtime: WineRuntime::Proton(ProtonBuild {
                name: "test proton".to_string(),
                bin: PathBuf::from("/nonexistent/proton"),
            }),
            wine_prefix: prefix,
            ..GameSettings::default()
        };
        let paths = LauncherPaths::under_root(dir.path());

        let status = ensure_prefix(&settings, "Odyssey", &paths).await.unwrap();
        assert!(status.initialized);
        assert!(!status.updated);
    }

    #[tokio::test]
    async fn test_boot_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let settings = wine_settings(
            PathBuf::from("/nonexistent/wine"),
            dir.path().join("prefix"),
        );
        let paths = LauncherPaths::under_root(dir.path());
        assert!(ensure_prefix(&settings, "Odyssey", &paths).await.is_err());
    }

    #[test]
    fn test_registry_marker_per_runtime() {
        let wine = wine_settings(PathBuf::from("/usr/bin/wine"), PathBuf::from("/p"));
        assert_eq!(registry_marker(&wine), PathBuf::from("/p/system.reg"));

        let proton = GameSettings {
            runtime: WineRuntime::Proton(ProtonBuild {
                name: "p".to_string(),
                bin: PathBuf::from("/proton"),
            }),
            wine_prefix: PathBuf::from("/p"),
            ..GameSettings::default()
        };
        assert_eq!(registry_marker(&proton), PathBuf::from("/p/pfx/system.reg"));
    }

    #[test]
    fn test_update_heuristic_matches_wine_diagnostic() {
        assert!(stderr_reports_update(
            "wine: '/home/u/.wine' has been updated."
        ));
        assert!(!stderr_reports_update("wine: created the configuration"));
    }
}
