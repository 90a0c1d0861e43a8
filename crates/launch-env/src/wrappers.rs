use tracing::warn;

use vintner_core::settings::GameSettings;

/// Helper tool commands resolved ahead of wrapper assembly. A value may be
/// multi-token: a binary plus fixed arguments joined by spaces.
#[derive(Debug, Clone, Default)]
pub struct ResolvedTools {
    pub mangohud: Option<String>,
    pub gamemode: Option<String>,
    pub steam_runtime: Option<String>,
}

/// Assembles the ordered wrapper chain that prefixes the game invocation:
/// user wrappers first, then the performance overlay, the game-mode daemon,
/// and the containment runtime. Resolution of the tool paths happens
/// elsewhere; this only assembles.
pub fn build_wrapper_chain(settings: &GameSettings, tools: &ResolvedTools) -> Vec<String> {
    let mut chain = Vec::new();

    for entry in &settings.wrapper_entries {
        chain.push(entry.exe.clone());
        match shlex::split(&entry.args) {
            Some(args) => chain.extend(args),
            None => warn!(
                target: "launcher",
                wrapper = %entry.exe,
                "wrapper arguments are not valid shell syntax, ignoring them"
            ),
        }
    }
    if settings.show_mangohud {
        if let Some(command) = &tools.mangohud {
            // The resolved overlay command carries its own arguments.
            chain.extend(command.split_whitespace().map(str::to_string));
        }
    }
    if settings.use_game_mode {
        if let Some(bin) = &tools.gamemode {
            chain.push(bin.clone());
        }
    }
    if settings.use_steam_runtime {
        if let Some(command) = &tools.steam_runtime {
            chain.extend(command.split_whitespace().map(str::to_string));
        }
    }

    chain.retain(|token| !token.is_empty());
    chain
}
