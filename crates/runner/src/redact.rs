use std::collections::HashMap;
use std::path::Path;

/// Flags whose following argument carries a credential or session token.
const SENSITIVE_FLAGS: [&str; 2] = ["--sid", "--token"];

pub const REDACTION_MARKER: &str = "<redacted>";

/// Quotes a token for display when it contains whitespace or shell
/// metacharacters. Display only; execution never sees this form.
pub fn quote_if_needed(token: &str) -> String {
    let plain = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_alphanumeric() || "_-+=:,./@%".contains(c));
    if plain {
        return token.to_string();
    }
    let escaped = token.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Renders a loggable command line: credential-bearing arguments are masked
/// and only environment entries that are new or differ from the inherited
/// environment are shown. Layout: env assignments, wrappers, runner path,
/// command tokens.
pub fn redacted_command(
    parts: &[String],
    env: &HashMap<String, String>,
    wrappers: &[String],
    runner_path: &Path,
    inherited: &HashMap<String, String>,
) -> String {
    let mut masked: Vec<String> = parts
        .iter()
        .filter(|part| !part.is_empty())
        .cloned()
        .collect();
    for index in 0..masked.len() {
        if SENSITIVE_FLAGS.contains(&masked[index].as_str()) && index + 1 < masked.len() {
            masked[index + 1] = REDACTION_MARKER.to_string();
        }
    }

    let mut rendered = Vec::new();
    let mut keys: Vec<&String> = env.keys().collect();
    keys.sort();
    for key in keys {
        let value = &env[key];
        if inherited.get(key) == Some(value) {
            continue;
        }
        rendered.push(format!("{key}={}", quote_if_needed(value)));
    }
    rendered.extend(
        wrappers
            .iter()
            .filter(|token| !token.is_empty())
            .map(|token| quote_if_needed(token)),
    );
    rendered.push(quote_if_needed(&runner_path.to_string_lossy()));
    rendered.extend(masked.iter().map(|part| quote_if_needed(part)));
    rendered.join(" ")
}
