// src/session/env.rs

//! Environment dump parsing and the bookkeeping used by `source_script`.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

/// A plain variable → value mapping (an overlay, or a queried environment).
pub type EnvMap = BTreeMap<String, String>;

/// Per-call overrides. `None` unsets the variable for that call, which is
/// not the same as setting it to the empty string.
pub type EnvOverrides = BTreeMap<String, Option<String>>;

/// Parse the output of `env -0`.
///
/// Entries are NUL separated and split at the first `=`. Entries without a
/// `=` are logged and skipped rather than failing the whole parse.
pub fn parse_env_dump(dump: &str) -> EnvMap {
    let mut env = EnvMap::new();
    for entry in dump.split('\0') {
        if entry.is_empty() {
            continue;
        }
        match entry.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                env.insert(key.to_string(), value.to_string());
            }
            _ => warn!(entry = %entry, "skipping malformed environment entry"),
        }
    }
    env
}

/// Whether `name` can be exported by a POSIX shell: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Drop entries a shell could not export again, such as the
/// `BASH_FUNC_name%%` entries bash uses for exported functions.
pub fn retain_exportable(env: &mut EnvMap) {
    env.retain(|key, _| {
        let keep = is_valid_name(key);
        if !keep {
            debug!(key = %key, "ignoring variable that cannot be exported");
        }
        keep
    });
}

/// Keys a shell injects on its own when it is used to `.` a script.
pub fn shell_noise_keys(shell: &str) -> &'static [&'static str] {
    let name = Path::new(shell)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(shell);
    match name {
        "zsh" => &["_", "OLDPWD"],
        "bash" => &["_", "SHLVL"],
        _ => &[],
    }
}

/// Drop the keys `shell` injects by itself.
pub fn strip_shell_noise(env: &mut EnvMap, shell: &str) {
    for key in shell_noise_keys(shell) {
        env.remove(*key);
    }
}

/// Keep only the entries of `env` that are new or whose value differs from
/// `baseline`.
///
/// Variables present in `baseline` but missing from `env` are not reported:
/// an unset cannot be expressed in the returned mapping.
pub fn changed_since(env: EnvMap, baseline: &EnvMap) -> EnvMap {
    env.into_iter()
        .filter(|(key, value)| baseline.get(key) != Some(value))
        .collect()
}

/// Return everything after the last occurrence of `marker`, minus the line
/// break `echo` put after it. `None` when the marker never appears.
pub fn after_marker<'a>(output: &'a str, marker: &str) -> Option<&'a str> {
    let idx = output.rfind(marker)?;
    let rest = &output[idx + marker.len()..];
    Some(rest.strip_prefix('\n').unwrap_or(rest))
}
