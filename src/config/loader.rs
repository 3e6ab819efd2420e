// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Environment variable pointing at a config file.
pub const CONFIG_ENV: &str = "JOBHOP_CONFIG";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run basic validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Load `explicit` if given, else `$JOBHOP_CONFIG` if set (either must
/// exist); otherwise load the default config file if there is one, or fall
/// back to an empty configuration.
pub fn load_or_default(explicit: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        return load_and_validate(path);
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return load_and_validate(PathBuf::from(path));
    }
    match default_config_path() {
        Some(path) if path.is_file() => {
            debug!(path = ?path, "loading config");
            load_and_validate(path)
        }
        _ => {
            debug!("no config file; using defaults");
            ConfigFile::try_from(RawConfigFile::default())
        }
    }
}

/// `<config dir>/jobhop/jobhop.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("jobhop").join("jobhop.toml"))
}
