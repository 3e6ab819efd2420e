// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{JobhopError, Result};
use crate::resource::LOCAL_RESOURCE;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::JobhopError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.resource))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_resources(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.follow_interval_secs == 0 {
        return Err(JobhopError::ConfigError(
            "[config].follow_interval_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

// Unknown `type` values are rejected later, when the catalog is asked for a
// transport of that type.
fn validate_resources(cfg: &RawConfigFile) -> Result<()> {
    for (name, res) in cfg.resource.iter() {
        if name.is_empty() || name.contains('/') {
            return Err(JobhopError::ConfigError(format!(
                "invalid resource name '{name}'"
            )));
        }
        match res.kind.as_str() {
            "ssh" if res.host.as_deref().unwrap_or("").is_empty() => {
                return Err(JobhopError::ConfigError(format!(
                    "resource '{name}' has type \"ssh\" but no `host`"
                )));
            }
            "shell" if res.host.is_some() => {
                return Err(JobhopError::ConfigError(format!(
                    "resource '{name}' has type \"shell\" and cannot set `host`"
                )));
            }
            _ => {}
        }
        if name == LOCAL_RESOURCE && res.kind != "shell" {
            return Err(JobhopError::ConfigError(format!(
                "resource '{LOCAL_RESOURCE}' must have type \"shell\" (got \"{}\")",
                res.kind
            )));
        }
    }
    Ok(())
}
