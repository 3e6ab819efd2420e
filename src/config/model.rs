// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{JobhopError, Result};
use crate::resource::{Resource, LOCAL_RESOURCE};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// follow_interval_secs = 10
///
/// [resource.cluster]
/// type = "ssh"
/// host = "login.example.org"
/// user = "me"
/// ```
///
/// All sections are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Resources keyed by name.
    #[serde(default)]
    pub resource: BTreeMap<String, ResourceConfig>,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub resource: BTreeMap<String, ResourceConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        resource: BTreeMap<String, ResourceConfig>,
    ) -> Self {
        Self { config, resource }
    }

    /// Look up a resource by name.
    ///
    /// `local` always exists as a shell resource unless the config defines a
    /// resource of that name itself.
    pub fn resource_named(&self, name: &str) -> Result<Resource> {
        match self.resource.get(name) {
            Some(cfg) => Ok(Resource::from_config(name, cfg)),
            None if name == LOCAL_RESOURCE => Ok(Resource::local()),
            None => Err(JobhopError::ResourceNotFound(name.to_string())),
        }
    }

    /// Look up the resource a job was registered against.
    ///
    /// Fails if the name is gone, or if it now refers to a different
    /// resource than the one with `id`.
    pub fn resource_for_job(&self, name: &str, id: &str) -> Result<Resource> {
        let resource = self.resource_named(name)?;
        if resource.id != id {
            return Err(JobhopError::ResourceNotFound(format!(
                "{name} (id {id}; the configured resource has id {})",
                resource.id
            )));
        }
        Ok(resource)
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Seconds between two status queries while following a job.
    #[serde(default = "default_follow_interval_secs")]
    pub follow_interval_secs: u64,

    /// Where job records live. Defaults to `<data dir>/jobhop/jobs`.
    #[serde(default)]
    pub registry_dir: Option<PathBuf>,
}

fn default_follow_interval_secs() -> u64 {
    10
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            follow_interval_secs: default_follow_interval_secs(),
            registry_dir: None,
        }
    }
}

/// `[resource.<name>]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Transport type: `"shell"` or `"ssh"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Stable identity. Defaults to a UUID derived from the resource name.
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub key_filename: Option<String>,
}
