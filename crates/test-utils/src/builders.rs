#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;

use jobhop::config::{ConfigFile, ConfigSection, RawConfigFile, ResourceConfig};
use jobhop::orchestrator::JobSpec;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                resource: BTreeMap::new(),
            },
        }
    }

    pub fn with_resource(mut self, name: &str, resource: ResourceConfig) -> Self {
        self.config.resource.insert(name.to_string(), resource);
        self
    }

    pub fn with_registry_dir(mut self, dir: &Path) -> Self {
        self.config.config.registry_dir = Some(dir.to_path_buf());
        self
    }

    pub fn with_follow_interval_secs(mut self, secs: u64) -> Self {
        self.config.config.follow_interval_secs = secs;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ResourceConfig`.
pub struct ResourceConfigBuilder {
    resource: ResourceConfig,
}

impl ResourceConfigBuilder {
    pub fn shell() -> Self {
        Self::of_type("shell")
    }

    pub fn ssh(host: &str) -> Self {
        Self::of_type("ssh").host(host)
    }

    pub fn of_type(kind: &str) -> Self {
        Self {
            resource: ResourceConfig {
                kind: kind.to_string(),
                ..ResourceConfig::default()
            },
        }
    }

    pub fn host(mut self, host: &str) -> Self {
        self.resource.host = Some(host.to_string());
        self
    }

    pub fn user(mut self, user: &str) -> Self {
        self.resource.user = Some(user.to_string());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.resource.port = Some(port);
        self
    }

    pub fn id(mut self, id: &str) -> Self {
        self.resource.id = Some(id.to_string());
        self
    }

    pub fn build(self) -> ResourceConfig {
        self.resource
    }
}

/// Builder for `JobSpec`.
pub struct JobSpecBuilder {
    spec: JobSpec,
}

impl JobSpecBuilder {
    pub fn new(command: &str) -> Self {
        Self {
            spec: JobSpec {
                command_str: Some(command.to_string()),
                ..JobSpec::default()
            },
        }
    }

    pub fn root_directory(mut self, dir: impl AsRef<Path>) -> Self {
        self.spec.root_directory = Some(dir.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn working_directory(mut self, dir: &str) -> Self {
        self.spec.working_directory = Some(dir.to_string());
        self
    }

    pub fn local_directory(mut self, dir: impl AsRef<Path>) -> Self {
        self.spec.local_directory = Some(dir.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn input(mut self, path: &str) -> Self {
        self.spec.inputs.push(path.to_string());
        self
    }

    pub fn output(mut self, path: &str) -> Self {
        self.spec.outputs.push(path.to_string());
        self
    }

    pub fn message(mut self, message: &str) -> Self {
        self.spec.message = Some(message.to_string());
        self
    }

    pub fn orchestrator(mut self, name: &str) -> Self {
        self.spec.orchestrator = Some(name.to_string());
        self
    }

    pub fn submitter(mut self, name: &str) -> Self {
        self.spec.submitter = Some(name.to_string());
        self
    }

    pub fn param(mut self, key: &str, value: serde_yaml::Value) -> Self {
        self.spec.extra.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> JobSpec {
        self.spec
    }
}
