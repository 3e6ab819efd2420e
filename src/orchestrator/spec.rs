// src/orchestrator/spec.rs

//! Job specifications: the user-supplied description of one job.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::errors::{JobhopError, Result};

/// Orchestrator used when a spec names none.
pub const DEFAULT_ORCHESTRATOR: &str = "plain";
/// Submitter used when a spec names none.
pub const DEFAULT_SUBMITTER: &str = "local";

/// Everything a job needs to be prepared, submitted and fetched.
///
/// Keys jobhop doesn't interpret itself (e.g. `walltime`, `memory`,
/// `dataset_path`) are kept in `extra` and passed to templates unchanged.
///
/// ```yaml
/// command_str: ./simulate --steps 100
/// inputs: [params.json]
/// outputs: [result.csv]
/// walltime: "01:00:00"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_directory: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_directory: Option<String>,

    /// Paths relative to the local directory, uploaded before submission.
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Paths relative to the working directory, downloaded on fetch.
    #[serde(default)]
    pub outputs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_str: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orchestrator: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitter: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl JobSpec {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read a YAML job spec file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading job spec {:?}", path))?;
        Self::from_yaml_str(&text)
    }

    /// Layer `other` over `self`: every field `other` sets wins.
    pub fn merge(&mut self, other: JobSpec) {
        fn over<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }
        over(&mut self.root_directory, other.root_directory);
        over(&mut self.working_directory, other.working_directory);
        over(&mut self.local_directory, other.local_directory);
        over(&mut self.command_str, other.command_str);
        over(&mut self.message, other.message);
        over(&mut self.orchestrator, other.orchestrator);
        over(&mut self.submitter, other.submitter);
        if !other.inputs.is_empty() {
            self.inputs = other.inputs;
        }
        if !other.outputs.is_empty() {
            self.outputs = other.outputs;
        }
        self.extra.extend(other.extra);
    }

    /// Set one key from a `KEY=VALUE` style override.
    ///
    /// Free-form keys get the value parsed as a YAML scalar, so `4` becomes
    /// a number and `true` a boolean. `inputs`/`outputs` accept a YAML list
    /// or a single path.
    pub fn set_param(&mut self, key: &str, raw: &str) -> Result<()> {
        let text = |slot: &mut Option<String>| *slot = Some(raw.to_string());
        match key {
            "root_directory" => text(&mut self.root_directory),
            "working_directory" => text(&mut self.working_directory),
            "local_directory" => text(&mut self.local_directory),
            "command_str" => text(&mut self.command_str),
            "message" => text(&mut self.message),
            "orchestrator" => text(&mut self.orchestrator),
            "submitter" => text(&mut self.submitter),
            "inputs" => self.inputs = path_list(raw)?,
            "outputs" => self.outputs = path_list(raw)?,
            "" => {
                return Err(JobhopError::ConfigError(
                    "job parameter with an empty key".to_string(),
                ));
            }
            _ => {
                let value = serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
                self.extra.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    /// Apply a `KEY=VALUE` string.
    pub fn set_assignment(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| {
            JobhopError::ConfigError(format!("expected KEY=VALUE, got {assignment:?}"))
        })?;
        self.set_param(key.trim(), value)
    }

    pub fn orchestrator_name(&self) -> &str {
        self.orchestrator.as_deref().unwrap_or(DEFAULT_ORCHESTRATOR)
    }

    pub fn submitter_name(&self) -> &str {
        self.submitter.as_deref().unwrap_or(DEFAULT_SUBMITTER)
    }

    /// The spec as a flat key → value map, as templates and records see it.
    pub fn to_params(&self) -> Result<BTreeMap<String, Value>> {
        match serde_yaml::to_value(self)? {
            Value::Mapping(map) => Ok(map
                .into_iter()
                .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), v)))
                .collect()),
            _ => Ok(BTreeMap::new()),
        }
    }
}

fn path_list(raw: &str) -> Result<Vec<String>> {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(Value::Sequence(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(JobhopError::ConfigError(format!(
                    "expected a path, got {other:?}"
                ))),
            })
            .collect(),
        _ if raw.trim().is_empty() => Ok(Vec::new()),
        _ => Ok(vec![raw.to_string()]),
    }
}
