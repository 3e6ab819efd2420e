// src/orchestrator/record.rs

//! The persisted form of a submitted job.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use super::spec::JobSpec;
use crate::errors::Result;

/// Keys that are recomputed when a job is resurrected and so are not fed
/// back into its spec.
const DERIVED_KEYS: &[&str] = &["jobid", "meta_directory", "commit_outputs"];

/// Everything needed to reconstruct an orchestrator for a job in a later
/// process: identity of the resource, the local directory, the variant and
/// submitter names, the submission id and the full template parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub resource_id: String,
    pub resource_name: String,
    pub local_directory: String,
    pub orchestrator: String,
    pub submitter: String,
    #[serde(default)]
    pub submission_id: Option<String>,
    /// Template parameters, including `jobid`, `root_directory` and
    /// `working_directory`.
    #[serde(flatten)]
    pub params: BTreeMap<String, Value>,
}

impl JobRecord {
    pub fn jobid(&self) -> Option<&str> {
        self.params.get("jobid").and_then(Value::as_str)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// The job spec this record was created from, with the names and
    /// directories the original run resolved.
    pub fn job_spec(&self) -> Result<JobSpec> {
        let params: serde_yaml::Mapping = self
            .params
            .iter()
            .filter(|(k, _)| !DERIVED_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (Value::String(k.clone()), v.clone()))
            .collect();
        let mut spec: JobSpec = serde_yaml::from_value(Value::Mapping(params))?;
        spec.local_directory = Some(self.local_directory.clone());
        spec.orchestrator = Some(self.orchestrator.clone());
        spec.submitter = Some(self.submitter.clone());
        Ok(spec)
    }
}
