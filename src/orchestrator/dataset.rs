// src/orchestrator/dataset.rs

//! The `dataset` variant: the job runs inside a clone of a local git
//! repository and its outputs come back as commits.
//!
//! Jobs on the same dataset share one clone at `<root>/<dataset id>`, where
//! the id is the repository's root commit. Only shell resources are
//! supported, since the clone is made straight from the local path.

use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::{debug, info};

use super::spec::JobSpec;
use super::variant::{
    check_relative, local_directory_from_spec, remote_join, which, JobContext, RemotePreparer,
    ResultFetcher, Variant,
};
use crate::errors::{JobhopError, Result};
use crate::resource::Resource;
use crate::session::{quote, BoxFuture, Session};

pub fn build(resource: &Resource, spec: &JobSpec) -> Result<Variant> {
    if which("git").is_none() {
        return Err(JobhopError::MissingExternalDependency {
            name: "git".to_string(),
            reason: "the dataset orchestrator clones and merges git repositories".to_string(),
        });
    }
    if resource.kind != "shell" {
        return Err(JobhopError::orchestrator(format!(
            "the dataset orchestrator does not support resource '{}' of type '{}'",
            resource.name, resource.kind
        )));
    }

    let dataset = match spec.extra.get("dataset_path") {
        None => local_directory_from_spec(spec)?,
        Some(Value::String(path)) => std::env::current_dir()?.join(path),
        Some(other) => {
            return Err(JobhopError::ConfigError(format!(
                "dataset_path must be a path, got {other:?}"
            )));
        }
    };

    Ok(Variant::new(
        "dataset",
        Box::new(DatasetPreparer::new(dataset.clone())),
        Box::new(DatasetFetcher::new(dataset.clone())),
        dataset,
    ))
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| JobhopError::orchestrator(format!("dataset path {:?} is not valid UTF-8", path)))
}

/// Root commit of the repository at `dataset`, used as its stable id.
async fn dataset_id(local: &Session, dataset: &Path) -> Result<String> {
    let result = local
        .execute_command("git rev-list --max-parents=0 HEAD", None, Some(path_str(dataset)?))
        .await;
    let stdout = match result {
        Ok((stdout, _)) => stdout,
        Err(JobhopError::Command(e)) => {
            return Err(JobhopError::orchestrator(format!(
                "{} is not a git repository with at least one commit: {}",
                dataset.display(),
                e.stderr.trim()
            )));
        }
        Err(e) => return Err(e),
    };
    // Repositories with merged histories have several roots.
    let mut roots: Vec<&str> = stdout.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    roots.sort_unstable();
    roots
        .first()
        .map(|id| id.to_string())
        .ok_or_else(|| JobhopError::orchestrator(format!("{} has no root commit", dataset.display())))
}

#[derive(Debug)]
pub struct DatasetPreparer {
    dataset: PathBuf,
    local: Session,
}

impl DatasetPreparer {
    pub fn new(dataset: PathBuf) -> Self {
        Self {
            dataset,
            local: Session::local(),
        }
    }
}

impl RemotePreparer for DatasetPreparer {
    fn working_directory<'a>(
        &'a self,
        root: &'a str,
        _jobid: &'a str,
        _spec: &'a JobSpec,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let id = dataset_id(&self.local, &self.dataset).await?;
            Ok(remote_join(root, &id))
        })
    }

    /// Records the resolved dataset path, so a job revived from another
    /// directory still binds the same repository.
    fn template_params(&self) -> std::collections::BTreeMap<String, Value> {
        [
            ("commit_outputs".to_string(), Value::Bool(true)),
            (
                "dataset_path".to_string(),
                Value::String(self.dataset.to_string_lossy().into_owned()),
            ),
        ]
        .into()
    }

    fn prepare<'a>(&'a self, ctx: JobContext<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let dataset = quote(path_str(&self.dataset)?);
            let wd = ctx.working_directory;
            ctx.session.mkdir(ctx.root_directory).await?;

            if ctx.session.isdir(&remote_join(wd, ".git")).await? {
                debug!(jobid = ctx.jobid, working_directory = wd, "updating existing dataset clone");
                ctx.session
                    .execute_command(
                        &format!("git fetch -q {dataset} HEAD && git merge -q --ff-only FETCH_HEAD"),
                        None,
                        Some(wd),
                    )
                    .await?;
            } else {
                info!(jobid = ctx.jobid, working_directory = wd, "cloning dataset");
                ctx.session
                    .execute_command(&format!("git clone -q {dataset} {}", quote(wd)), None, None)
                    .await?;
            }

            for input in &ctx.spec.inputs {
                check_relative("input", input)?;
                if !ctx.session.exists(&remote_join(wd, input)).await? {
                    return Err(JobhopError::orchestrator(format!(
                        "input {input:?} is not committed in dataset {}",
                        self.dataset.display()
                    )));
                }
            }
            Ok(())
        })
    }
}

#[derive(Debug)]
pub struct DatasetFetcher {
    dataset: PathBuf,
    local: Session,
}

impl DatasetFetcher {
    pub fn new(dataset: PathBuf) -> Self {
        Self {
            dataset,
            local: Session::local(),
        }
    }
}

impl ResultFetcher for DatasetFetcher {
    fn fetch<'a>(&'a self, ctx: JobContext<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let command = format!(
                "git fetch -q {} HEAD && git merge -q --ff-only FETCH_HEAD",
                quote(ctx.working_directory)
            );
            self.local
                .execute_command(&command, None, Some(path_str(&self.dataset)?))
                .await?;
            info!(jobid = ctx.jobid, dataset = %self.dataset.display(), "merged job results into dataset");
            Ok(())
        })
    }
}
