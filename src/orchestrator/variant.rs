// src/orchestrator/variant.rs

//! The two seams an orchestrator variant fills in: how the remote side is
//! prepared before submission, and how results come back afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use serde_yaml::Value;

use super::spec::JobSpec;
use crate::errors::{JobhopError, Result};
use crate::resource::Resource;
use crate::session::{BoxFuture, Session};

/// Everything a variant may look at while acting on one job.
#[derive(Debug, Clone, Copy)]
pub struct JobContext<'a> {
    pub session: &'a Session,
    pub resource: &'a Resource,
    pub spec: &'a JobSpec,
    pub jobid: &'a str,
    pub root_directory: &'a str,
    pub working_directory: &'a str,
    pub meta_directory: &'a str,
    pub local_directory: &'a Path,
}

/// Remote preparation strategy.
pub trait RemotePreparer: Send + Sync + fmt::Debug {
    /// Working directory for a job under `root`.
    fn working_directory<'a>(
        &'a self,
        root: &'a str,
        jobid: &'a str,
        spec: &'a JobSpec,
    ) -> BoxFuture<'a, Result<String>>;

    /// Extra template parameters this strategy contributes.
    fn template_params(&self) -> BTreeMap<String, Value> {
        BTreeMap::new()
    }

    /// Make the working directory ready for submission. Must be safe to
    /// call more than once for the same job.
    fn prepare<'a>(&'a self, ctx: JobContext<'a>) -> BoxFuture<'a, Result<()>>;
}

/// Result retrieval strategy.
pub trait ResultFetcher: Send + Sync + fmt::Debug {
    fn fetch<'a>(&'a self, ctx: JobContext<'a>) -> BoxFuture<'a, Result<()>>;
}

/// A named composition of one preparer and one fetcher, plus the local
/// directory the job's inputs come from and results go to.
#[derive(Debug)]
pub struct Variant {
    pub name: &'static str,
    pub preparer: Box<dyn RemotePreparer>,
    pub fetcher: Box<dyn ResultFetcher>,
    pub local_directory: PathBuf,
}

impl Variant {
    pub fn new(
        name: &'static str,
        preparer: Box<dyn RemotePreparer>,
        fetcher: Box<dyn ResultFetcher>,
        local_directory: PathBuf,
    ) -> Self {
        Self {
            name,
            preparer,
            fetcher,
            local_directory,
        }
    }
}

/// Join POSIX path segments, tolerating trailing slashes on `base`.
pub fn remote_join(base: &str, rel: &str) -> String {
    if base == "/" {
        format!("/{}", rel.trim_start_matches('/'))
    } else {
        format!("{}/{}", base.trim_end_matches('/'), rel.trim_start_matches('/'))
    }
}

/// Drop trailing slashes, keeping `/` itself.
pub fn trim_remote(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// True if `child` lies strictly below `parent`. Both must be absolute and
/// free of `.`/`..` segments for the answer to mean anything.
pub fn is_strictly_inside(parent: &str, child: &str) -> bool {
    let parent = trim_remote(parent);
    let child = trim_remote(child);
    if has_dot_segments(&child) {
        return false;
    }
    let prefix = if parent == "/" {
        "/".to_string()
    } else {
        format!("{parent}/")
    };
    child.len() > prefix.len() && child.starts_with(&prefix)
}

fn has_dot_segments(path: &str) -> bool {
    path.split('/').any(|seg| seg == "." || seg == "..")
}

/// Check that a job-relative path (an input or output) stays inside the
/// directory it is relative to.
pub fn check_relative(kind: &str, path: &str) -> Result<()> {
    let p = Path::new(path);
    let escapes = path.is_empty()
        || p.is_absolute()
        || p
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir));
    if escapes {
        return Err(JobhopError::orchestrator(format!(
            "{kind} {path:?} must be a relative path inside the job directory"
        )));
    }
    Ok(())
}

/// Local directory named by the job spec (made absolute against the current
/// directory), or the current directory itself.
pub fn local_directory_from_spec(spec: &JobSpec) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("determining the current directory")?;
    Ok(match &spec.local_directory {
        Some(dir) => cwd.join(dir),
        None => cwd,
    })
}

/// First `name` executable found on `PATH`.
pub fn which(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
