// src/orchestrator/plain.rs

//! The `plain` variant: upload inputs into a per-job directory, download
//! outputs and job metadata afterwards.

use std::path::Path;

use tracing::{info, warn};

use super::spec::JobSpec;
use super::variant::{
    check_relative, is_strictly_inside, local_directory_from_spec, remote_join, trim_remote,
    JobContext, RemotePreparer, ResultFetcher, Variant,
};
use crate::errors::{JobhopError, Result};
use crate::resource::Resource;
use crate::session::BoxFuture;

pub fn build(_resource: &Resource, spec: &JobSpec) -> Result<Variant> {
    Ok(Variant::new(
        "plain",
        Box::new(PlainPreparer),
        Box::new(PlainFetcher),
        local_directory_from_spec(spec)?,
    ))
}

/// Resolve the working directory for `jobid` under `root`.
///
/// A spec'd relative directory is taken relative to the root; an absolute
/// one must lie strictly inside it. Without one, each job gets `<root>/<jobid>`.
pub fn resolve_working_directory(root: &str, jobid: &str, spec: &JobSpec) -> Result<String> {
    let wd = match spec.working_directory.as_deref() {
        None => remote_join(root, jobid),
        Some(dir) if dir.starts_with('/') => trim_remote(dir),
        Some(dir) => remote_join(root, dir.trim_end_matches('/')),
    };
    if !is_strictly_inside(root, &wd) {
        return Err(JobhopError::orchestrator(format!(
            "working directory {wd} is not strictly inside the root directory {root}"
        )));
    }
    Ok(wd)
}

/// Copies inputs from the local directory into the working directory.
#[derive(Debug, Default)]
pub struct PlainPreparer;

impl RemotePreparer for PlainPreparer {
    fn working_directory<'a>(
        &'a self,
        root: &'a str,
        jobid: &'a str,
        spec: &'a JobSpec,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move { resolve_working_directory(root, jobid, spec) })
    }

    fn prepare<'a>(&'a self, ctx: JobContext<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            ctx.session.mkdir(ctx.root_directory).await?;
            ctx.session.mkdir(ctx.working_directory).await?;
            for input in &ctx.spec.inputs {
                check_relative("input", input)?;
                let src = ctx.local_directory.join(input);
                if !src.exists() {
                    return Err(JobhopError::orchestrator(format!(
                        "input {input:?} does not exist in {}",
                        ctx.local_directory.display()
                    )));
                }
                ctx.session
                    .put(&src, &remote_join(ctx.working_directory, input))
                    .await?;
            }
            info!(
                jobid = ctx.jobid,
                working_directory = ctx.working_directory,
                inputs = ctx.spec.inputs.len(),
                "prepared working directory"
            );
            Ok(())
        })
    }
}

/// Copies outputs and the job's metadata directory back to the local
/// directory.
#[derive(Debug, Default)]
pub struct PlainFetcher;

impl ResultFetcher for PlainFetcher {
    fn fetch<'a>(&'a self, ctx: JobContext<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            for output in &ctx.spec.outputs {
                check_relative("output", output)?;
                let remote = remote_join(ctx.working_directory, output);
                if !ctx.session.exists(&remote).await? {
                    warn!(jobid = ctx.jobid, output = %output, "output missing on the resource; skipping");
                    continue;
                }
                let dest = ctx.local_directory.join(output);
                if same_location(&ctx, &remote, &dest) {
                    continue;
                }
                ctx.session.get(&remote, &dest).await?;
            }
            fetch_meta(ctx).await?;
            info!(jobid = ctx.jobid, outputs = ctx.spec.outputs.len(), "fetched results");
            Ok(())
        })
    }
}

/// Local copy of the job's metadata directory.
pub fn local_meta_directory(local_directory: &Path, resource: &str, jobid: &str) -> std::path::PathBuf {
    local_directory
        .join(".jobhop")
        .join("jobs")
        .join(resource)
        .join(jobid)
}

async fn fetch_meta(ctx: JobContext<'_>) -> Result<()> {
    if !ctx.session.isdir(ctx.meta_directory).await? {
        warn!(jobid = ctx.jobid, "no job metadata on the resource");
        return Ok(());
    }
    let dest = local_meta_directory(ctx.local_directory, &ctx.resource.name, ctx.jobid);
    if same_location(&ctx, ctx.meta_directory, &dest) {
        return Ok(());
    }
    ctx.session.get(ctx.meta_directory, &dest).await
}

/// On a shell resource the remote and local file systems are the same one;
/// copying a path onto itself would truncate it.
fn same_location(ctx: &JobContext<'_>, remote: &str, local: &Path) -> bool {
    ctx.session.transport_kind() == "shell" && Path::new(remote) == local
}
