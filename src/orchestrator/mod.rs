// src/orchestrator/mod.rs

//! Driving one job through its lifecycle on one resource.
//!
//! An [`Orchestrator`] owns the job's session and submitter and combines
//! them with a [`Variant`] (how to prepare the remote side, how to fetch
//! results). Lifecycle:
//!
//! 1. `prepare_remote` creates directories and stages inputs.
//! 2. `submit` renders the run script and submission script from templates,
//!    uploads both into the job's metadata directory and hands the
//!    submission script to the submitter.
//! 3. `follow` / `status` / `has_completed` observe the job.
//! 4. `fetch` brings results back.
//!
//! `as_dict` captures everything needed to `resurrect` the orchestrator in a
//! later process.

pub mod dataset;
pub mod plain;
pub mod record;
pub mod spec;
pub mod variant;

use std::collections::BTreeMap;
use std::path::Path;

use serde_yaml::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

pub use record::JobRecord;
pub use spec::JobSpec;
pub use variant::{JobContext, RemotePreparer, ResultFetcher, Variant};

use crate::catalog::Catalog;
use crate::errors::{JobhopError, Result};
use crate::resource::Resource;
use crate::session::Session;
use crate::submitter::{FollowOptions, FollowOutcome, Submitter};
use crate::template::{TemplateKind, Templates};
use crate::types::{generate_jobid, SubmitterStatus};

/// Default root directory, relative to `$HOME` on the resource.
pub const DEFAULT_ROOT: &str = ".jobhop/run-root";

/// Record fields that must not be repeated among the flattened parameters.
const RECORD_FIELDS: &[&str] = &[
    "resource_id",
    "resource_name",
    "local_directory",
    "orchestrator",
    "submitter",
    "submission_id",
];

#[derive(Debug)]
pub struct Orchestrator {
    jobid: String,
    resource: Resource,
    spec: JobSpec,
    session: Session,
    submitter: Submitter,
    variant: Variant,
    templates: Templates,
    root_directory: OnceCell<String>,
    working_directory: OnceCell<String>,
    meta_directory: OnceCell<String>,
}

impl Orchestrator {
    /// Orchestrator for a new job with a fresh job id.
    ///
    /// The orchestrator and submitter named in `spec` (default `plain` and
    /// `local`) are looked up in `catalog`.
    pub fn new(catalog: &Catalog, resource: Resource, session: Session, spec: JobSpec) -> Result<Self> {
        Self::build(catalog, resource, session, spec, generate_jobid(), None)
    }

    /// Reconstruct the orchestrator of a previously submitted job.
    ///
    /// `resource` must be the resource named in the record; the caller is
    /// expected to have checked its id.
    pub fn resurrect(
        catalog: &Catalog,
        resource: Resource,
        session: Session,
        record: &JobRecord,
    ) -> Result<Self> {
        let jobid = record
            .jobid()
            .ok_or_else(|| JobhopError::orchestrator("job record has no jobid"))?
            .to_string();
        if !Path::new(&record.local_directory).is_dir() {
            return Err(JobhopError::orchestrator(format!(
                "local directory {} of job {jobid} no longer exists",
                record.local_directory
            )));
        }

        let spec = record.job_spec()?;
        let root = spec.root_directory.clone();
        let wd = spec.working_directory.clone();
        let mut orc = Self::build(catalog, resource, session, spec, jobid, record.submission_id.clone())?;
        orc.root_directory = OnceCell::new_with(root);
        orc.working_directory = OnceCell::new_with(wd);
        debug!(jobid = %orc.jobid, "resurrected orchestrator");
        Ok(orc)
    }

    fn build(
        catalog: &Catalog,
        resource: Resource,
        session: Session,
        spec: JobSpec,
        jobid: String,
        submission_id: Option<String>,
    ) -> Result<Self> {
        let make_variant = catalog.orchestrator(spec.orchestrator_name())?;
        let variant = make_variant(&resource, &spec)?;
        let submitter =
            Submitter::new(catalog.submitter(spec.submitter_name())?).with_submission_id(submission_id);
        let templates = Templates::builtin()?;
        if !templates.has(TemplateKind::Submission, submitter.name()) {
            return Err(JobhopError::orchestrator(format!(
                "no submission template for submitter '{}'",
                submitter.name()
            )));
        }
        Ok(Self {
            jobid,
            resource,
            spec,
            session,
            submitter,
            variant,
            templates,
            root_directory: OnceCell::new(),
            working_directory: OnceCell::new(),
            meta_directory: OnceCell::new(),
        })
    }

    pub fn jobid(&self) -> &str {
        &self.jobid
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn spec(&self) -> &JobSpec {
        &self.spec
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn submitter(&self) -> &Submitter {
        &self.submitter
    }

    pub fn variant_name(&self) -> &'static str {
        self.variant.name
    }

    pub fn local_directory(&self) -> &Path {
        &self.variant.local_directory
    }

    /// Absolute root for all of this orchestrator's jobs on the resource.
    ///
    /// The job spec's `root_directory` (with `~` expanded), or
    /// `$HOME/.jobhop/run-root`. Resolved once.
    pub async fn root_directory(&self) -> Result<&str> {
        self.root_directory
            .get_or_try_init(|| self.resolve_root_directory())
            .await
            .map(String::as_str)
    }

    async fn resolve_root_directory(&self) -> Result<String> {
        let root = match self.spec.root_directory.as_deref() {
            Some("~") => self.remote_home().await?,
            Some(dir) if dir.starts_with("~/") => variant::remote_join(&self.remote_home().await?, &dir[2..]),
            Some(dir) => dir.to_string(),
            None => variant::remote_join(&self.remote_home().await?, DEFAULT_ROOT),
        };
        if !root.starts_with('/') {
            return Err(JobhopError::orchestrator(format!(
                "root directory {root:?} on resource '{}' is not absolute",
                self.resource.name
            )));
        }
        Ok(variant::trim_remote(&root))
    }

    async fn remote_home(&self) -> Result<String> {
        let home = self
            .session
            .query_env_vars()
            .await?
            .remove("HOME")
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                JobhopError::orchestrator(format!(
                    "HOME is not set on resource '{}'",
                    self.resource.name
                ))
            })?;
        if !home.starts_with('/') {
            return Err(JobhopError::orchestrator(format!(
                "HOME {home:?} on resource '{}' is not an absolute path",
                self.resource.name
            )));
        }
        Ok(home)
    }

    /// Directory the job's command runs in. Resolved once.
    pub async fn working_directory(&self) -> Result<&str> {
        self.working_directory
            .get_or_try_init(|| async {
                let root = self.root_directory().await?;
                self.variant
                    .preparer
                    .working_directory(root, &self.jobid, &self.spec)
                    .await
            })
            .await
            .map(String::as_str)
    }

    /// `<working dir>/.jobhop/jobs/<resource>/<jobid>`: scripts, status
    /// and captured output of this job.
    pub async fn meta_directory(&self) -> Result<&str> {
        self.meta_directory
            .get_or_try_init(|| async {
                let wd = self.working_directory().await?;
                Ok::<_, JobhopError>(variant::remote_join(
                    wd,
                    &format!(".jobhop/jobs/{}/{}", self.resource.name, self.jobid),
                ))
            })
            .await
            .map(String::as_str)
    }

    async fn context(&self) -> Result<JobContext<'_>> {
        Ok(JobContext {
            session: &self.session,
            resource: &self.resource,
            spec: &self.spec,
            jobid: &self.jobid,
            root_directory: self.root_directory().await?,
            working_directory: self.working_directory().await?,
            meta_directory: self.meta_directory().await?,
            local_directory: &self.variant.local_directory,
        })
    }

    /// Parameters handed to every template: the job spec plus the resolved
    /// directories, the job id, and whatever the variant contributes.
    pub async fn template_params(&self) -> Result<BTreeMap<String, Value>> {
        let mut params = self.spec.to_params()?;
        let text = |s: &str| Value::String(s.to_string());
        params.insert("jobid".into(), text(&self.jobid));
        params.insert("root_directory".into(), text(self.root_directory().await?));
        params.insert("working_directory".into(), text(self.working_directory().await?));
        params.insert("meta_directory".into(), text(self.meta_directory().await?));
        params.insert(
            "local_directory".into(),
            text(&self.variant.local_directory.to_string_lossy()),
        );
        params.insert("orchestrator".into(), text(self.variant.name));
        params.insert("submitter".into(), text(self.submitter.name()));
        params.entry("commit_outputs".into()).or_insert(Value::Bool(false));
        params.extend(self.variant.preparer.template_params());
        Ok(params)
    }

    /// Stage the working directory. Safe to repeat.
    pub async fn prepare_remote(&self) -> Result<()> {
        let ctx = self.context().await?;
        self.variant.preparer.prepare(ctx).await
    }

    /// Render and upload the scripts, then submit. Returns the submission
    /// id, if the submitter produced one.
    pub async fn submit(&mut self) -> Result<Option<String>> {
        if self.spec.command_str.as_deref().map_or(true, |c| c.trim().is_empty()) {
            return Err(JobhopError::orchestrator(format!(
                "job {} has no command_str to run",
                self.jobid
            )));
        }

        let params = self.template_params().await?;
        let runscript = self
            .templates
            .render(TemplateKind::Runscript, "base", &params)?;
        let submission = self
            .templates
            .render(TemplateKind::Submission, self.submitter.name(), &params)?;

        let meta = self.meta_directory().await?.to_string();
        let root = self.root_directory().await?.to_string();
        let runscript_path = variant::remote_join(&meta, "runscript");
        let submit_path = variant::remote_join(&meta, "submit");
        self.session.mkdir(&meta).await?;
        for (path, contents) in [(&runscript_path, &runscript), (&submit_path, &submission)] {
            self.session.write(path, contents.as_bytes()).await?;
            self.session.chmod(path, 0o755).await?;
        }

        let id = self.submitter.submit(&self.session, &submit_path).await?;
        match &id {
            Some(id) => {
                let idmap = variant::remote_join(&root, &format!("idmap/{}", self.jobid));
                self.session.write(&idmap, format!("{id}\n").as_bytes()).await?;
                info!(jobid = %self.jobid, submission_id = %id, resource = %self.resource.name, "job submitted");
            }
            None => warn!(
                jobid = %self.jobid,
                submitter = self.submitter.name(),
                "submitter returned no id; status will be reported as unknown"
            ),
        }
        Ok(id)
    }

    /// Wait until the submitter stops reporting the job as waiting.
    ///
    /// When it does, the job must also have left its completion marker;
    /// otherwise the job died without running its run script to the end.
    pub async fn follow(&self, options: &FollowOptions) -> Result<FollowOutcome> {
        let outcome = self.submitter.follow(&self.session, options).await?;
        if let FollowOutcome::Finished { status, .. } = &outcome {
            if !self.has_completed().await? {
                return Err(JobhopError::orchestrator(format!(
                    "job {} is no longer queued ({status}) but never marked itself completed",
                    self.jobid
                )));
            }
        }
        Ok(outcome)
    }

    /// Whether the job's completion marker exists under the root.
    pub async fn has_completed(&self) -> Result<bool> {
        let root = self.root_directory().await?;
        self.session
            .exists(&variant::remote_join(root, &format!("completed/{}", self.jobid)))
            .await
    }

    /// The run script's own view of the job (`running`, `succeeded`,
    /// `failed`), or `unknown` before it first ran.
    pub async fn status(&self) -> Result<String> {
        let path = variant::remote_join(self.meta_directory().await?, "status");
        if !self.session.exists(&path).await? {
            return Ok("unknown".to_string());
        }
        Ok(self.session.read(&path).await?.trim().to_string())
    }

    pub async fn submitter_status(&self) -> Result<SubmitterStatus> {
        self.submitter.status(&self.session).await
    }

    /// Bring results back to the local directory.
    pub async fn fetch(&self) -> Result<()> {
        if !self.has_completed().await? {
            warn!(jobid = %self.jobid, "fetching results of a job that has not completed");
        }
        let ctx = self.context().await?;
        self.variant.fetcher.fetch(ctx).await
    }

    /// Snapshot for the registry.
    pub async fn as_dict(&self) -> Result<JobRecord> {
        let mut params = self.template_params().await?;
        params.retain(|k, _| !RECORD_FIELDS.contains(&k.as_str()));
        Ok(JobRecord {
            resource_id: self.resource.id.clone(),
            resource_name: self.resource.name.clone(),
            local_directory: self.variant.local_directory.to_string_lossy().into_owned(),
            orchestrator: self.variant.name.to_string(),
            submitter: self.submitter.name().to_string(),
            submission_id: self.submitter.submission_id().map(str::to_string),
            params,
        })
    }

    /// Close the session.
    pub async fn close(&mut self) -> Result<()> {
        self.session.close().await
    }
}
