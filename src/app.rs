// src/app.rs

//! The operations behind the CLI, independent of argument parsing and
//! printing: running a job, and listing/fetching/deleting registered ones.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::ConfigFile;
use crate::errors::{JobhopError, Result};
use crate::orchestrator::{JobRecord, JobSpec, Orchestrator};
use crate::registry::LocalRegistry;
use crate::submitter::{FollowOptions, FollowOutcome};
use crate::types::SubmitterStatus;

/// Configuration, catalog and registry bundled for one invocation.
#[derive(Debug)]
pub struct App {
    config: ConfigFile,
    catalog: Catalog,
    registry: LocalRegistry,
}

/// What `run_job` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub jobid: String,
    pub submission_id: Option<String>,
    /// Set when the job was followed.
    pub follow: Option<FollowOutcome>,
}

/// One line of `jobs list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub jobid: String,
    pub resource: String,
    pub submitter_status: SubmitterStatus,
    pub status: String,
}

impl fmt::Display for JobSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}  {}  {}  {}",
            self.jobid, self.resource, self.submitter_status, self.status
        )
    }
}

/// What `fetch_job` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Results fetched, record removed.
    Fetched,
    /// The job has not completed yet; nothing was touched.
    NotCompleted,
}

impl App {
    /// Check every configured resource type against the catalog up front.
    pub fn new(config: ConfigFile, catalog: Catalog, registry: LocalRegistry) -> Result<Self> {
        for (name, resource) in &config.resource {
            catalog.transport(&resource.kind).map_err(|e| {
                JobhopError::ConfigError(format!("resource '{name}': {e}"))
            })?;
        }
        Ok(Self {
            config,
            catalog,
            registry,
        })
    }

    /// Builtin catalog and the registry named in the config (or the default).
    pub fn from_config(config: ConfigFile) -> Result<Self> {
        let dir = match &config.config.registry_dir {
            Some(dir) => dir.clone(),
            None => LocalRegistry::default_dir()?,
        };
        Self::new(config, Catalog::builtin(), LocalRegistry::new(dir))
    }

    pub fn registry(&self) -> &LocalRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Follow options with the configured poll interval.
    pub fn follow_options(&self) -> FollowOptions {
        FollowOptions::default()
            .with_interval(Duration::from_secs(self.config.config.follow_interval_secs))
    }

    /// Prepare, submit and register a job on `resource_name`. With
    /// `follow`, also wait for it and fetch its results, unregistering it
    /// once they are local.
    pub async fn run_job(
        &self,
        resource_name: &str,
        spec: JobSpec,
        follow: Option<&FollowOptions>,
    ) -> Result<RunOutcome> {
        let resource = self.config.resource_named(resource_name)?;
        let session = resource.get_session(&self.catalog)?;
        let mut orc = Orchestrator::new(&self.catalog, resource, session, spec)?;

        orc.session_mut().open().await?;
        let result = self.drive(&mut orc, follow).await;
        close_quietly(&mut orc).await;
        result
    }

    async fn drive(&self, orc: &mut Orchestrator, follow: Option<&FollowOptions>) -> Result<RunOutcome> {
        orc.prepare_remote().await?;
        let submission_id = orc.submit().await?;
        let jobid = orc.jobid().to_string();
        self.registry.register(&jobid, &orc.as_dict().await?)?;
        info!(jobid = %jobid, "job registered");

        let Some(options) = follow else {
            return Ok(RunOutcome {
                jobid,
                submission_id,
                follow: None,
            });
        };

        let outcome = orc.follow(options).await?;
        if let FollowOutcome::Finished { .. } = outcome {
            orc.fetch().await?;
            self.registry.unregister(&jobid)?;
            info!(jobid = %jobid, "results fetched; job unregistered");
        } else {
            info!(jobid = %jobid, outcome = ?outcome, "stopped following; job stays registered");
        }
        Ok(RunOutcome {
            jobid,
            submission_id,
            follow: Some(outcome),
        })
    }

    /// Job ids to act on. `all` wins; otherwise each entry must be a full
    /// id or unambiguous prefix. Resolution failures are returned per entry.
    pub fn select_jobs(&self, jobids: &[String], all: bool) -> Result<Vec<(String, Result<String>)>> {
        if all || jobids.is_empty() {
            return Ok(self
                .registry
                .find_job_files()?
                .into_keys()
                .map(|id| (id.clone(), Ok(id)))
                .collect());
        }
        Ok(jobids
            .iter()
            .map(|prefix| (prefix.clone(), self.registry.match_jobid(prefix)))
            .collect())
    }

    pub fn load_record(&self, jobid: &str) -> Result<JobRecord> {
        self.registry.load(jobid)
    }

    /// Rebuild the orchestrator of a registered job, with its session open.
    pub async fn resurrect(&self, jobid: &str) -> Result<Orchestrator> {
        let record = self.registry.load(jobid)?;
        let resource = self
            .config
            .resource_for_job(&record.resource_name, &record.resource_id)?;
        let session = resource.get_session(&self.catalog)?;
        let mut orc = Orchestrator::resurrect(&self.catalog, resource, session, &record)?;
        orc.session_mut().open().await?;
        Ok(orc)
    }

    pub async fn summarize(&self, jobid: &str) -> Result<JobSummary> {
        let mut orc = self.resurrect(jobid).await?;
        let result = summary_of(&orc).await;
        close_quietly(&mut orc).await;
        result
    }

    /// Fetch a completed job's results and unregister it.
    pub async fn fetch_job(&self, jobid: &str) -> Result<FetchOutcome> {
        let mut orc = self.resurrect(jobid).await?;
        let result = self.fetch_completed(&orc).await;
        close_quietly(&mut orc).await;
        result
    }

    async fn fetch_completed(&self, orc: &Orchestrator) -> Result<FetchOutcome> {
        if !orc.has_completed().await? {
            return Ok(FetchOutcome::NotCompleted);
        }
        orc.fetch().await?;
        self.registry.unregister(orc.jobid())?;
        Ok(FetchOutcome::Fetched)
    }

    pub fn delete_job(&self, jobid: &str) -> Result<bool> {
        let removed = self.registry.unregister(jobid)?;
        debug!(jobid, removed, "delete requested");
        Ok(removed)
    }
}

async fn summary_of(orc: &Orchestrator) -> Result<JobSummary> {
    Ok(JobSummary {
        jobid: orc.jobid().to_string(),
        resource: orc.resource().name.clone(),
        submitter_status: orc.submitter_status().await?,
        status: orc.status().await?,
    })
}

async fn close_quietly(orc: &mut Orchestrator) {
    if let Err(e) = orc.close().await {
        warn!(jobid = %orc.jobid(), error = %e, "failed to close session");
    }
}
