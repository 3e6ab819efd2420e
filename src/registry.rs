// src/registry.rs

//! Persistent store of submitted jobs, one YAML file per job id.
//!
//! Registration is atomic and exclusive: the record is written to a temp
//! file and hard-linked into place, so a reader never sees a partial file
//! and a second registration of the same id fails with
//! [`JobhopError::JobExists`].

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{JobhopError, Result};
use crate::orchestrator::JobRecord;

#[derive(Debug, Clone)]
pub struct LocalRegistry {
    dir: PathBuf,
}

impl LocalRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<user data dir>/jobhop/jobs`.
    pub fn default_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|d| d.join("jobhop").join("jobs"))
            .ok_or_else(|| JobhopError::ConfigError("cannot determine the user data directory".into()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, jobid: &str) -> Result<PathBuf> {
        let valid = !jobid.is_empty()
            && !jobid.starts_with('.')
            && !jobid.contains(['/', '\\']);
        if !valid {
            return Err(JobhopError::orchestrator(format!("invalid job id {jobid:?}")));
        }
        Ok(self.dir.join(jobid))
    }

    /// Persist `record` under `jobid`. Fails if the id is already taken.
    pub fn register(&self, jobid: &str, record: &JobRecord) -> Result<()> {
        let path = self.path_for(jobid)?;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating registry dir {:?}", self.dir))?;

        let tmp = self
            .dir
            .join(format!(".{jobid}.{}.tmp", Uuid::new_v4().simple()));
        std::fs::write(&tmp, record.to_yaml()?)
            .with_context(|| format!("writing {:?}", tmp))?;

        let linked = std::fs::hard_link(&tmp, &path);
        if let Err(e) = std::fs::remove_file(&tmp) {
            warn!(path = ?tmp, error = %e, "failed to remove temporary job file");
        }
        match linked {
            Ok(()) => {
                debug!(jobid, path = ?path, "registered job");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(JobhopError::JobExists(jobid.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the record for `jobid`. Returns whether there was one.
    pub fn unregister(&self, jobid: &str) -> Result<bool> {
        match std::fs::remove_file(self.path_for(jobid)?) {
            Ok(()) => {
                debug!(jobid, "unregistered job");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// All registered job ids mapped to their record files. A missing
    /// registry directory is simply empty.
    pub fn find_job_files(&self) -> Result<BTreeMap<String, PathBuf>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };

        let mut jobs = BTreeMap::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !entry.file_type()?.is_file() {
                continue;
            }
            jobs.insert(name, entry.path());
        }
        Ok(jobs)
    }

    pub fn load(&self, jobid: &str) -> Result<JobRecord> {
        let path = self.path_for(jobid)?;
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(JobhopError::orchestrator(format!("no registered job {jobid}")));
            }
            Err(e) => return Err(e.into()),
        };
        JobRecord::from_yaml(&text)
    }

    /// Full job id for an exact id or an unambiguous prefix.
    pub fn match_jobid(&self, prefix: &str) -> Result<String> {
        let jobs = self.find_job_files()?;
        if jobs.contains_key(prefix) {
            return Ok(prefix.to_string());
        }
        let matches: Vec<&String> = jobs.keys().filter(|id| id.starts_with(prefix)).collect();
        match matches.as_slice() {
            [only] => Ok((*only).clone()),
            [] => Err(JobhopError::orchestrator(format!("no registered job matches {prefix:?}"))),
            many => Err(JobhopError::orchestrator(format!(
                "{prefix:?} is ambiguous: matches {}",
                many.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
            ))),
        }
    }
}
