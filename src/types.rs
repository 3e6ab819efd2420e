use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normalized job status as reported by a submitter.
///
/// Every backend maps its own vocabulary onto these three states. Anything a
/// backend reports that is not explicitly recognized becomes `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Waiting,
    Completed,
    Unknown,
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Unknown
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Waiting => "waiting",
            JobStatus::Completed => "completed",
            JobStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A submitter's view of a job: the normalized status plus whatever the
/// backend literally reported, if anything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmitterStatus {
    pub status: JobStatus,
    pub raw: Option<String>,
}

impl SubmitterStatus {
    pub fn new(status: JobStatus, raw: impl Into<Option<String>>) -> Self {
        Self {
            status,
            raw: raw.into(),
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_waiting(&self) -> bool {
        self.status == JobStatus::Waiting
    }
}

impl fmt::Display for SubmitterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.raw {
            Some(raw) => write!(f, "{} ({raw})", self.status),
            None => write!(f, "{}", self.status),
        }
    }
}

/// Generate a fresh job id of the form `<YYYYMMDD-HHMMSS>-<4 hex chars>`.
pub fn generate_jobid() -> String {
    jobid_at(Local::now())
}

pub(crate) fn jobid_at(now: DateTime<Local>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", now.format("%Y%m%d-%H%M%S"), &suffix[..4])
}
