// src/submitter/mod.rs

//! Handing a submission script to a batch system (or a plain background
//! process) and asking it how the job is doing.
//!
//! [`Submitter`] holds the state shared by every backend (the submission id)
//! and implements `submit`, `status` and `follow` once. A
//! [`SubmitterBackend`] only supplies the backend specifics: which command
//! submits, how its output names the job, which command reports status, and
//! how that report maps onto [`JobStatus`].

pub mod batch;
pub mod local;

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use batch::{CondorBackend, PbsBackend, SlurmBackend};
pub use local::LocalBackend;

use crate::errors::{CommandError, JobhopError, Result};
use crate::session::{quote, Session};
use crate::types::{JobStatus, SubmitterStatus};

/// Default pause between two status queries in [`Submitter::follow`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Backend-specific half of a submitter.
pub trait SubmitterBackend: Send + Sync + std::fmt::Debug {
    /// Name used in job specs, records, and as the submission template name.
    fn name(&self) -> &'static str;

    /// Command (program plus leading arguments) the script path is appended to.
    fn submit_command(&self) -> Vec<String>;

    /// Extract the submission id from what the submit command printed.
    ///
    /// `Ok(None)` means the backend gave no usable id; an error means the
    /// output broke one of the backend's own guarantees.
    fn parse_submission_id(&self, stdout: &str) -> Result<Option<String>>;

    /// Shell command that reports the status of submission `id`.
    fn status_command(&self, id: &str) -> String;

    /// Map the status command's outcome onto the normalized model.
    ///
    /// Receives the command's stdout, or the [`CommandError`] when the status
    /// command itself failed. Anything unrecognized must map to
    /// [`JobStatus::Unknown`].
    fn interpret_status(&self, query: std::result::Result<&str, &CommandError>) -> SubmitterStatus;
}

/// How [`Submitter::follow`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowOutcome {
    /// The submitter stopped reporting `waiting`. `polls` counts the pauses
    /// taken before that.
    Finished { status: SubmitterStatus, polls: u32 },
    /// The cancellation token fired.
    Cancelled,
    /// The timeout elapsed.
    TimedOut,
}

/// Knobs for [`Submitter::follow`]. The default polls every ten seconds
/// forever.
#[derive(Debug, Clone)]
pub struct FollowOptions {
    pub interval: Duration,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl Default for FollowOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
            cancel: None,
        }
    }
}

impl FollowOptions {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// A submitter: one backend plus the id of the job it submitted.
///
/// The session is passed into each call rather than stored, since the
/// orchestrator owns it.
#[derive(Debug)]
pub struct Submitter {
    backend: Box<dyn SubmitterBackend>,
    submission_id: Option<String>,
}

impl Submitter {
    pub fn new(backend: Box<dyn SubmitterBackend>) -> Self {
        Self {
            backend,
            submission_id: None,
        }
    }

    /// Restore a previously obtained submission id.
    pub fn with_submission_id(mut self, id: Option<String>) -> Self {
        self.submission_id = id;
        self
    }

    pub fn name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn submission_id(&self) -> Option<&str> {
        self.submission_id.as_deref()
    }

    /// Run the submit command on `script` and remember the id, if any.
    pub async fn submit(&mut self, session: &Session, script: &str) -> Result<Option<String>> {
        let mut words = self.backend.submit_command();
        words.push(script.to_string());
        let command = quote::join(&words);

        info!(submitter = self.name(), script = %script, "submitting job");
        let (stdout, _stderr) = session.execute_command(&command, None, None).await?;
        let id = self.backend.parse_submission_id(&stdout)?;
        if let Some(id) = &id {
            debug!(submitter = self.name(), submission_id = %id, "job submitted");
        }
        self.submission_id = id.clone();
        Ok(id)
    }

    /// Current status, as `(normalized, raw)`.
    ///
    /// Without a submission id this is `unknown` and the backend is not
    /// contacted at all.
    pub async fn status(&self, session: &Session) -> Result<SubmitterStatus> {
        let Some(id) = self.submission_id.as_deref() else {
            return Ok(SubmitterStatus::unknown());
        };

        let command = self.backend.status_command(id);
        let status = match session.execute_command(&command, None, None).await {
            Ok((stdout, _)) => self.backend.interpret_status(Ok(&stdout)),
            Err(JobhopError::Command(e)) => self.backend.interpret_status(Err(&e)),
            Err(e) => return Err(e),
        };
        debug!(submitter = self.name(), submission_id = %id, status = %status, "polled status");
        Ok(status)
    }

    /// Poll until the status is no longer `waiting`.
    ///
    /// There is no backoff and no retry limit: without a timeout or a
    /// cancellation token, a backend that reports `waiting` forever blocks
    /// forever.
    pub async fn follow(&self, session: &Session, options: &FollowOptions) -> Result<FollowOutcome> {
        let deadline = options.timeout.map(|t| Instant::now() + t);
        let mut polls = 0u32;

        loop {
            let status = self.status(session).await?;
            if !status.is_waiting() {
                info!(submitter = self.name(), status = %status, polls, "job no longer waiting");
                return Ok(FollowOutcome::Finished { status, polls });
            }

            tokio::select! {
                _ = tokio::time::sleep(options.interval) => {
                    polls += 1;
                }
                _ = cancelled(options.cancel.as_ref()) => {
                    warn!(submitter = self.name(), "follow cancelled");
                    return Ok(FollowOutcome::Cancelled);
                }
                _ = expired(deadline) => {
                    warn!(submitter = self.name(), "follow timed out");
                    return Ok(FollowOutcome::TimedOut);
                }
            }
        }
    }
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

async fn expired(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Shorthand used by the backends.
pub(crate) fn status(status: JobStatus, raw: Option<&str>) -> SubmitterStatus {
    SubmitterStatus::new(status, raw.map(str::to_string))
}
