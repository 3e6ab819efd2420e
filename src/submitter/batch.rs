// src/submitter/batch.rs

//! Cluster batch systems: PBS/Torque, HTCondor and Slurm.

use std::sync::LazyLock;

use anyhow::anyhow;
use regex::Regex;

use crate::errors::{CommandError, Result};
use crate::session::quote;
use crate::types::{JobStatus, SubmitterStatus};

use super::{status, SubmitterBackend};

fn first_line(stdout: &str) -> Option<&str> {
    stdout.lines().map(str::trim).find(|l| !l.is_empty())
}

// ---------------------------------------------------------------------------
// PBS
// ---------------------------------------------------------------------------

static PBS_JOB_STATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*job_state\s*=\s*(\S+)").expect("valid regex"));

/// `qsub` / `qstat -f`.
#[derive(Debug, Clone, Default)]
pub struct PbsBackend;

impl SubmitterBackend for PbsBackend {
    fn name(&self) -> &'static str {
        "pbs"
    }

    fn submit_command(&self) -> Vec<String> {
        vec!["qsub".to_string()]
    }

    fn parse_submission_id(&self, stdout: &str) -> Result<Option<String>> {
        Ok(first_line(stdout).map(str::to_string))
    }

    fn status_command(&self, id: &str) -> String {
        format!("qstat -f {}", quote(id))
    }

    fn interpret_status(&self, query: std::result::Result<&str, &CommandError>) -> SubmitterStatus {
        let Ok(out) = query else {
            return SubmitterStatus::unknown();
        };
        let Some(state) = PBS_JOB_STATE.captures(out).and_then(|c| c.get(1)) else {
            return SubmitterStatus::unknown();
        };
        let state = state.as_str();
        match state {
            "Q" | "H" | "W" | "T" | "S" | "R" | "E" => status(JobStatus::Waiting, Some(state)),
            "C" | "F" => status(JobStatus::Completed, Some(state)),
            other => status(JobStatus::Unknown, Some(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// HTCondor
// ---------------------------------------------------------------------------

static CONDOR_TERSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.\d+\s*-\s*(\d+)\.\d+$").expect("valid regex")
});

/// `condor_submit -terse` / `condor_q`.
#[derive(Debug, Clone, Default)]
pub struct CondorBackend;

impl SubmitterBackend for CondorBackend {
    fn name(&self) -> &'static str {
        "condor"
    }

    fn submit_command(&self) -> Vec<String> {
        vec!["condor_submit".to_string(), "-terse".to_string()]
    }

    /// `-terse` prints `<first job> - <last job>`; both must belong to the
    /// same cluster, whose number is the submission id.
    fn parse_submission_id(&self, stdout: &str) -> Result<Option<String>> {
        let Some(line) = first_line(stdout) else {
            return Ok(None);
        };
        let caps = CONDOR_TERSE
            .captures(line)
            .ok_or_else(|| anyhow!("unexpected condor_submit output: {line:?}"))?;
        let (first, last) = (&caps[1], &caps[2]);
        if first != last {
            return Err(anyhow!(
                "condor_submit reported jobs from two clusters ({first} and {last})"
            )
            .into());
        }
        Ok(Some(first.to_string()))
    }

    fn status_command(&self, id: &str) -> String {
        format!(r"condor_q -format '%d\n' JobStatus {}", quote(id))
    }

    fn interpret_status(&self, query: std::result::Result<&str, &CommandError>) -> SubmitterStatus {
        let Ok(out) = query else {
            return SubmitterStatus::unknown();
        };
        match first_line(out) {
            // Gone from the queue.
            None => status(JobStatus::Completed, None),
            Some(code @ ("1" | "2" | "5" | "6" | "7")) => status(JobStatus::Waiting, Some(code)),
            Some(code @ ("3" | "4")) => status(JobStatus::Completed, Some(code)),
            Some(other) => status(JobStatus::Unknown, Some(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Slurm
// ---------------------------------------------------------------------------

/// `sbatch --parsable` / `squeue`.
#[derive(Debug, Clone, Default)]
pub struct SlurmBackend;

impl SubmitterBackend for SlurmBackend {
    fn name(&self) -> &'static str {
        "slurm"
    }

    fn submit_command(&self) -> Vec<String> {
        vec!["sbatch".to_string(), "--parsable".to_string()]
    }

    /// `--parsable` prints `<id>` or `<id>;<cluster>`.
    fn parse_submission_id(&self, stdout: &str) -> Result<Option<String>> {
        Ok(first_line(stdout)
            .and_then(|line| line.split(';').next())
            .filter(|id| !id.is_empty())
            .map(str::to_string))
    }

    fn status_command(&self, id: &str) -> String {
        format!("squeue -h -o %T -j {}", quote(id))
    }

    fn interpret_status(&self, query: std::result::Result<&str, &CommandError>) -> SubmitterStatus {
        let Ok(out) = query else {
            return SubmitterStatus::unknown();
        };
        match first_line(out) {
            None => status(JobStatus::Completed, None),
            Some(
                state @ ("PENDING" | "RUNNING" | "CONFIGURING" | "COMPLETING" | "SUSPENDED"
                | "REQUEUED" | "RESIZING" | "STOPPED" | "SIGNALING"),
            ) => status(JobStatus::Waiting, Some(state)),
            Some(
                state @ ("COMPLETED" | "FAILED" | "CANCELLED" | "TIMEOUT" | "NODE_FAIL"
                | "PREEMPTED" | "OUT_OF_MEMORY" | "BOOT_FAIL" | "DEADLINE"),
            ) => status(JobStatus::Completed, Some(state)),
            Some(other) => status(JobStatus::Unknown, Some(other)),
        }
    }
}
