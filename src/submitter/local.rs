// src/submitter/local.rs

//! Background process on the resource itself.

use crate::errors::{CommandError, Result};
use crate::session::quote;
use crate::types::{JobStatus, SubmitterStatus};

use super::{status, SubmitterBackend};

/// Runs the submission script with `sh`; the script starts the run script in
/// the background and prints its pid, which becomes the submission id.
#[derive(Debug, Clone, Default)]
pub struct LocalBackend;

impl SubmitterBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    fn submit_command(&self) -> Vec<String> {
        vec!["sh".to_string()]
    }

    fn parse_submission_id(&self, stdout: &str) -> Result<Option<String>> {
        let pid = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty());
        Ok(pid
            .filter(|pid| pid.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string))
    }

    fn status_command(&self, id: &str) -> String {
        format!("ps -o stat= -p {}", quote(id))
    }

    fn interpret_status(&self, query: std::result::Result<&str, &CommandError>) -> SubmitterStatus {
        match query {
            Ok(out) => {
                let stat = out.trim();
                if stat.is_empty() {
                    status(JobStatus::Completed, None)
                } else if stat.starts_with('Z') {
                    // Exited, not yet reaped.
                    status(JobStatus::Completed, Some(stat))
                } else {
                    status(JobStatus::Waiting, Some(stat))
                }
            }
            // `ps -p` exits 1 when no such process exists.
            Err(e) if e.exit_code == Some(1) => status(JobStatus::Completed, None),
            Err(_) => SubmitterStatus::unknown(),
        }
    }
}
