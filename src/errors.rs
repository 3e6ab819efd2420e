// src/errors.rs

//! Crate-wide error type and helpers.

use thiserror::Error;

/// A command run through a [`Session`](crate::session::Session) exited with a
/// non-zero status.
///
/// The captured output travels with the error so callers can log context
/// without re-running the command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("command {cmd:?} failed with exit code {}", display_code(.exit_code))]
pub struct CommandError {
    pub cmd: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

fn display_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "<none>".to_string())
}

#[derive(Error, Debug)]
pub enum JobhopError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Orchestrator error: {0}")]
    Orchestrator(String),

    #[error("Missing external dependency '{name}': {reason}")]
    MissingExternalDependency { name: String, reason: String },

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Unknown {kind}: '{name}' (known: {known})")]
    UnknownName {
        kind: &'static str,
        name: String,
        known: String,
    },

    #[error("Job already registered: {0}")]
    JobExists(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl JobhopError {
    pub fn orchestrator(msg: impl Into<String>) -> Self {
        JobhopError::Orchestrator(msg.into())
    }

    /// The underlying [`CommandError`], if this error is one.
    pub fn as_command_error(&self) -> Option<&CommandError> {
        match self {
            JobhopError::Command(e) => Some(e),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, JobhopError>;
