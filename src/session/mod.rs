// src/session/mod.rs

//! Command execution and environment state on one resource.
//!
//! A [`Session`] wraps a [`Transport`] and adds:
//! - environment overlays (ephemeral and permanent) applied to every command,
//! - `query_env_vars` / `source_script` to observe and capture environments,
//! - POSIX file operations built from plain shell commands (see [`files`]).
//!
//! Precedence for a variable seen by a command, highest first: the per-call
//! override, the ephemeral overlay, the permanent overlay, and finally the
//! resource's own environment.

pub mod env;
pub mod files;
pub mod local;
pub mod quote;
pub mod ssh;
pub mod transport;

use anyhow::anyhow;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use env::{EnvMap, EnvOverrides};
pub use local::LocalTransport;
pub use quote::quote;
pub use ssh::SshTransport;
pub use transport::{BoxFuture, CommandOutput, Transport};

use crate::errors::{CommandError, JobhopError, Result};

/// Which overlay an environment change targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overlay {
    /// Lives as long as this session.
    #[default]
    Ephemeral,
    /// Meant to survive across sessions on persistent resources. Currently
    /// held in memory only, below the ephemeral overlay.
    Permanent,
}

/// Stateful handle for issuing commands against one resource.
#[derive(Debug)]
pub struct Session {
    transport: Box<dyn Transport>,
    env: EnvMap,
    env_permanent: EnvMap,
    is_open: bool,
}

impl Session {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            env: EnvMap::new(),
            env_permanent: EnvMap::new(),
            is_open: false,
        }
    }

    /// Session on the invoking host.
    pub fn local() -> Self {
        Self::new(Box::new(LocalTransport::new()))
    }

    pub fn transport_kind(&self) -> &'static str {
        self.transport.kind()
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub async fn open(&mut self) -> Result<()> {
        if !self.is_open {
            debug!(transport = self.transport.kind(), "opening session");
            self.transport.open().await?;
            self.is_open = true;
        }
        Ok(())
    }

    pub async fn close(&mut self) -> Result<()> {
        if self.is_open {
            debug!(transport = self.transport.kind(), "closing session");
            self.is_open = false;
            self.transport.close().await?;
        }
        Ok(())
    }

    /// Run `command` and return its `(stdout, stderr)`.
    ///
    /// `env` is layered over the session overlays for this call only; `cwd`
    /// is entered before the command runs.
    pub async fn execute_command(
        &self,
        command: &str,
        env: Option<&EnvOverrides>,
        cwd: Option<&str>,
    ) -> Result<(String, String)> {
        let out = self.run(command, env, cwd, None).await?;
        Ok((out.stdout_lossy(), out.stderr_lossy()))
    }

    /// Run `command`, failing with [`CommandError`] on a non-zero exit.
    pub(crate) async fn run(
        &self,
        command: &str,
        env: Option<&EnvOverrides>,
        cwd: Option<&str>,
        stdin: Option<&[u8]>,
    ) -> Result<CommandOutput> {
        let full = self.compose(command, env, cwd)?;
        debug!(transport = self.transport.kind(), cmd = %command, "executing command");
        let out = self.transport.execute(&full, stdin).await?;
        if out.failed() {
            let err = CommandError {
                cmd: command.to_string(),
                exit_code: out.exit_code,
                stdout: out.stdout_lossy(),
                stderr: out.stderr_lossy(),
            };
            debug!(
                cmd = %err.cmd,
                exit_code = ?err.exit_code,
                stderr = %err.stderr.trim_end(),
                "command failed"
            );
            return Err(err.into());
        }
        Ok(out)
    }

    /// Prefix `command` with the effective overlay and working directory.
    fn compose(&self, command: &str, env: Option<&EnvOverrides>, cwd: Option<&str>) -> Result<String> {
        let mut merged: EnvOverrides = self
            .env_permanent
            .iter()
            .map(|(k, v)| (k.clone(), Some(v.clone())))
            .collect();
        merged.extend(self.env.iter().map(|(k, v)| (k.clone(), Some(v.clone()))));
        if let Some(env) = env {
            merged.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let mut lines = Vec::with_capacity(merged.len() + 2);
        for (key, value) in &merged {
            check_name(key)?;
            lines.push(match value {
                Some(value) => format!("export {key}={}", quote(value)),
                None => format!("unset {key}"),
            });
        }
        if let Some(cwd) = cwd {
            lines.push(format!("cd {} || exit 1", quote(cwd)));
        }
        if lines.is_empty() {
            return Ok(command.to_string());
        }
        lines.push(command.to_string());
        Ok(lines.join("\n"))
    }

    /// Set (or, with `None`, remove) one variable in an overlay.
    ///
    /// With `format`, the first `{}` in `value` is replaced by the variable's
    /// previous value: the overlay's, or else the resource's own.
    pub async fn set_env_var(
        &mut self,
        name: &str,
        value: Option<&str>,
        overlay: Overlay,
        format: bool,
    ) -> Result<()> {
        check_name(name)?;
        let value = match value {
            Some(v) if format => {
                let previous = match self.overlay(overlay).get(name) {
                    Some(prev) => prev.clone(),
                    None => self
                        .query_env_vars()
                        .await?
                        .remove(name)
                        .unwrap_or_default(),
                };
                Some(v.replacen("{}", &previous, 1))
            }
            other => other.map(str::to_string),
        };

        let target = self.overlay_mut(overlay);
        match value {
            Some(v) => {
                target.insert(name.to_string(), v);
            }
            None => {
                target.remove(name);
            }
        }
        Ok(())
    }

    /// Apply several [`set_env_var`](Self::set_env_var) calls in key order.
    pub async fn set_env_vars(
        &mut self,
        vars: &EnvOverrides,
        overlay: Overlay,
        format: bool,
    ) -> Result<()> {
        for (name, value) in vars {
            self.set_env_var(name, value.as_deref(), overlay, format)
                .await?;
        }
        Ok(())
    }

    /// A copy of the requested overlay.
    pub fn get_env_vars(&self, overlay: Overlay) -> EnvMap {
        self.overlay(overlay).clone()
    }

    fn overlay(&self, overlay: Overlay) -> &EnvMap {
        match overlay {
            Overlay::Ephemeral => &self.env,
            Overlay::Permanent => &self.env_permanent,
        }
    }

    fn overlay_mut(&mut self, overlay: Overlay) -> &mut EnvMap {
        match overlay {
            Overlay::Ephemeral => &mut self.env,
            Overlay::Permanent => &mut self.env_permanent,
        }
    }

    /// Environment a command on the resource sees, overlays included.
    pub async fn query_env_vars(&self) -> Result<EnvMap> {
        let out = self.run("env -0", None, None, None).await?;
        Ok(env::parse_env_dump(&out.stdout_lossy()))
    }

    /// Source `command` (a script path plus arguments) in a shell and merge
    /// the environment it leaves behind into an overlay.
    ///
    /// With `diff`, only variables that are new or changed relative to the
    /// environment before sourcing are kept. Variables the script unsets are
    /// not reported and stay set in the session.
    ///
    /// Returns the mapping that was merged.
    pub async fn source_script(
        &mut self,
        command: &[String],
        overlay: Overlay,
        diff: bool,
        shell: Option<&str>,
    ) -> Result<EnvMap> {
        if command.is_empty() {
            return Err(anyhow!("source_script needs a script to source").into());
        }

        let baseline = self.query_env_vars().await?;
        let shell = match shell {
            Some(shell) => shell.to_string(),
            None => baseline.get("SHELL").cloned().unwrap_or_else(|| {
                // Some activation scripts only work under bash.
                let default = if command.len() > 1 { "/bin/bash" } else { "/bin/sh" };
                default.to_string()
            }),
        };

        let marker = format!("jobhop-source-marker-{}", Uuid::new_v4().simple());
        let inner = format!(
            ". {}; echo {}; env -0",
            quote::join(command),
            quote(&marker)
        );
        let full = format!("{} -c {}", quote(&shell), quote(&inner));

        info!(shell = %shell, script = %command.join(" "), "sourcing script");
        let out = self.run(&full, None, None, None).await?;
        if !out.stderr.is_empty() {
            debug!(stderr = %out.stderr_lossy().trim_end(), "sourced script wrote to stderr");
        }

        let stdout = out.stdout_lossy();
        let dump = env::after_marker(&stdout, &marker).ok_or_else(|| {
            anyhow!("sourcing {:?} produced no environment dump", command.join(" "))
        })?;

        let mut sourced = env::parse_env_dump(dump);
        env::strip_shell_noise(&mut sourced, &shell);
        env::retain_exportable(&mut sourced);
        if diff {
            sourced = env::changed_since(sourced, &baseline);
        }

        if sourced.is_empty() {
            warn!(script = %command.join(" "), "sourced script changed no variables");
        }

        self.overlay_mut(overlay)
            .extend(sourced.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(sourced)
    }
}

fn check_name(name: &str) -> Result<()> {
    if env::is_valid_name(name) {
        Ok(())
    } else {
        Err(JobhopError::ConfigError(format!(
            "invalid environment variable name {name:?}"
        )))
    }
}
