// src/session/transport.rs

//! Pluggable transport abstraction.
//!
//! A [`Session`](super::Session) talks to its resource through a `Transport`
//! instead of spawning processes itself. A new backend only has to know how
//! to run one shell command line (optionally feeding it stdin); everything
//! else the session offers (environment overlays, `source_script`, file
//! operations) is built on top of that.
//!
//! - [`LocalTransport`](super::LocalTransport) runs commands on this host and
//!   overrides `put`/`get` with plain file copies.
//! - [`SshTransport`](super::SshTransport) runs commands through the system
//!   `ssh` client and relies on the generic `cat` based transfer.
//! - Tests provide their own `Transport` that answers from a script.

use std::fmt::Debug;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::errors::Result;

/// Boxed future returned by transport methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Raw result of one command on a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the backend cannot tell.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: Vec::new(),
            exit_code: Some(0),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: stderr.into(),
            exit_code: Some(exit_code),
        }
    }

    /// A non-zero exit code. A missing exit code is not a failure.
    pub fn failed(&self) -> bool {
        matches!(self.exit_code, Some(code) if code != 0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Trait abstracting how commands reach a resource.
pub trait Transport: Send + Sync + Debug {
    /// Short backend name, used in logs.
    fn kind(&self) -> &'static str;

    /// Run `command` through a POSIX shell on the resource.
    ///
    /// Must not treat a non-zero exit as an error; the session decides that.
    fn execute<'a>(
        &'a self,
        command: &'a str,
        stdin: Option<&'a [u8]>,
    ) -> BoxFuture<'a, Result<CommandOutput>>;

    /// Called once before the session is used.
    fn open(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Called when the session is done; must be safe to call more than once.
    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Native upload of a single local file. `None` means "use the generic
    /// shell implementation".
    fn put_file<'a>(
        &'a self,
        _src: &'a Path,
        _dest: &'a str,
    ) -> Option<BoxFuture<'a, Result<()>>> {
        None
    }

    /// Native download of a single remote file. `None` means "use the
    /// generic shell implementation".
    fn get_file<'a>(
        &'a self,
        _src: &'a str,
        _dest: &'a Path,
    ) -> Option<BoxFuture<'a, Result<()>>> {
        None
    }
}
