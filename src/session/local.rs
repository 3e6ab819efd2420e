// src/session/local.rs

//! Transport that runs commands on the invoking host.

use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::Context;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::transport::{BoxFuture, CommandOutput, Transport};
use crate::errors::Result;

/// Runs every command through `sh -c` on this machine.
#[derive(Debug, Clone, Default)]
pub struct LocalTransport;

impl LocalTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for LocalTransport {
    fn kind(&self) -> &'static str {
        "shell"
    }

    fn execute<'a>(
        &'a self,
        command: &'a str,
        stdin: Option<&'a [u8]>,
    ) -> BoxFuture<'a, Result<CommandOutput>> {
        Box::pin(async move {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            run_process(cmd, stdin).await
        })
    }

    fn put_file<'a>(&'a self, src: &'a Path, dest: &'a str) -> Option<BoxFuture<'a, Result<()>>> {
        Some(Box::pin(copy_file(src.to_path_buf(), PathBuf::from(dest))))
    }

    fn get_file<'a>(&'a self, src: &'a str, dest: &'a Path) -> Option<BoxFuture<'a, Result<()>>> {
        Some(Box::pin(copy_file(PathBuf::from(src), dest.to_path_buf())))
    }
}

async fn copy_file(src: PathBuf, dest: PathBuf) -> Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating dir {:?}", parent))?;
    }
    tokio::fs::copy(&src, &dest)
        .await
        .with_context(|| format!("copying {:?} to {:?}", src, dest))?;
    Ok(())
}

/// Spawn `cmd`, feed it `stdin` (if any), and collect its output.
///
/// Shared by every transport that shells out to a local client binary.
pub(crate) async fn run_process(mut cmd: Command, stdin: Option<&[u8]>) -> Result<CommandOutput> {
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning {:?}", cmd.as_std().get_program()))?;

    // Write stdin from its own task so a chatty child can't deadlock us on a
    // full stdout pipe.
    let writer = match (stdin, child.stdin.take()) {
        (Some(data), Some(mut pipe)) => {
            let data = data.to_vec();
            Some(tokio::spawn(async move {
                let res = pipe.write_all(&data).await;
                drop(pipe);
                res
            }))
        }
        _ => None,
    };

    let output = child
        .wait_with_output()
        .await
        .context("waiting for command to finish")?;

    if let Some(writer) = writer {
        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "failed to write command stdin"),
            Err(e) => warn!(error = %e, "stdin writer task failed"),
        }
    }

    let exit_code = output
        .status
        .code()
        .or_else(|| output.status.signal().map(|sig| 128 + sig));

    debug!(exit_code = ?exit_code, "command finished");

    Ok(CommandOutput {
        stdout: output.stdout,
        stderr: output.stderr,
        exit_code,
    })
}
