// src/session/ssh.rs

//! Transport that reaches a remote host through the system `ssh` client.

use tokio::process::Command;

use super::local::run_process;
use super::quote::quote;
use super::transport::{BoxFuture, CommandOutput, Transport};
use crate::errors::Result;

/// Runs commands as `ssh [opts] [user@]host sh -c '<command>'`.
///
/// Authentication is left to the client (agent, config, or `key_filename`);
/// `BatchMode` keeps it from ever prompting.
#[derive(Debug, Clone)]
pub struct SshTransport {
    host: String,
    port: Option<u16>,
    user: Option<String>,
    key_filename: Option<String>,
}

impl SshTransport {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            user: None,
            key_filename: None,
        }
    }

    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    pub fn with_user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    pub fn with_key_filename(mut self, key_filename: Option<String>) -> Self {
        self.key_filename = key_filename;
        self
    }

    /// `user@host`, or just `host`.
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        }
    }

    /// Arguments passed to `ssh` for `command`.
    pub fn ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = vec!["-o".to_string(), "BatchMode=yes".to_string()];
        if let Some(port) = self.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        if let Some(key) = &self.key_filename {
            args.push("-i".to_string());
            args.push(key.clone());
        }
        args.push(self.destination());
        // The remote login shell re-parses what we send, so ship one quoted
        // word for `sh -c`.
        args.push(format!("sh -c {}", quote(command)));
        args
    }
}

impl Transport for SshTransport {
    fn kind(&self) -> &'static str {
        "ssh"
    }

    fn execute<'a>(
        &'a self,
        command: &'a str,
        stdin: Option<&'a [u8]>,
    ) -> BoxFuture<'a, Result<CommandOutput>> {
        Box::pin(async move {
            let mut cmd = Command::new("ssh");
            cmd.args(self.ssh_args(command));
            run_process(cmd, stdin).await
        })
    }
}
