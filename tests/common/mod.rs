#![allow(dead_code)]

use std::path::{Path, PathBuf};

use jobhop::errors::Result;
use jobhop::session::{BoxFuture, CommandOutput, LocalTransport, Session, Transport};
use jobhop_test_utils::fake_transport::FakeTransport;
use tempfile::TempDir;

/// Scratch layout for a local job: `<tmp>/local` holds inputs and receives
/// results, `<tmp>/root` is the job root.
pub struct JobDirs {
    pub tmp: TempDir,
    pub local: PathBuf,
    pub root: PathBuf,
}

impl JobDirs {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let local = tmp.path().join("local");
        let root = tmp.path().join("root");
        std::fs::create_dir_all(&local).unwrap();
        Self { tmp, local, root }
    }

    pub fn write_input(&self, name: &str, contents: &str) {
        write_file(&self.local.join(name), contents);
    }

    pub fn root_str(&self) -> String {
        self.root.to_string_lossy().into_owned()
    }
}

pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

/// A session over a scripted transport, plus a handle to inspect it.
pub fn fake_session() -> (Session, FakeTransport) {
    let fake = FakeTransport::new();
    (Session::new(Box::new(fake.clone())), fake)
}

/// Fake whose `env -0` reports exactly `entries`.
pub fn fake_with_env(entries: &[(&str, &str)]) -> (Session, FakeTransport) {
    let (session, fake) = fake_session();
    let dump: String = entries.iter().map(|(k, v)| format!("{k}={v}\0")).collect();
    fake.on("env -0", CommandOutput::success(dump));
    (session, fake)
}

/// Local shell without native file copies, so `put`/`get` go through the
/// generic `cat` based path.
#[derive(Debug, Default)]
pub struct ShellOnly(LocalTransport);

impl Transport for ShellOnly {
    fn kind(&self) -> &'static str {
        "shell-only"
    }

    fn execute<'a>(
        &'a self,
        command: &'a str,
        stdin: Option<&'a [u8]>,
    ) -> BoxFuture<'a, Result<CommandOutput>> {
        self.0.execute(command, stdin)
    }
}
