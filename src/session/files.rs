// src/session/files.rs

//! File and metadata operations built from plain POSIX commands.
//!
//! Only `test`, `mkdir`, `chmod`, `chown`, `cat`, `mktemp`, `stat` and `find`
//! are assumed on the resource, so any transport that can run a shell gets
//! these for free. Transports with a faster native transfer override single
//! file `put`/`get` (see [`Transport::put_file`](super::Transport::put_file)).

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use tracing::debug;

use super::quote::quote;
use super::Session;
use crate::errors::{JobhopError, Result};

/// Parent directory of a POSIX path, if it has one worth creating.
fn remote_parent(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => None,
        Some(idx) => Some(&trimmed[..idx]),
    }
}

impl Session {
    /// Run a `test` style command: exit 0 → `true`, exit 1 → `false`.
    async fn check(&self, command: &str) -> Result<bool> {
        match self.run(command, None, None, None).await {
            Ok(_) => Ok(true),
            Err(JobhopError::Command(e)) if e.exit_code == Some(1) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn exists(&self, path: &str) -> Result<bool> {
        self.check(&format!("test -e {}", quote(path))).await
    }

    pub async fn isdir(&self, path: &str) -> Result<bool> {
        self.check(&format!("test -d {}", quote(path))).await
    }

    /// Create `path` and any missing parents. Existing directories are fine.
    pub async fn mkdir(&self, path: &str) -> Result<()> {
        self.run(&format!("mkdir -p {}", quote(path)), None, None, None)
            .await?;
        Ok(())
    }

    /// Create a fresh temporary directory on the resource and return its path.
    pub async fn mktmpdir(&self) -> Result<String> {
        let out = self.run("mktemp -d", None, None, None).await?;
        let path = out.stdout_lossy().trim().to_string();
        if path.is_empty() {
            return Err(anyhow!("mktemp -d printed no path").into());
        }
        Ok(path)
    }

    /// Contents of a file on the resource.
    pub async fn read(&self, path: &str) -> Result<String> {
        let out = self.run(&format!("cat {}", quote(path)), None, None, None)
            .await?;
        Ok(out.stdout_lossy())
    }

    /// Write `contents` to `path` on the resource, creating parent
    /// directories as needed.
    pub async fn write(&self, path: &str, contents: &[u8]) -> Result<()> {
        if let Some(parent) = remote_parent(path) {
            self.mkdir(parent).await?;
        }
        self.run(&format!("cat > {}", quote(path)), None, None, Some(contents))
            .await?;
        Ok(())
    }

    pub async fn chmod(&self, path: &str, mode: u32) -> Result<()> {
        self.run(&format!("chmod {:o} {}", mode, quote(path)), None, None, None)
            .await?;
        Ok(())
    }

    /// `owner` is anything `chown` accepts (`user`, `user:group`, `uid:gid`).
    pub async fn chown(&self, path: &str, owner: &str) -> Result<()> {
        self.run(
            &format!("chown {} {}", quote(owner), quote(path)),
            None,
            None,
            None,
        )
        .await?;
        Ok(())
    }

    /// Modification time in seconds since the epoch.
    pub async fn get_mtime(&self, path: &str) -> Result<i64> {
        let p = quote(path);
        // GNU stat first, BSD stat as fallback.
        let out = self
            .run(
                &format!("stat -c %Y {p} 2>/dev/null || stat -f %m {p}"),
                None,
                None,
                None,
            )
            .await?;
        let text = out.stdout_lossy();
        text.trim()
            .parse::<i64>()
            .map_err(|e| anyhow!("unexpected stat output {:?} for {}: {}", text.trim(), path, e).into())
    }

    /// Upload a local file or directory tree to `dest` on the resource.
    pub async fn put(&self, src: &Path, dest: &str) -> Result<()> {
        let meta = tokio::fs::metadata(src)
            .await
            .with_context(|| format!("reading metadata of {:?}", src))?;
        if !meta.is_dir() {
            return self.put_file(src, dest).await;
        }

        // Walk the tree without recursion: (local dir, remote dir) pairs.
        let mut pending = vec![(src.to_path_buf(), dest.trim_end_matches('/').to_string())];
        while let Some((dir, remote)) = pending.pop() {
            self.mkdir(&remote).await?;
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .with_context(|| format!("reading dir {:?}", dir))?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                let target = format!("{remote}/{name}");
                if entry.file_type().await?.is_dir() {
                    pending.push((entry.path(), target));
                } else {
                    self.put_file(&entry.path(), &target).await?;
                }
            }
        }
        Ok(())
    }

    async fn put_file(&self, src: &Path, dest: &str) -> Result<()> {
        debug!(src = ?src, dest = %dest, "uploading file");
        if let Some(parent) = remote_parent(dest) {
            self.mkdir(parent).await?;
        }
        if let Some(native) = self.transport.put_file(src, dest) {
            return native.await;
        }
        let contents = tokio::fs::read(src)
            .await
            .with_context(|| format!("reading {:?}", src))?;
        self.write(dest, &contents).await?;
        let mode = tokio::fs::metadata(src).await?.permissions().mode() & 0o777;
        self.chmod(dest, mode).await
    }

    /// Download `src` (a file or a directory tree) from the resource to the
    /// local path `dest`.
    pub async fn get(&self, src: &str, dest: &Path) -> Result<()> {
        if !self.isdir(src).await? {
            return self.get_file(src, dest).await;
        }

        let root = src.trim_end_matches('/');
        let out = self
            .run(&format!("find {} -type f -print0", quote(root)), None, None, None)
            .await?;
        tokio::fs::create_dir_all(dest)
            .await
            .with_context(|| format!("creating dir {:?}", dest))?;
        for file in out.stdout_lossy().split('\0').filter(|f| !f.is_empty()) {
            let rel = file
                .strip_prefix(root)
                .map(|r| r.trim_start_matches('/'))
                .ok_or_else(|| anyhow!("find returned {:?} outside of {:?}", file, root))?;
            let target: PathBuf = dest.join(rel);
            self.get_file(file, &target).await?;
        }
        Ok(())
    }

    async fn get_file(&self, src: &str, dest: &Path) -> Result<()> {
        debug!(src = %src, dest = ?dest, "downloading file");
        if let Some(native) = self.transport.get_file(src, dest) {
            return native.await;
        }
        let out = self.run(&format!("cat {}", quote(src)), None, None, None)
            .await?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating dir {:?}", parent))?;
        }
        tokio::fs::write(dest, &out.stdout)
            .await
            .with_context(|| format!("writing {:?}", dest))?;
        Ok(())
    }
}
