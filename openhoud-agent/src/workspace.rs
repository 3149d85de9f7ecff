//! Root-confined filesystem and shell tools
//!
//! Every path is resolved lexically against the workspace root before any
//! filesystem access; a path that climbs out of the root fails with
//! `OutOfRoot` and nothing is touched. Symlinks inside the root are not
//! chased.

use crate::tools::{truncate, Limits, Toolbox};
use openhoud_error::{Error, ErrorKind, Result};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use walkdir::WalkDir;

/// Immutable workspace settings, built once at startup
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    pub root: PathBuf,
    pub limits: Limits,
    /// Upper bound for a `RUN` command; `None` waits indefinitely
    pub run_timeout: Option<Duration>,
}

impl WorkspaceConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            limits: Limits::default(),
            run_timeout: Some(Duration::from_secs(120)),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }
}

/// The confined local repository the agent works in
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    limits: Limits,
    run_timeout: Option<Duration>,
}

impl Workspace {
    pub fn new(config: WorkspaceConfig) -> Result<Self> {
        let root = std::fs::canonicalize(&config.root).map_err(|e| {
            Error::config_invalid(format!("cannot resolve workspace root {}", config.root.display()))
                .with_operation("workspace::new")
                .set_source(e)
        })?;
        if !root.is_dir() {
            return Err(Error::config_invalid(format!(
                "workspace root {} is not a directory",
                root.display()
            ))
            .with_operation("workspace::new"));
        }

        Ok(Self {
            root,
            limits: config.limits,
            run_timeout: config.run_timeout,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `requested` against the root without touching the filesystem
    pub fn resolve(&self, requested: &str) -> Result<PathBuf> {
        let requested_path = Path::new(requested);
        let mut resolved = if requested_path.is_absolute() {
            PathBuf::new()
        } else {
            self.root.clone()
        };

        for component in requested_path.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    resolved.pop();
                }
                other => resolved.push(other.as_os_str()),
            }
        }

        if !resolved.starts_with(&self.root) {
            return Err(Error::out_of_root(requested).with_context("root", self.root.display().to_string()));
        }
        Ok(resolved)
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }
}

/// `dir/name` with `dir` already folded to its root-relative form
fn display_join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

impl Toolbox for Workspace {
    async fn list(&self, dir: &str) -> Result<String> {
        let abs = self.resolve(dir).map_err(|e| e.with_operation("workspace::list"))?;
        let mut reader = tokio::fs::read_dir(&abs)
            .await
            .map_err(|e| Error::from(e).with_operation("workspace::list").with_context("dir", dir))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| Error::from(e).with_operation("workspace::list"))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            entries.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
        }
        entries.sort();

        let prefix = self.relative(&abs);
        Ok(entries
            .iter()
            .map(|(name, is_dir)| {
                let icon = if *is_dir { "📁" } else { "📄" };
                format!("{} {}", icon, display_join(&prefix, name))
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn read(&self, path: &str) -> Result<String> {
        let abs = self.resolve(path).map_err(|e| e.with_operation("workspace::read"))?;
        let bytes = tokio::fs::read(&abs).await.map_err(|e| {
            let err = Error::from(e).with_operation("workspace::read");
            if err.kind() == ErrorKind::FileNotFound {
                Error::file_not_found(path).with_operation("workspace::read")
            } else {
                err.with_context("path", path)
            }
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn write(&self, path: &str, content: &str, allow_write: bool) -> Result<String> {
        let abs = self.resolve(path).map_err(|e| e.with_operation("workspace::write"))?;
        if !allow_write {
            return Ok(format!("DRY-RUN: Would write {} (run with --write to enable).", path));
        }
        if abs == self.root {
            return Err(Error::invalid_argument("cannot write to the workspace root")
                .with_operation("workspace::write"));
        }

        let io_err = |e: std::io::Error| Error::from(e).with_operation("workspace::write").with_context("path", path);

        if let Some(parent) = abs.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let backed_up = if tokio::fs::try_exists(&abs).await.map_err(io_err)? {
            tokio::fs::copy(&abs, backup_path(&abs)).await.map_err(io_err)?;
            true
        } else {
            false
        };

        tokio::fs::write(&abs, content).await.map_err(io_err)?;
        debug!(path, bytes = content.len(), backed_up, "wrote file");

        let mut message = format!("WROTE {} ({} bytes).", path, content.len());
        if backed_up {
            message.push_str(&format!(" Backup: {}.bak.", path));
        }
        Ok(message)
    }

    async fn grep(&self, pattern: &str, dir: &str) -> Result<String> {
        let abs = self.resolve(dir).map_err(|e| e.with_operation("workspace::grep"))?;
        tokio::fs::metadata(&abs)
            .await
            .map_err(|e| Error::from(e).with_operation("workspace::grep").with_context("dir", dir))?;

        let needle = pattern.to_string();
        let files = tokio::task::spawn_blocking(move || {
            WalkDir::new(&abs)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        debug!(error = %err, "grep skipped entry");
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| {
                    std::fs::read(entry.path())
                        .map(|bytes| String::from_utf8_lossy(&bytes).contains(needle.as_str()))
                        .unwrap_or(false)
                })
                .map(|entry| entry.into_path())
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| Error::unexpected("grep worker failed").with_operation("workspace::grep").set_source(e))?;

        if files.is_empty() {
            return Ok("(no matches)".to_string());
        }
        Ok(files
            .iter()
            .map(|file| self.relative(file))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn run(&self, command: &str, allow_run: bool) -> Result<String> {
        if !allow_run {
            return Ok(format!("DRY-RUN: Would run '{}' (use --run to enable).", command));
        }

        let child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.root)
            .kill_on_drop(true)
            .output();

        let output = match self.run_timeout {
            Some(limit) => tokio::time::timeout(limit, child)
                .await
                .map_err(|_| Error::command_timeout(command, limit.as_secs()).with_operation("workspace::run"))?,
            None => child.await,
        }
        .map_err(|e| {
            Error::command_failed(command, "failed to launch shell command")
                .with_operation("workspace::run")
                .set_source(e)
        })?;

        let limit = self.limits.run_output_chars;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(Error::command_failed(
                command,
                format!("Command failed: {} ({})\n{}", command, output.status, truncate(&detail, limit)),
            )
            .with_operation("workspace::run"));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(truncate(&stdout, limit).into_owned())
    }
}
