//! Spawning the extractor and capturing what it printed.
//!
//! [`Launcher`] is the seam between the request pipeline and the operating
//! system. Production uses [`SystemLauncher`]; tests swap in fakes that record
//! invocations and replay canned results.

use std::{io, path::Path, process::Stdio};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::command::Invocation;

/// 50 MiB, large enough for playlist and comment dumps.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 50 * 1024 * 1024;

/// Exit code shells use for "command not found".
const COMMAND_NOT_FOUND_EXIT: i32 = 127;

/// Outcome of a process that was started and ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessResult {
    /// `None` when the process died from a signal.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Set when the process was terminated by a signal or by us for
    /// overrunning the output cap.
    pub killed: bool,
}

impl ProcessResult {
    pub fn succeeded(&self) -> bool {
        !self.killed && self.exit_code == Some(0)
    }

    pub fn command_not_found(&self) -> bool {
        self.exit_code == Some(COMMAND_NOT_FOUND_EXIT)
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// The process never produced a [`ProcessResult`].
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to start {program}: {source}")]
    Spawn { program: String, source: io::Error },
    #[error("failed while running {program}: {source}")]
    Io { program: String, source: io::Error },
}

impl LaunchError {
    /// True when the executable does not exist at the configured path.
    pub fn is_missing_executable(&self) -> bool {
        matches!(self, Self::Spawn { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, invocation: &Invocation) -> Result<ProcessResult, LaunchError>;
}

/// Runs the extractor as a real child process.
#[derive(Debug, Clone)]
pub struct SystemLauncher {
    max_output_bytes: usize,
}

impl SystemLauncher {
    pub fn new(max_output_bytes: usize) -> Self {
        Self { max_output_bytes }
    }

    pub fn max_output_bytes(&self) -> usize {
        self.max_output_bytes
    }
}

impl Default for SystemLauncher {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OUTPUT_BYTES)
    }
}

#[async_trait]
impl Launcher for SystemLauncher {
    async fn launch(&self, invocation: &Invocation) -> Result<ProcessResult, LaunchError> {
        let program = invocation.program.display().to_string();
        let io_error = |source: io::Error| LaunchError::Io {
            program: program.clone(),
            source,
        };

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io_error(io::Error::other("stdout was not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io_error(io::Error::other("stderr was not captured")))?;

        // stderr is drained on its own task so a chatty process can never
        // block on a full pipe while we wait on stdout.
        let limit = self.max_output_bytes;
        let stderr_task = tokio::spawn(read_draining(stderr, limit));

        let captured = read_capped(stdout, limit).await.map_err(io_error)?;
        let overflowed = captured.len() > limit;
        if overflowed {
            tracing::warn!(
                program = %program,
                limit,
                "extractor output exceeded cap, killing process"
            );
            // The child may already be gone; wait() below reports either way.
            let _ = child.start_kill();
        }

        let status = child.wait().await.map_err(io_error)?;
        let stderr = match stderr_task.await {
            Ok(result) => result.map_err(io_error)?,
            Err(join) => return Err(io_error(io::Error::other(join.to_string()))),
        };

        let mut stdout = captured;
        stdout.truncate(limit);
        Ok(ProcessResult {
            exit_code: status.code(),
            stdout,
            stderr,
            killed: overflowed || terminated_by_signal(&status),
        })
    }
}

/// Reads up to `limit + 1` bytes so the caller can tell an exact fit from an
/// overrun.
async fn read_capped<R>(reader: R, limit: usize) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader
        .take(limit as u64 + 1)
        .read_to_end(&mut buf)
        .await?;
    Ok(buf)
}

/// Keeps the first `limit` bytes and discards the rest until EOF.
async fn read_draining<R>(mut reader: R, limit: usize) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    (&mut reader).take(limit as u64).read_to_end(&mut buf).await?;
    tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok(buf)
}

#[cfg(unix)]
fn terminated_by_signal(status: &std::process::ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal().is_some()
}

#[cfg(not(unix))]
fn terminated_by_signal(_status: &std::process::ExitStatus) -> bool {
    false
}

/// Runs `<program> --version` through the launcher and returns the trimmed
/// version string.
pub async fn probe_version(launcher: &dyn Launcher, program: &Path) -> Result<String> {
    let invocation = Invocation::version_probe(program);
    let result = launcher.launch(&invocation).await?;
    if !result.succeeded() {
        let stderr = result.stderr_text();
        return Err(anyhow!(
            "{} exited with {:?}: {}",
            invocation.command_line(),
            result.exit_code,
            stderr.trim()
        ));
    }
    Ok(result.stdout_text().trim().to_string())
}
