//! Child process runner
//!
//! Spawns the assembler with piped stdout/stderr and resolves once both
//! streams reached end-of-stream and the process reported its exit.

use crate::types::*;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs an external executable to completion.
///
/// Implemented by [`CommandRunner`] for real processes; tests substitute
/// their own implementation to observe invocations.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `executable` with `args` passed verbatim (no shell).
    async fn run(&self, executable: &str, args: &[String]) -> Result<AssemblerResult, RunnerError>;
}

/// Tokio-backed process runner
pub struct CommandRunner {
    /// Kill the child and fail after this long (default: wait forever)
    timeout: Option<Duration>,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner {
    /// Create a runner without a timeout
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Create a runner that kills the child after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

#[async_trait]
impl ProcessRunner for CommandRunner {
    async fn run(&self, executable: &str, args: &[String]) -> Result<AssemblerResult, RunnerError> {
        let mut cmd = Command::new(executable);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(%executable, ?args, "Starting assembler");

        let mut child = cmd.spawn().map_err(|source| RunnerError::Spawn {
            executable: executable.to_string(),
            source,
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("Failed to capture stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("Failed to capture stderr"))?;

        // Both streams and the exit status must all complete before the
        // result is built, otherwise output can be truncated.
        let collect = async {
            tokio::try_join!(drain(stdout), drain(stderr), child.wait())
        };

        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, collect).await.map_err(|_| limit),
            None => Ok(collect.await),
        };

        let (stdout, stderr, status) = match outcome {
            Ok(collected) => collected?,
            Err(limit) => {
                warn!(%executable, ?limit, "Assembler timed out, killing process");
                if let Err(e) = child.kill().await {
                    warn!(?e, "Failed to kill assembler process");
                }
                return Err(RunnerError::Timeout(limit));
            }
        };

        // No exit code means the process was terminated by a signal.
        let code = status.code().unwrap_or(0);
        debug!(%executable, ?status, code, "Assembler exited");

        Ok(AssemblerResult::from_streams(
            code,
            String::from_utf8_lossy(&stdout).into_owned(),
            String::from_utf8_lossy(&stderr).into_owned(),
        ))
    }
}

/// Read a stream until EOF.
async fn drain<R: AsyncRead + Unpin>(mut stream: R) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    Ok(buf)
}
