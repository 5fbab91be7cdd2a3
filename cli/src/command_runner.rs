//! Subprocess execution with a hard deadline.
//!
//! The trait is not tied to pip or python — it can run any external command.
//! The production implementation uses tokio; test doubles return canned
//! results without spawning processes.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tokio::process::{ChildStderr, ChildStdout};

/// Result of one deadline-bound run.
///
/// `status` is `None` exactly when `timed_out` is true: the deadline fired
/// and the process was killed before exiting on its own. Output captured up
/// to that point is still available — callers decide whether a kill counts
/// as failure.
#[derive(Debug)]
pub struct RunResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status: Option<ExitStatus>,
    pub timed_out: bool,
}

impl RunResult {
    /// True when the process ran to completion with a zero exit status.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status.is_some_and(|s| s.success())
    }

    #[must_use]
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    #[must_use]
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Deadline-bound command execution, abstracted for test doubles.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run `program` with `args`, killing it when `deadline` elapses.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or waited on. A
    /// deadline kill is NOT an error — it is reported via
    /// [`RunResult::timed_out`].
    async fn run(&self, program: &str, args: &[&str], deadline: Duration) -> Result<RunResult>;
}

/// Production `CommandRunner` — tokio process execution with guaranteed
/// kill on all platforms.
///
/// `tokio::time::timeout` around `.output().await` does NOT kill the child
/// when the timeout fires on Windows — the future is dropped but the OS
/// process keeps running. This implementation uses `tokio::select!` with an
/// explicit `child.kill()` to guarantee termination, then drains whatever
/// the process wrote before it died.
pub struct TokioCommandRunner;

/// Spawned drain task: reads a pipe to EOF. The pipe closes when the child
/// exits or is killed, so these tasks always finish after the select below.
fn drain_stdout(handle: Option<ChildStdout>) -> tokio::task::JoinHandle<Vec<u8>> {
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut h) = handle {
            let _ = h.read_to_end(&mut buf).await;
        }
        buf
    })
}

fn drain_stderr(handle: Option<ChildStderr>) -> tokio::task::JoinHandle<Vec<u8>> {
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut h) = handle {
            let _ = h.read_to_end(&mut buf).await;
        }
        buf
    })
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str], deadline: Duration) -> Result<RunResult> {
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        // Drain stdout/stderr CONCURRENTLY with wait() to avoid pipe
        // deadlock: a child writing more than the OS pipe buffer (64KB
        // Linux, 4KB some Windows configs) blocks on write until we read.
        let stdout_task = drain_stdout(child.stdout.take());
        let stderr_task = drain_stderr(child.stderr.take());

        let (status, timed_out) = tokio::select! {
            status = child.wait() => {
                let status = status.with_context(|| format!("waiting for {program}"))?;
                (Some(status), false)
            }
            () = tokio::time::sleep(deadline) => {
                let _ = child.kill().await;
                (None, true)
            }
        };

        // Kill (or exit) closed the pipes; the drain tasks are done or about
        // to be. Await them to collect partial output.
        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        Ok(RunResult {
            stdout,
            stderr,
            status,
            timed_out,
        })
    }
}
