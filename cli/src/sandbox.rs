//! Local smoke-test execution of the handler script.
//!
//! The handler is expected to hang waiting for the orchestration runtime
//! that is not present locally, and its third-party imports may only exist
//! in the remote runtime. Both conditions are therefore classified as
//! success — evidence the script started correctly — not as failures.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

use crate::command_runner::{CommandRunner, RunResult};
use crate::output::OutputContext;
use crate::validate::AppLayout;

/// Python package providing the app runtime SDK.
pub const SDK_PACKAGE: &str = "loom-app-sdk";
/// Import name the current SDK exposes.
const SDK_IMPORT: &str = "loom_app_sdk";
/// Import name used by apps written against the pre-rename SDK.
const LEGACY_IMPORT: &str = "weave_app_sdk";

/// Hard wall-clock deadline for the handler run.
pub const HANDLER_DEADLINE: Duration = Duration::from_secs(5);
/// Ceiling for pip installs; hitting it IS a failure, unlike the handler
/// deadline.
const INSTALL_DEADLINE: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("dependency install failed ({step}): {detail}")]
    DependencyInstall { step: &'static str, detail: String },

    #[error("handler execution failed: {detail}")]
    ExecutionFailed { detail: String },

    #[error("cannot stage handler copy: {0}")]
    Stage(#[source] std::io::Error),
}

/// Captured result of one handler run.
#[derive(Debug)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub status: Option<ExitStatus>,
}

impl From<RunResult> for ExecutionOutcome {
    fn from(result: RunResult) -> Self {
        Self {
            stdout: result.stdout_text(),
            stderr: result.stderr_text(),
            timed_out: result.timed_out,
            status: result.status,
        }
    }
}

/// How one captured output line is surfaced to the developer. Purely
/// cosmetic — never feeds into success/failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Contains a traceback marker — surfaced as an error.
    Error,
    /// Install noise or structured log output — dropped.
    Suppressed,
    /// Echoed verbatim.
    Echo,
}

#[must_use]
pub fn classify_line(line: &str) -> LineClass {
    if line.contains("Traceback") {
        return LineClass::Error;
    }
    let trimmed = line.trim_start();
    if line.contains("Requirement already satisfied")
        || ["[DEBUG]", "[INFO]", "[WARNING]", "[ERROR]"]
            .iter()
            .any(|prefix| trimmed.starts_with(prefix))
    {
        return LineClass::Suppressed;
    }
    LineClass::Echo
}

/// Decide whether an outcome counts as a real failure.
///
/// Clean exits pass. Deadline kills pass (the handler blocked on the absent
/// runtime, which means it started). `ModuleNotFoundError` passes (the
/// dependency may only exist remotely). Everything else is fatal.
///
/// # Errors
///
/// Returns [`SandboxError::ExecutionFailed`] for any other non-zero exit.
pub fn classify_outcome(outcome: &ExecutionOutcome) -> Result<(), SandboxError> {
    if outcome.timed_out {
        return Ok(());
    }
    match outcome.status {
        Some(status) if status.success() => Ok(()),
        _ if outcome.stderr.contains("ModuleNotFoundError") => Ok(()),
        Some(status) => Err(SandboxError::ExecutionFailed {
            detail: format!("{status}; stderr: {}", tail(&outcome.stderr)),
        }),
        None => Err(SandboxError::ExecutionFailed {
            detail: "process terminated without an exit status".to_string(),
        }),
    }
}

/// Write a patched working copy of the handler into `workdir`, rewriting
/// the legacy SDK import to the current one. No other content changes; the
/// original file is never touched.
///
/// # Errors
///
/// Returns [`SandboxError::Stage`] on any filesystem failure.
pub fn stage_handler(handler: &Path, workdir: &Path) -> Result<PathBuf, SandboxError> {
    let source = std::fs::read_to_string(handler).map_err(SandboxError::Stage)?;
    let patched = source.replace(LEGACY_IMPORT, SDK_IMPORT);
    std::fs::create_dir_all(workdir).map_err(SandboxError::Stage)?;
    let copy = workdir.join("app_run.py");
    std::fs::write(&copy, patched).map_err(SandboxError::Stage)?;
    Ok(copy)
}

/// Time-bounded local execution of an app's handler.
pub struct HandlerSandbox<R> {
    runner: R,
    workdir: PathBuf,
    deadline: Duration,
}

impl<R: CommandRunner> HandlerSandbox<R> {
    pub fn new(runner: R, workdir: PathBuf) -> Self {
        Self {
            runner,
            workdir,
            deadline: HANDLER_DEADLINE,
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Run the full sandbox sequence: ensure the SDK, install the app's
    /// requirements, stage a patched copy, execute it under the deadline,
    /// classify.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::DependencyInstall`] if either pip step
    /// fails, [`SandboxError::ExecutionFailed`] for a real handler failure.
    pub async fn run(
        &self,
        layout: &AppLayout,
        out: &OutputContext,
    ) -> Result<ExecutionOutcome, SandboxError> {
        out.info(&format!("ensuring {SDK_PACKAGE} is up to date"));
        let result = self
            .pip(
                "sdk",
                &["install", "--upgrade", SDK_PACKAGE, "--break-system-packages"],
                out,
            )
            .await?;
        check_install("sdk", &result)?;

        let requirements = layout.requirements.to_string_lossy().into_owned();
        out.info("installing handler requirements");
        let result = self
            .pip(
                "requirements",
                &[
                    "install",
                    "-r",
                    requirements.as_str(),
                    "--break-system-packages",
                ],
                out,
            )
            .await?;
        check_install("requirements", &result)?;

        let copy = stage_handler(&layout.handler, &self.workdir)?;
        out.info(&format!("running {}", copy.display()));
        let program = copy.to_string_lossy().into_owned();
        let result = self
            .runner
            .run("python3", &[program.as_str()], self.deadline)
            .await
            .map_err(|e| SandboxError::ExecutionFailed {
                detail: e.to_string(),
            })?;

        let outcome = ExecutionOutcome::from(result);
        echo_output(out, &outcome.stdout);
        echo_output(out, &outcome.stderr);
        if outcome.timed_out {
            out.info("handler hit the run deadline while waiting for the runtime (expected)");
        }
        classify_outcome(&outcome)?;
        Ok(outcome)
    }

    async fn pip(
        &self,
        step: &'static str,
        args: &[&str],
        out: &OutputContext,
    ) -> Result<RunResult, SandboxError> {
        let mut full = vec!["-m", "pip"];
        full.extend_from_slice(args);
        let result = self
            .runner
            .run("python3", &full, INSTALL_DEADLINE)
            .await
            .map_err(|e| SandboxError::DependencyInstall {
                step,
                detail: e.to_string(),
            })?;
        echo_output(out, &result.stdout_text());
        echo_output(out, &result.stderr_text());
        Ok(result)
    }
}

fn check_install(step: &'static str, result: &RunResult) -> Result<(), SandboxError> {
    if result.success() {
        return Ok(());
    }
    let detail = if result.timed_out {
        "install timed out".to_string()
    } else {
        tail(&result.stderr_text())
    };
    Err(SandboxError::DependencyInstall { step, detail })
}

fn echo_output(out: &OutputContext, text: &str) {
    for line in text.lines() {
        match classify_line(line) {
            LineClass::Error => out.error(line),
            LineClass::Suppressed => {}
            LineClass::Echo => {
                if !line.trim().is_empty() {
                    out.echo(line);
                }
            }
        }
    }
}

/// Last few lines of a capture, enough context to self-correct without
/// flooding the terminal.
fn tail(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(5);
    lines[start..].join("\n")
}
