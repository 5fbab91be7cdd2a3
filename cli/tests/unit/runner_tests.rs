//! TokioCommandRunner: capture, exit codes, and deadline kills.

use std::time::{Duration, Instant};

use loom_cli::command_runner::{CommandRunner, TokioCommandRunner};

#[tokio::test]
async fn captures_stdout_stderr_and_status() {
    let result = TokioCommandRunner
        .run("sh", &["-c", "echo out; echo err >&2"], Duration::from_secs(5))
        .await
        .expect("run");
    assert!(result.success());
    assert!(!result.timed_out);
    assert_eq!(result.stdout_text().trim(), "out");
    assert_eq!(result.stderr_text().trim(), "err");
}

#[tokio::test]
async fn nonzero_exit_is_reported_not_timed_out() {
    let result = TokioCommandRunner
        .run("sh", &["-c", "exit 3"], Duration::from_secs(5))
        .await
        .expect("run");
    assert!(!result.success());
    assert!(!result.timed_out);
    assert_eq!(result.status.and_then(|s| s.code()), Some(3));
}

#[tokio::test]
async fn deadline_kills_the_process() {
    let started = Instant::now();
    let result = TokioCommandRunner
        .run("sh", &["-c", "sleep 30"], Duration::from_millis(200))
        .await
        .expect("run");
    assert!(result.timed_out);
    assert!(result.status.is_none());
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn output_written_before_the_deadline_survives_the_kill() {
    let result = TokioCommandRunner
        .run(
            "sh",
            &["-c", "echo early; sleep 30"],
            Duration::from_millis(300),
        )
        .await
        .expect("run");
    assert!(result.timed_out);
    assert!(result.stdout_text().contains("early"));
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() {
    let result = TokioCommandRunner
        .run("loom-test-no-such-binary", &[], Duration::from_secs(1))
        .await;
    assert!(result.is_err());
}
