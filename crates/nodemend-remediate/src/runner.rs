//! Out-of-process command invocation.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use tracing::debug;

use crate::error::RunError;

/// Boxed future returned by [`ProcessRunner::run`].
pub type RunFuture<'a> = Pin<Box<dyn Future<Output = Result<ProcessOutput, RunError>> + Send + 'a>>;

/// Captured result of a finished child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the child was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a command to completion — injected for testability.
pub trait ProcessRunner: Send + Sync {
    /// Run `command[0]` with `command[1..]` as arguments inside `working_dir`.
    fn run<'a>(&'a self, command: &'a [String], working_dir: &'a Path) -> RunFuture<'a>;
}

/// [`ProcessRunner`] backed by `tokio::process`, bounding every child with
/// a timeout. The child is killed if the timeout fires.
#[derive(Debug, Clone)]
pub struct TokioProcessRunner {
    timeout: Duration,
}

impl TokioProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl ProcessRunner for TokioProcessRunner {
    fn run<'a>(&'a self, command: &'a [String], working_dir: &'a Path) -> RunFuture<'a> {
        Box::pin(async move {
            let Some((program, args)) = command.split_first() else {
                return Err(RunError::EmptyCommand);
            };
            // Spawning in a missing directory also fails with NotFound.
            if !working_dir.is_dir() {
                return Err(RunError::Io(format!(
                    "working directory {} does not exist",
                    working_dir.display()
                )));
            }
            debug!(%program, ?args, cwd = %working_dir.display(), "spawning");

            let mut cmd = tokio::process::Command::new(program);
            cmd.args(args)
                .current_dir(working_dir)
                .stdin(Stdio::null())
                .kill_on_drop(true);

            let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
                Err(_) => return Err(RunError::TimedOut(self.timeout)),
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(RunError::NotFound(program.clone()));
                }
                Ok(Err(e)) => return Err(RunError::Io(e.to_string())),
                Ok(Ok(output)) => output,
            };

            Ok(ProcessOutput {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn captures_exit_code_and_both_streams() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TokioProcessRunner::new(Duration::from_secs(10));
        let out = runner
            .run(&sh("echo out; echo err >&2; exit 3"), dir.path())
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(3));
        assert!(!out.success());
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let runner = TokioProcessRunner::new(Duration::from_secs(10));
        let out = runner.run(&sh("ls"), dir.path()).await.unwrap();
        assert!(out.success());
        assert!(out.stdout.contains("marker.txt"));
    }

    #[tokio::test]
    async fn missing_program_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TokioProcessRunner::new(Duration::from_secs(10));
        let cmd = vec!["nodemend-definitely-not-installed".to_string()];
        let err = runner.run(&cmd, dir.path()).await.unwrap_err();
        assert!(matches!(err, RunError::NotFound(p) if p == "nodemend-definitely-not-installed"));
    }

    #[tokio::test]
    async fn missing_working_dir_is_io_not_missing_tool() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("gone");
        let runner = TokioProcessRunner::new(Duration::from_secs(10));
        let err = runner.run(&sh("true"), &gone).await.unwrap_err();
        assert!(matches!(err, RunError::Io(msg) if msg.contains("gone")));
    }

    #[tokio::test]
    async fn slow_child_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TokioProcessRunner::new(Duration::from_millis(100));
        let err = runner.run(&sh("sleep 5"), dir.path()).await.unwrap_err();
        assert!(matches!(err, RunError::TimedOut(_)));
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TokioProcessRunner::new(Duration::from_secs(1));
        let err = runner.run(&[], dir.path()).await.unwrap_err();
        assert!(matches!(err, RunError::EmptyCommand));
    }
}
