//! Two-phase remediation executor.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use nodemend_core::RemediationAction;
use nodemend_core::config::RemediationConfig;

use crate::error::{ExecutionError, RunError};
use crate::runner::ProcessRunner;

/// One step of a remediation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Stop,
    Start,
    Restart,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Phase::Stop => "stop",
            Phase::Start => "start",
            Phase::Restart => "restart",
        })
    }
}

/// Captured output of a phase that exited successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOutcome {
    pub phase: Phase,
    pub stdout: String,
    pub stderr: String,
}

/// Runs remediation actions through a [`ProcessRunner`], one phase at a time.
pub struct Executor {
    config: RemediationConfig,
    working_dir: PathBuf,
    runner: Arc<dyn ProcessRunner>,
}

impl Executor {
    pub fn new(config: &RemediationConfig, working_dir: &Path, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            config: config.clone(),
            working_dir: working_dir.to_path_buf(),
            runner,
        }
    }

    /// Command lines for each phase of `action`, in execution order.
    pub fn plan(&self, action: RemediationAction) -> Vec<(Phase, Vec<String>)> {
        match action {
            RemediationAction::NamedServiceRestart => {
                let mut restart = self.config.restart_command.clone();
                restart.push(self.config.named_service.clone());
                vec![(Phase::Restart, restart)]
            }
            RemediationAction::ComposeFileCycle(index) => {
                let descriptor = self
                    .working_dir
                    .join(self.config.descriptor_name(index))
                    .display()
                    .to_string();
                let compose = |tail: &[&str]| {
                    let mut cmd = self.config.compose_command.clone();
                    cmd.extend(["-f".to_string(), descriptor.clone()]);
                    cmd.extend(tail.iter().map(|s| s.to_string()));
                    cmd
                };
                vec![
                    (Phase::Stop, compose(&["down"])),
                    (Phase::Start, compose(&["up", "-d"])),
                ]
            }
        }
    }

    /// Run every phase of `action` in order, stopping at the first failure.
    pub async fn execute(&self, action: RemediationAction) -> Result<Vec<PhaseOutcome>, ExecutionError> {
        info!(%action, "executing remediation");
        let mut outcomes = Vec::new();
        for (phase, command) in self.plan(action) {
            outcomes.push(self.run_phase(phase, &command).await?);
        }
        info!(%action, phases = outcomes.len(), "remediation succeeded");
        Ok(outcomes)
    }

    async fn run_phase(&self, phase: Phase, command: &[String]) -> Result<PhaseOutcome, ExecutionError> {
        let line = command.join(" ");
        info!(%phase, command = %line, "running phase");

        let output = match self.runner.run(command, &self.working_dir).await {
            Ok(output) => output,
            Err(RunError::NotFound(program)) => {
                error!(%phase, %program, "remediation tool not found, ensure it is installed and on PATH");
                return Err(ExecutionError::ToolUnavailable { phase, program });
            }
            Err(RunError::EmptyCommand) => {
                error!(%phase, "no command configured for phase");
                return Err(ExecutionError::ToolUnavailable {
                    phase,
                    program: String::new(),
                });
            }
            Err(e) => {
                error!(%phase, error = %e, "phase invocation failed");
                return Err(ExecutionError::Unexpected {
                    phase,
                    message: e.to_string(),
                });
            }
        };

        let stdout = output.stdout.trim().to_string();
        let stderr = output.stderr.trim().to_string();

        if !output.success() {
            error!(%phase, exit_code = ?output.exit_code, command = %line, "phase failed");
            if !stdout.is_empty() {
                info!(%phase, "phase output:\n{stdout}");
            }
            if !stderr.is_empty() {
                error!(%phase, "phase error output:\n{stderr}");
            }
            return Err(ExecutionError::PhaseFailed {
                phase,
                exit_code: output.exit_code,
                stdout,
                stderr,
            });
        }

        info!(%phase, command = %line, "phase succeeded");
        if !stdout.is_empty() {
            info!(%phase, "phase output:\n{stdout}");
        }
        // Compose and docker print progress on stderr even when they succeed.
        if !stderr.is_empty() {
            warn!(%phase, "phase diagnostics:\n{stderr}");
        }

        Ok(PhaseOutcome {
            phase,
            stdout,
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::runner::{ProcessOutput, RunFuture};

    /// Mock runner that records commands and replays scripted results.
    struct ScriptedRunner {
        calls: Mutex<Vec<Vec<String>>>,
        results: Mutex<VecDeque<Result<ProcessOutput, RunError>>>,
    }

    impl ScriptedRunner {
        fn new(results: Vec<Result<ProcessOutput, RunError>>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                results: Mutex::new(results.into()),
            })
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ProcessRunner for ScriptedRunner {
        fn run<'a>(&'a self, command: &'a [String], _working_dir: &'a Path) -> RunFuture<'a> {
            self.calls.lock().unwrap().push(command.to_vec());
            let result = self
                .results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(exit(0, "")));
            Box::pin(async move { result })
        }
    }

    fn exit(code: i32, stderr: &str) -> ProcessOutput {
        ProcessOutput {
            exit_code: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    fn exit_with_stdout(code: i32, stdout: &str, stderr: &str) -> ProcessOutput {
        ProcessOutput {
            stdout: stdout.to_string(),
            ..exit(code, stderr)
        }
    }

    fn executor(runner: Arc<ScriptedRunner>) -> Executor {
        Executor::new(&RemediationConfig::default(), Path::new("/srv/fleet"), runner)
    }

    #[test]
    fn compose_plan_is_down_then_up() {
        let exec = executor(ScriptedRunner::new(vec![]));
        let plan = exec.plan(RemediationAction::ComposeFileCycle(1));
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].0, Phase::Stop);
        assert_eq!(
            plan[0].1,
            ["sudo", "docker-compose", "-f", "/srv/fleet/docker-compose1.yaml", "down"]
        );
        assert_eq!(plan[1].0, Phase::Start);
        assert_eq!(
            plan[1].1,
            ["sudo", "docker-compose", "-f", "/srv/fleet/docker-compose1.yaml", "up", "-d"]
        );
    }

    #[test]
    fn named_plan_is_single_restart() {
        let exec = executor(ScriptedRunner::new(vec![]));
        let plan = exec.plan(RemediationAction::NamedServiceRestart);
        assert_eq!(plan, vec![(Phase::Restart, vec![
            "docker".to_string(),
            "restart".to_string(),
            "ocean-node".to_string(),
        ])]);
    }

    #[tokio::test]
    async fn successful_cycle_surfaces_stderr() {
        let runner = ScriptedRunner::new(vec![Ok(exit(0, "Stopping... done")), Ok(exit(0, ""))]);
        let outcomes = executor(runner.clone())
            .execute(RemediationAction::ComposeFileCycle(0))
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].stderr, "Stopping... done");
        assert_eq!(runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn stop_failure_never_invokes_start() {
        let runner = ScriptedRunner::new(vec![Ok(exit(1, "no such service"))]);
        let err = executor(runner.clone())
            .execute(RemediationAction::ComposeFileCycle(0))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ExecutionError::PhaseFailed {
                phase: Phase::Stop,
                exit_code: Some(1),
                stdout: String::new(),
                stderr: "no such service".to_string(),
            }
        );
        assert!(!err.is_high_severity());
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(!calls.iter().any(|c| c.contains(&"up".to_string())));
    }

    #[tokio::test]
    async fn failed_phase_keeps_both_streams() {
        let runner = ScriptedRunner::new(vec![Ok(exit_with_stdout(
            1,
            "Stopping node-0 ... error\n",
            "ERROR: network busy\n",
        ))]);
        let err = executor(runner)
            .execute(RemediationAction::ComposeFileCycle(0))
            .await
            .unwrap_err();
        match err {
            ExecutionError::PhaseFailed { stdout, stderr, .. } => {
                assert_eq!(stdout, "Stopping node-0 ... error");
                assert_eq!(stderr, "ERROR: network busy");
            }
            other => panic!("expected PhaseFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn start_failure_is_high_severity() {
        let runner = ScriptedRunner::new(vec![Ok(exit(0, "")), Ok(exit(2, "port in use"))]);
        let err = executor(runner)
            .execute(RemediationAction::ComposeFileCycle(3))
            .await
            .unwrap_err();
        assert_eq!(err.phase(), Phase::Start);
        assert!(err.is_high_severity());
    }

    #[tokio::test]
    async fn missing_tool_is_distinct_from_phase_failure() {
        let runner = ScriptedRunner::new(vec![Err(RunError::NotFound("sudo".to_string()))]);
        let err = executor(runner.clone())
            .execute(RemediationAction::ComposeFileCycle(0))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ExecutionError::ToolUnavailable {
                phase: Phase::Stop,
                program: "sudo".to_string(),
            }
        );
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn timeout_is_unexpected() {
        let runner = ScriptedRunner::new(vec![Err(RunError::TimedOut(
            std::time::Duration::from_secs(1),
        ))]);
        let err = executor(runner)
            .execute(RemediationAction::NamedServiceRestart)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Unexpected { phase: Phase::Restart, .. }));
    }

    #[tokio::test]
    async fn signal_kill_counts_as_failure() {
        let killed = ProcessOutput {
            exit_code: None,
            ..ProcessOutput::default()
        };
        let runner = ScriptedRunner::new(vec![Ok(killed)]);
        let err = executor(runner)
            .execute(RemediationAction::NamedServiceRestart)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::PhaseFailed { exit_code: None, .. }));
    }
}
