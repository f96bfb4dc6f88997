//! Error and skip types for remediation.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::executor::Phase;

/// A decision not to remediate a port. Not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingSkip {
    #[error("port {port} is outside remediation scope")]
    OutOfScope { port: i64 },

    #[error("port {port} is below the compose port range")]
    BelowRange { port: i64 },

    #[error("descriptor {} for port {port} not found", .path.display())]
    MissingDescriptor { port: i64, path: PathBuf },
}

/// Failure to run a single out-of-process command.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("command is empty")]
    EmptyCommand,

    #[error("program not found: {0}")]
    NotFound(String),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("io error: {0}")]
    Io(String),
}

/// Failure of a remediation action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("remediation tool {program:?} unavailable for {phase} phase")]
    ToolUnavailable { phase: Phase, program: String },

    #[error("{phase} phase failed (exit code {exit_code:?}): {stderr}")]
    PhaseFailed {
        phase: Phase,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("unexpected error in {phase} phase: {message}")]
    Unexpected { phase: Phase, message: String },
}

impl ExecutionError {
    pub fn phase(&self) -> Phase {
        match self {
            ExecutionError::ToolUnavailable { phase, .. }
            | ExecutionError::PhaseFailed { phase, .. }
            | ExecutionError::Unexpected { phase, .. } => *phase,
        }
    }

    /// A failed start leaves the target stopped.
    pub fn is_high_severity(&self) -> bool {
        matches!(
            self,
            ExecutionError::PhaseFailed {
                phase: Phase::Start,
                ..
            }
        )
    }
}
