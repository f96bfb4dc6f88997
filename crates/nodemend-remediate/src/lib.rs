//! nodemend-remediate — turns a port into a restart and runs it.
//!
//! # Architecture
//!
//! ```text
//! port ── RemediationMapper::map() ──▶ RemediationAction | MappingSkip
//!                                            │
//!                     Executor::execute() ◀──┘
//!                       ├── ComposeFileCycle(i): stop ──▶ start
//!                       └── NamedServiceRestart: restart
//!                               │
//!                         ProcessRunner::run()  (one child per phase)
//! ```
//!
//! Phases run strictly in order and never overlap. A failed stop phase
//! aborts the cycle before start is attempted. A failed start phase leaves
//! the target stopped and is reported as high severity. There are no
//! retries here.

pub mod error;
pub mod executor;
pub mod mapper;
pub mod runner;

pub use error::{ExecutionError, MappingSkip, RunError};
pub use executor::{Executor, Phase, PhaseOutcome};
pub use mapper::RemediationMapper;
pub use runner::{ProcessOutput, ProcessRunner, RunFuture, TokioProcessRunner};
