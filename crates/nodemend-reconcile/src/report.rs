//! Outcome of a reconciliation cycle.

use nodemend_core::{NodeId, RemediationAction};
use nodemend_remediate::{ExecutionError, MappingSkip};

/// What happened to one candidate port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemediationResult {
    Remediated(RemediationAction),
    Skipped(MappingSkip),
    Failed(ExecutionError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortOutcome {
    pub port: i64,
    pub result: RemediationResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Observations returned by the source this cycle.
    pub fetched: usize,
    /// Ineligible, not-yet-remediated node ids, in fetch order.
    pub candidates: Vec<NodeId>,
    /// One entry per distinct candidate port, in first-seen order.
    pub outcomes: Vec<PortOutcome>,
    pub notified: bool,
}

impl CycleReport {
    /// Ports whose action ran to completion.
    pub fn remediated_ports(&self) -> Vec<i64> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, RemediationResult::Remediated(_)))
            .map(|o| o.port)
            .collect()
    }

    /// Number of actions handed to the executor, successful or not.
    pub fn actions_attempted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !matches!(o.result, RemediationResult::Skipped(_)))
            .count()
    }
}
