//! Domain types shared across nodemend crates.

use serde::{Deserialize, Serialize};

/// Opaque node identity as reported by the remote source.
pub type NodeId = String;

/// Milliseconds since the Unix epoch.
pub type EpochMillis = i64;

/// One fetched or persisted node record.
///
/// Every field except `remediated` is owned by the remote source and is
/// overwritten wholesale on each cycle. `remediated` is local bookkeeping:
/// it is true once a restart has been attempted for the fault window that
/// started at `last_check_timestamp`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeObservation {
    pub id: NodeId,
    pub last_check_timestamp: EpochMillis,
    pub eligible: bool,
    /// Diagnostic text; only meaningful while `eligible` is false.
    #[serde(default)]
    pub eligibility_cause: Option<String>,
    /// Remediation target. `None` when the source did not report one.
    #[serde(default)]
    pub port: Option<i64>,
    #[serde(default)]
    pub remediated: bool,
}

impl NodeObservation {
    /// Cause text for reports, falling back to `"N/A"`.
    pub fn cause_or_na(&self) -> &str {
        self.eligibility_cause.as_deref().unwrap_or("N/A")
    }
}

/// What to do for a remediation target. Derived, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemediationAction {
    /// `restart` of the long-lived named service container.
    NamedServiceRestart,
    /// `down` then `up -d` against the compose descriptor with this index.
    ComposeFileCycle(u32),
}

impl std::fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemediationAction::NamedServiceRestart => write!(f, "named-service-restart"),
            RemediationAction::ComposeFileCycle(index) => write!(f, "compose-cycle[{index}]"),
        }
    }
}
