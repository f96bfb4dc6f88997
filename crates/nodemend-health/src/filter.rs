//! Eligibility filter: picks the nodes that need a restart now.

use tracing::{debug, warn};

use nodemend_core::{EpochMillis, NodeObservation};

/// Select ineligible, not-yet-remediated nodes last checked before `now`.
///
/// Output keeps input order. Nodes without a port are reported and left out.
pub fn select(observations: &[NodeObservation], now: EpochMillis) -> Vec<NodeObservation> {
    let mut candidates = Vec::new();
    for node in observations {
        if node.eligible {
            continue;
        }
        if node.remediated {
            debug!(node_id = %node.id, "already remediated in this fault window, skipping");
            continue;
        }
        if node.last_check_timestamp >= now {
            debug!(node_id = %node.id, last_check = node.last_check_timestamp, "lastCheck not in the past, skipping");
            continue;
        }
        if node.port.is_none() {
            warn!(node_id = %node.id, "ineligible node has no port, cannot remediate");
            continue;
        }
        debug!(node_id = %node.id, cause = node.cause_or_na(), "restart candidate");
        candidates.push(node.clone());
    }
    candidates
}
