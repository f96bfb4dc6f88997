//! Fault window tracking.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use nodemend_core::NodeObservation;

/// Merge a freshly fetched observation with the stored one for the same id.
pub fn merge(previous: Option<&NodeObservation>, fetched: NodeObservation) -> NodeObservation {
    let remediated = match previous {
        Some(prev) if prev.last_check_timestamp == fetched.last_check_timestamp => {
            prev.remediated
        }
        _ => false,
    };
    NodeObservation {
        remediated,
        ..fetched
    }
}

/// Merge a whole fetch against the stored ledger.
///
/// Returns `(merged, ledger)`: `merged` holds this cycle's observations in
/// fetch order, `ledger` is `merged` followed by stored records that were
/// not fetched this time, unchanged. Duplicate ids within the fetch keep
/// the first occurrence.
pub fn merge_all(
    stored: &[NodeObservation],
    fetched: Vec<NodeObservation>,
) -> (Vec<NodeObservation>, Vec<NodeObservation>) {
    let by_id: HashMap<&str, &NodeObservation> =
        stored.iter().map(|n| (n.id.as_str(), n)).collect();

    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(fetched.len());
    for node in fetched {
        if !seen.insert(node.id.clone()) {
            warn!(node_id = %node.id, "duplicate node in fetch, keeping first");
            continue;
        }
        let previous = by_id.get(node.id.as_str()).copied();
        match previous {
            Some(prev) if prev.last_check_timestamp == node.last_check_timestamp => {
                debug!(node_id = %node.id, remediated = prev.remediated, "lastCheck unchanged, keeping remediated flag");
            }
            Some(_) => debug!(node_id = %node.id, "lastCheck changed, new fault window"),
            None => debug!(node_id = %node.id, "first sighting"),
        }
        merged.push(merge(previous, node));
    }

    let mut ledger = merged.clone();
    ledger.extend(stored.iter().filter(|n| !seen.contains(&n.id)).cloned());
    (merged, ledger)
}
