//! Port → remediation action lookup table.
//!
//! Built from the `[remediation]` config section. A port absent from the
//! table is inert: it is never fetched for remediation and never mapped to
//! an action.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::config::RemediationConfig;
use crate::types::RemediationAction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationTable {
    entries: BTreeMap<i64, RemediationAction>,
    compose_range: Option<RangeInclusive<i64>>,
}

impl RemediationTable {
    /// One `ComposeFileCycle(i)` entry per compose slot starting at
    /// `compose_base_port`, plus the named-service port.
    pub fn from_config(config: &RemediationConfig) -> Self {
        let base = config.compose_base_port;
        let compose_range = config
            .compose_slots
            .checked_sub(1)
            .map(|last| base..=base.saturating_add(i64::from(last)));

        let mut entries = BTreeMap::new();
        if let Some(range) = &compose_range {
            for (port, index) in range.clone().zip(0..config.compose_slots) {
                entries.insert(port, RemediationAction::ComposeFileCycle(index));
            }
        }
        // The named service wins if it overlaps a compose slot.
        entries.insert(config.named_service_port, RemediationAction::NamedServiceRestart);

        Self {
            entries,
            compose_range,
        }
    }

    pub fn lookup(&self, port: i64) -> Option<RemediationAction> {
        self.entries.get(&port).copied()
    }

    pub fn contains(&self, port: i64) -> bool {
        self.entries.contains_key(&port)
    }

    /// Inclusive port range covered by compose slots, if any.
    pub fn compose_range(&self) -> Option<&RangeInclusive<i64>> {
        self.compose_range.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RemediationTable {
    fn default() -> Self {
        Self::from_config(&RemediationConfig::default())
    }
}
