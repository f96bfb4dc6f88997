//! Reconciler — drives one fetch → remediate → persist → notify cycle.
//!
//! The reconciler holds no state between cycles; everything it remembers
//! lives in the [`StateStore`]. Candidates are remediated one port at a
//! time, never in parallel, because distinct ports may share underlying
//! infrastructure.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use nodemend_client::{NodeSource, Notifier};
use nodemend_core::config::NotifyConfig;
use nodemend_core::{EpochMillis, NodeObservation, NodemendConfig};
use nodemend_health::{merge_all, select};
use nodemend_remediate::{Executor, ProcessRunner, RemediationMapper};
use nodemend_state::StateStore;

use crate::alert::format_alert;
use crate::report::{CycleReport, PortOutcome, RemediationResult};

pub struct Reconciler {
    source: Arc<dyn NodeSource>,
    store: StateStore,
    mapper: RemediationMapper,
    executor: Executor,
    notifier: Arc<dyn Notifier>,
    notify: NotifyConfig,
}

impl Reconciler {
    /// Assemble a reconciler rooted at `working_dir`.
    ///
    /// The ledger file and the compose descriptors both live in
    /// `working_dir`, and remediation commands run there.
    pub fn new(
        config: &NodemendConfig,
        working_dir: &Path,
        source: Arc<dyn NodeSource>,
        runner: Arc<dyn ProcessRunner>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            source,
            store: StateStore::open(&working_dir.join(&config.state.file_name)),
            mapper: RemediationMapper::new(&config.remediation, working_dir),
            executor: Executor::new(&config.remediation, working_dir, runner),
            notifier,
            notify: config.notify.clone(),
        }
    }

    /// Replace the ledger backend.
    pub fn with_store(mut self, store: StateStore) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run one cycle against the current wall-clock time.
    pub async fn run_cycle(&self, filter_key: &str) -> CycleReport {
        self.run_cycle_at(filter_key, epoch_millis()).await
    }

    /// Run one cycle, treating `now` as the current time.
    pub async fn run_cycle_at(&self, filter_key: &str, now: EpochMillis) -> CycleReport {
        info!(filter = filter_key, "reconciliation cycle started");
        let mut report = CycleReport::default();

        let fetched = self.source.fetch(filter_key).await;
        report.fetched = fetched.len();
        if fetched.is_empty() {
            warn!("no observations this cycle, leaving ledger untouched");
            return report;
        }

        let stored = self.store.load_or_empty();
        let (merged, mut ledger) = merge_all(&stored, fetched);
        self.persist(&ledger, "merged observations");

        let candidates = select(&merged, now);
        report.candidates = candidates.iter().map(|n| n.id.clone()).collect();
        if candidates.is_empty() {
            info!("no ineligible, unremediated nodes found");
            return report;
        }
        info!(count = candidates.len(), "found nodes needing a restart");

        for port in distinct_ports(&candidates) {
            let result = self.remediate_port(port).await;
            if matches!(result, RemediationResult::Remediated(_)) {
                mark_remediated(&mut ledger, port);
            }
            report.outcomes.push(PortOutcome { port, result });
        }
        self.persist(&ledger, "remediation flags");

        let message = format_alert(&self.notify.title, &candidates, self.notify.utc_offset_hours);
        match self.notifier.notify(&message).await {
            Ok(()) => report.notified = true,
            Err(e) => warn!(error = %e, "failed to deliver alert"),
        }

        info!(
            remediated = report.remediated_ports().len(),
            ports = report.outcomes.len(),
            "reconciliation cycle finished"
        );
        report
    }

    async fn remediate_port(&self, port: i64) -> RemediationResult {
        let action = match self.mapper.map(port) {
            Ok(action) => action,
            Err(skip) => {
                info!(port, reason = %skip, "not remediating port");
                return RemediationResult::Skipped(skip);
            }
        };

        match self.executor.execute(action).await {
            Ok(_) => RemediationResult::Remediated(action),
            Err(e) if e.is_high_severity() => {
                error!(port, %action, error = %e, "start failed after stop, target is left stopped");
                RemediationResult::Failed(e)
            }
            Err(e) => {
                error!(port, %action, error = %e, "remediation failed");
                RemediationResult::Failed(e)
            }
        }
    }

    fn persist(&self, ledger: &[NodeObservation], what: &str) {
        if let Err(e) = self.store.save(ledger) {
            error!(error = %e, what, "failed to save ledger");
        }
    }
}

/// Candidate ports in first-seen order, each once.
fn distinct_ports(candidates: &[NodeObservation]) -> Vec<i64> {
    let mut ports: Vec<i64> = Vec::new();
    for port in candidates.iter().filter_map(|n| n.port) {
        if !ports.contains(&port) {
            ports.push(port);
        }
    }
    ports
}

/// Flag every ledger record on `port`. Records sharing a port share the
/// restarted infrastructure, so they are matched by port rather than id.
fn mark_remediated(ledger: &mut [NodeObservation], port: i64) {
    for node in ledger.iter_mut().filter(|n| n.port == Some(port)) {
        node.remediated = true;
        info!(node_id = %node.id, port, "marked remediated");
    }
}

fn epoch_millis() -> EpochMillis {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as EpochMillis)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(id: &str, port: Option<i64>) -> NodeObservation {
        NodeObservation {
            id: id.to_string(),
            last_check_timestamp: 1,
            eligible: false,
            eligibility_cause: None,
            port,
            remediated: false,
        }
    }

    #[test]
    fn distinct_ports_keeps_first_seen_order() {
        let nodes = vec![
            obs("a", Some(3003)),
            obs("b", Some(3001)),
            obs("c", Some(3003)),
            obs("d", None),
        ];
        assert_eq!(distinct_ports(&nodes), vec![3003, 3001]);
    }

    #[test]
    fn mark_remediated_matches_by_port() {
        let mut ledger = vec![obs("a", Some(3001)), obs("b", Some(3002)), obs("c", Some(3001))];
        mark_remediated(&mut ledger, 3001);
        let flags: Vec<_> = ledger.iter().map(|n| n.remediated).collect();
        assert_eq!(flags, [true, false, true]);
    }

    #[test]
    fn epoch_millis_is_after_2020() {
        assert!(epoch_millis() > 1_577_836_800_000);
    }
}
