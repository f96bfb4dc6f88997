//! nodemend-reconcile — one full reconciliation cycle.
//!
//! ```text
//! NodeSource::fetch ─▶ merge with ledger ─▶ save ─▶ select(now)
//!        ─▶ per port: map ─▶ execute ─▶ mark remediated ─▶ save ─▶ notify
//! ```
//!
//! Nothing in a cycle is fatal. Fetch and ledger failures degrade to
//! "nothing observed" / "no prior state", a failed remediation for one port
//! does not stop the others or the final save, and alert delivery is
//! best-effort. The [`CycleReport`] records what happened.

pub mod alert;
pub mod driver;
pub mod report;

pub use alert::format_alert;
pub use driver::Reconciler;
pub use report::{CycleReport, PortOutcome, RemediationResult};
