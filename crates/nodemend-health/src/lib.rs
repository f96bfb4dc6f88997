//! nodemend-health — decides which nodes need a restart.
//!
//! ```text
//! fetched ──┐
//!           ├─ merge() ── merged ledger ── select(now) ── candidates
//! stored  ──┘
//! ```
//!
//! # Fault windows
//!
//! A fault window is the span during which a node's `lastCheckTimestamp`
//! stays the same. [`merge`] carries the local `remediated` flag forward
//! only while the window is unchanged, so a node is restarted at most once
//! per window and becomes eligible for a fresh attempt as soon as the
//! remote source re-checks it. Any timestamp change opens a new window,
//! including one that moves backwards.

pub mod filter;
pub mod tracker;

pub use filter::select;
pub use tracker::{merge, merge_all};
