//! nodemend-state — persisted node ledger.
//!
//! The ledger is a single JSON document `{ "nodes": [ ... ] }` holding the
//! last-known [`NodeObservation`](nodemend_core::NodeObservation) for every
//! node id plus its local `remediated` flag. Each reconciliation cycle does
//! one full read and one or two full rewrites; there is no partial update
//! and no locking, so only one cycle may run at a time.
//!
//! The `StateStore` is `Clone` and supports an in-memory backend for tests.

pub mod error;
pub mod store;

pub use error::{StateError, StateResult};
pub use store::{StateDocument, StateStore};
