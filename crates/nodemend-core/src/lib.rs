//! nodemend-core — shared types for the nodemend workspace.
//!
//! Holds the persisted [`NodeObservation`] record, the derived
//! [`RemediationAction`], the port lookup table that decides which ports
//! are in remediation scope, and the `nodemend.toml` configuration.

pub mod config;
pub mod duration;
pub mod table;
pub mod types;

pub use config::{ConfigError, NodemendConfig};
pub use duration::parse_duration;
pub use table::RemediationTable;
pub use types::*;
