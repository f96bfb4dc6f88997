//! nodemend-client — the outward-facing collaborators of a cycle.
//!
//! - [`NodeSource`] lists nodes from the remote health service. Failures
//!   are logged and degrade to an empty listing; they never reach the
//!   caller as errors.
//! - [`Notifier`] delivers the aggregate alert. Delivery is best-effort.
//!
//! Both traits return boxed futures so they can be injected as
//! `Arc<dyn Trait>` and replaced by mocks in tests.

pub mod fetch;
pub mod notify;

pub use fetch::{FetchError, FetchFuture, HttpNodeSource, NodeSource};
pub use notify::{LogNotifier, NotifyError, NotifyFuture, Notifier, TelegramNotifier};
