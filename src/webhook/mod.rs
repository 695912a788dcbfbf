//! Inbound webhook: HTTP routes and the per-message dispatcher.

pub mod dispatcher;
pub mod routes;

pub use dispatcher::{DispatchOutcome, Dispatcher, spawn_dedup_prune_task};
pub use routes::{WebhookState, webhook_routes};
