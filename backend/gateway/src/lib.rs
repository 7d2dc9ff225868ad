//! Docsnap webhook gateway.
//!
//! Hosts the inbound webhook, runs each message through the extraction
//! pipeline under a deadline, and exposes a health endpoint.

pub mod controller;
pub mod health_api;
pub mod replies;
pub mod server;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{Collaborators, PipelineSettings, WebhookController, WebhookOutcome};
pub use server::{GatewayState, build_router, start_server};
