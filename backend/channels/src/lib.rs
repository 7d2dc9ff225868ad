//! Messaging-channel side of the pipeline: admission control, the provider's
//! inbound/outbound/media APIs, and ordered reply delivery.

pub mod counter_store;
pub mod dispatcher;
pub mod rate_limiter;
pub mod twilio;

pub use counter_store::{InMemoryCounterStore, RedisRestCounterStore};
pub use dispatcher::{DispatchError, ReplyDispatcher};
pub use rate_limiter::{AdmissionController, AdmissionPolicy};
pub use twilio::{InboundForm, TwilioCredentials, TwilioMediaApi, TwilioReplySender};
