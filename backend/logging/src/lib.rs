//! Structured logging for docsnap.
//!
//! Handles subscriber setup, redaction of sender identities and tokens, and
//! the per-request pipeline event log.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{PipelineEvent, PipelineEventLogger, PipelineStage};
pub use logger::init_logger;
pub use redact::{mask_sender, redact_sensitive_data};
