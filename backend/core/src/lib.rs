//! Core types, error taxonomy, and collaborator traits for the docsnap pipeline.
//!
//! Everything that crosses a crate boundary lives here so the gateway can wire
//! real provider clients in production and fakes in tests.

pub mod error;
pub mod message;
pub mod traits;
pub mod types;

pub use error::PipelineError;
pub use message::{DeliveryOutcome, DeliveryStatus, InboundMessage, MessageChunk};
pub use traits::{
    CounterStore, InferenceApi, InferenceError, MediaApi, OversizedMedia, ReplySender, SendError,
    VisionRequest,
};
pub use types::{
    CounterState, ExtractionResult, FetchedMedia, MediaLocation, RateDecision, NO_TEXT_SENTINEL,
};
