use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::types::{CounterState, MediaLocation};

/// Atomic increment-with-expiry counters shared by every worker.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment `key` by one. The first increment arms an expiry of `window`;
    /// later increments leave it untouched.
    async fn increment(&self, key: &str, window: Duration) -> Result<CounterState>;
}

/// The messaging provider's media metadata and content endpoints.
#[async_trait]
pub trait MediaApi: Send + Sync {
    /// Resolve an opaque media reference into a downloadable location.
    async fn resolve(&self, media_ref: &str) -> Result<MediaLocation>;

    /// Download the bytes behind a resolved location. Returns the bytes and the
    /// content type reported by the content endpoint, if any.
    ///
    /// Bodies over `max_bytes` fail with [`OversizedMedia`] without being read
    /// past the limit.
    async fn download(
        &self,
        location: &MediaLocation,
        max_bytes: u64,
    ) -> Result<(Bytes, Option<String>)>;
}

/// A media body exceeded the download ceiling. `size` is the declared length,
/// or the bytes read before giving up when no length was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("media body of {size} bytes exceeds the {limit} byte limit")]
pub struct OversizedMedia {
    pub size: u64,
    pub limit: u64,
}

/// A single vision inference call.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub prompt: String,
    pub image_base64: String,
    pub content_type: String,
    pub max_tokens: u32,
}

#[derive(Debug, Error)]
pub enum InferenceError {
    /// The request never got a response (DNS, TLS, connection reset, ...).
    #[error("inference transport error: {0}")]
    Transport(String),

    /// The provider answered with an error status or an unreadable body.
    #[error("inference provider error ({status}): {message}")]
    Provider { status: u16, message: String },
}

/// Vision-capable inference provider.
#[async_trait]
pub trait InferenceApi: Send + Sync {
    /// Provider name for logs (e.g. "openai").
    fn name(&self) -> &str;

    /// Returns the model's text output, `None` when the response had no content.
    async fn infer(&self, request: &VisionRequest) -> Result<Option<String>, InferenceError>;
}

/// Structured failure from the reply-send API.
#[derive(Debug, Clone, Error)]
#[error("reply send failed: {message}")]
pub struct SendError {
    /// HTTP status, when the provider answered at all.
    pub status: Option<u16>,
    /// Provider-specific error code.
    pub code: Option<i64>,
    pub message: String,
    /// Raw provider payload kept for diagnostics.
    pub payload: Option<serde_json::Value>,
}

impl SendError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
            payload: None,
        }
    }
}

/// Outbound message API of the reply channel.
#[async_trait]
pub trait ReplySender: Send + Sync {
    /// Send `body` to `to` from `from`. Returns the provider's receipt id.
    async fn send(&self, to: &str, from: &str, body: &str) -> Result<String, SendError>;
}
