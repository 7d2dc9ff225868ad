use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reply text used whenever the model produced nothing usable.
pub const NO_TEXT_SENTINEL: &str = "No text could be extracted from this image.";

/// Outcome of an admission check for one sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateDecision {
    pub allowed: bool,
    pub reset_at: DateTime<Utc>,
    /// Requests left in the current window after this one.
    pub remaining: u32,
    pub limit: u32,
}

/// Counter value returned by a store after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterState {
    pub count: u64,
    /// Time until the counter expires and the window starts over.
    pub ttl: Duration,
}

/// Where a media reference resolved to, as reported by the provider's metadata API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaLocation {
    pub url: String,
    pub content_type: Option<String>,
    pub size_bytes: Option<u64>,
}

/// Downloaded image bytes with a verified content type.
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub bytes: Bytes,
    pub content_type: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    Text(String),
    /// The provider answered but there was nothing to read.
    NoText,
}

impl ExtractionResult {
    /// Build a result from raw model output, mapping blank output to `NoText`.
    pub fn from_output(output: Option<&str>) -> Self {
        match output.map(str::trim) {
            Some(text) if !text.is_empty() => Self::Text(text.to_string()),
            _ => Self::NoText,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::NoText => NO_TEXT_SENTINEL.to_string(),
        }
    }
}
