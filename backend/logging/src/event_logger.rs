//! Pipeline Event Logger
//!
//! Structured stage transitions for one webhook request, emitted on the
//! `pipeline_events` target so they can be filtered or routed separately.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

/// States a webhook request moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Received,
    Admitted,
    MediaResolved,
    Extracted,
    Formatted,
    Delivered,
    Errored,
}

impl PipelineStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Errored)
    }
}

#[derive(Debug, Serialize)]
pub struct PipelineEvent {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub stage: PipelineStage,
    /// Error kind or short note, already redacted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

pub struct PipelineEventLogger;

impl PipelineEventLogger {
    /// Record a stage transition. `detail` is redacted before it is logged.
    pub fn transition(request_id: &str, stage: PipelineStage, detail: Option<&str>) -> PipelineEvent {
        let event = PipelineEvent {
            request_id: request_id.to_string(),
            timestamp: Utc::now(),
            stage,
            detail: detail.map(redact_sensitive_data),
        };

        let payload = serde_json::to_string(&event).unwrap_or_default();
        info!(target: "pipeline_events", request_id, stage = ?stage, event = %payload, "pipeline transition");
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_stages() {
        assert!(PipelineStage::Delivered.is_terminal());
        assert!(PipelineStage::Errored.is_terminal());
        assert!(!PipelineStage::Extracted.is_terminal());
    }

    #[test]
    fn transition_redacts_detail() {
        let event = PipelineEventLogger::transition(
            "req-1",
            PipelineStage::Errored,
            Some("send to +14155551234 failed"),
        );
        let detail = event.detail.unwrap();
        assert!(!detail.contains("4155551234"));
        let json = serde_json::to_value(&event.stage).unwrap();
        assert_eq!(json, "errored");
    }
}
