use chrono::{DateTime, Utc};
use thiserror::Error;

/// Every way a webhook request can leave the happy path.
///
/// Soft variants are turned into a reply to the sender at the point they
/// occur. Hard variants surface in the webhook's own HTTP response.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("admission denied for sender until {reset_at}")]
    AdmissionDenied { reset_at: DateTime<Utc>, limit: u32 },

    #[error("inbound message carries no media")]
    NoMedia,

    #[error("unsupported media type: {0}")]
    InvalidMediaType(String),

    #[error("media is {size} bytes, limit is {limit} bytes")]
    MediaTooLarge { size: u64, limit: u64 },

    #[error("media fetch failed: {0}")]
    MediaFetchFailed(String),

    #[error("text extraction exceeded its deadline")]
    ExtractionTimeout,

    #[error("text extraction failed: {0}")]
    ExtractionProviderError(String),

    #[error("reply delivery failed at chunk {index}: {reason}")]
    DeliveryFailed { index: usize, reason: String },

    #[error("infrastructure fault: {0}")]
    InfrastructureFault(String),
}

impl PipelineError {
    /// Soft errors are answered through the reply channel; hard ones are not.
    pub fn is_soft(&self) -> bool {
        !matches!(
            self,
            Self::DeliveryFailed { .. } | Self::InfrastructureFault(_)
        )
    }

    /// Stable short name used in logs and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AdmissionDenied { .. } => "admission_denied",
            Self::NoMedia => "no_media",
            Self::InvalidMediaType(_) => "invalid_media_type",
            Self::MediaTooLarge { .. } => "media_too_large",
            Self::MediaFetchFailed(_) => "media_fetch_failed",
            Self::ExtractionTimeout => "extraction_timeout",
            Self::ExtractionProviderError(_) => "extraction_provider_error",
            Self::DeliveryFailed { .. } => "delivery_failed",
            Self::InfrastructureFault(_) => "infrastructure_fault",
        }
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        Self::InfrastructureFault(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_and_infrastructure_are_hard() {
        assert!(!PipelineError::DeliveryFailed {
            index: 1,
            reason: "boom".into()
        }
        .is_soft());
        assert!(!PipelineError::InfrastructureFault("x".into()).is_soft());
    }

    #[test]
    fn user_facing_failures_are_soft() {
        assert!(PipelineError::NoMedia.is_soft());
        assert!(PipelineError::ExtractionTimeout.is_soft());
        assert!(PipelineError::InvalidMediaType("text/html".into()).is_soft());
        assert!(PipelineError::MediaTooLarge { size: 10, limit: 5 }.is_soft());
    }

    #[test]
    fn anyhow_errors_become_infrastructure_faults() {
        let err: PipelineError = anyhow::anyhow!("store unreachable").into();
        assert_eq!(err.kind(), "infrastructure_fault");
        assert!(err.to_string().contains("store unreachable"));
    }
}
