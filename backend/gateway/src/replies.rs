//! User-facing reply texts.

use chrono::{DateTime, Utc};
use docsnap_core::PipelineError;

pub const GREETING: &str =
    "Hello! Please send an image of a document and I'll extract the text for you.";
pub const INVALID_IMAGE: &str = "Please send a valid image file (JPEG, PNG, or WebP).";
pub const PROCESSING_ERROR: &str =
    "Sorry, there was a processing error while retrieving your image. Please try sending it again.";
pub const TOOK_TOO_LONG: &str =
    "Sorry, processing took too long. Please try again, ideally with a smaller or clearer photo.";
pub const TRY_AGAIN: &str =
    "Sorry, something went wrong while reading your document. Please try again in a moment.";

const MIB: f64 = 1024.0 * 1024.0;

pub fn rate_limited(reset_at: DateTime<Utc>, limit: u32) -> String {
    format!(
        "You've reached the limit of {limit} documents. Please try again after {} UTC.",
        reset_at.format("%H:%M")
    )
}

pub fn too_large(limit_bytes: u64) -> String {
    format!(
        "That image is too large to process. Please send an image under {:.0} MB.",
        limit_bytes as f64 / MIB
    )
}

/// The reply for a soft failure. Hard failures get the generic retry text.
pub fn for_error(err: &PipelineError) -> String {
    match err {
        PipelineError::NoMedia => GREETING.to_string(),
        PipelineError::AdmissionDenied { reset_at, limit } => rate_limited(*reset_at, *limit),
        PipelineError::InvalidMediaType(_) => INVALID_IMAGE.to_string(),
        PipelineError::MediaTooLarge { limit, .. } => too_large(*limit),
        PipelineError::MediaFetchFailed(_) => PROCESSING_ERROR.to_string(),
        PipelineError::ExtractionTimeout => TOOK_TOO_LONG.to_string(),
        PipelineError::ExtractionProviderError(_)
        | PipelineError::DeliveryFailed { .. }
        | PipelineError::InfrastructureFault(_) => TRY_AGAIN.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rate_limit_reply_states_reset_time() {
        let reset = Utc.with_ymd_and_hms(2024, 5, 1, 14, 5, 59).unwrap();
        let text = for_error(&PipelineError::AdmissionDenied {
            reset_at: reset,
            limit: 30,
        });
        assert!(text.contains("after 14:05 UTC"));
        assert!(text.contains("30"));
    }

    #[test]
    fn too_large_reply_names_limit_in_megabytes() {
        assert!(too_large(20 * 1024 * 1024).contains("under 20 MB"));
    }

    #[test]
    fn media_failures_map_to_distinct_replies() {
        assert_eq!(for_error(&PipelineError::InvalidMediaType("text/html".into())), INVALID_IMAGE);
        assert_eq!(for_error(&PipelineError::MediaFetchFailed("404".into())), PROCESSING_ERROR);
        assert_eq!(for_error(&PipelineError::ExtractionTimeout), TOOK_TOO_LONG);
        assert_eq!(for_error(&PipelineError::NoMedia), GREETING);
    }
}
