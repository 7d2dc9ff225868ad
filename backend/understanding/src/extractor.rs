use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use docsnap_core::{ExtractionResult, InferenceApi, InferenceError, PipelineError, VisionRequest};
use tokio::time::{Instant, timeout_at};
use tracing::{info, warn};

pub const OCR_PROMPT: &str = "Extract all text from this image of a document. \
Preserve the reading order and paragraph breaks. Use Markdown for headings, lists \
and emphasis where the document has them. Return only the extracted text with no \
commentary. If there is no readable text, return nothing.";

/// One OCR call per image against a vision provider.
pub struct TextExtractor {
    api: Arc<dyn InferenceApi>,
    max_tokens: u32,
}

impl TextExtractor {
    pub fn new(api: Arc<dyn InferenceApi>, max_tokens: u32) -> Self {
        Self { api, max_tokens }
    }

    pub fn provider(&self) -> &str {
        self.api.name()
    }

    /// Run OCR on `image` and give up at `deadline`.
    ///
    /// A provider that answers with an error status, or with nothing, yields
    /// `NoText`. Only transport failures and the deadline are errors.
    pub async fn extract_text(
        &self,
        image: &[u8],
        content_type: &str,
        deadline: Instant,
    ) -> Result<ExtractionResult, PipelineError> {
        let request = VisionRequest {
            prompt: OCR_PROMPT.to_string(),
            image_base64: STANDARD.encode(image),
            content_type: content_type.to_string(),
            max_tokens: self.max_tokens,
        };

        let started = Instant::now();
        let outcome = timeout_at(deadline, self.api.infer(&request))
            .await
            .map_err(|_| PipelineError::ExtractionTimeout)?;

        match outcome {
            Ok(output) => {
                let result = ExtractionResult::from_output(output.as_deref());
                info!(
                    provider = self.api.name(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    has_text = matches!(result, ExtractionResult::Text(_)),
                    "extraction finished"
                );
                Ok(result)
            }
            Err(InferenceError::Provider { status, message }) => {
                warn!(provider = self.api.name(), status, %message, "provider rejected extraction");
                Ok(ExtractionResult::NoText)
            }
            Err(InferenceError::Transport(message)) => {
                Err(PipelineError::ExtractionProviderError(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Mutex;

    enum Behavior {
        Answer(Option<&'static str>),
        Reject,
        Unreachable,
        Hang,
    }

    struct FakeInference {
        behavior: Behavior,
        seen: Mutex<Option<VisionRequest>>,
    }

    impl FakeInference {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                seen: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl InferenceApi for FakeInference {
        fn name(&self) -> &str {
            "fake"
        }

        async fn infer(&self, request: &VisionRequest) -> Result<Option<String>, InferenceError> {
            *self.seen.lock().await = Some(request.clone());
            match self.behavior {
                Behavior::Answer(text) => Ok(text.map(str::to_string)),
                Behavior::Reject => Err(InferenceError::Provider {
                    status: 400,
                    message: "bad image".into(),
                }),
                Behavior::Unreachable => Err(InferenceError::Transport("connection reset".into())),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(Some("late".into()))
                }
            }
        }
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(7)
    }

    #[tokio::test]
    async fn returns_trimmed_text_and_sends_fixed_request() {
        let api = FakeInference::new(Behavior::Answer(Some("  Hello\n")));
        let extractor = TextExtractor::new(api.clone(), 1024);
        let result = extractor
            .extract_text(b"\x89PNG", "image/png", deadline())
            .await
            .unwrap();
        assert_eq!(result, ExtractionResult::Text("Hello".into()));

        let seen = api.seen.lock().await.clone().unwrap();
        assert_eq!(seen.prompt, OCR_PROMPT);
        assert_eq!(seen.max_tokens, 1024);
        assert_eq!(seen.content_type, "image/png");
        assert_eq!(seen.image_base64, "iVBORw==");
    }

    #[tokio::test]
    async fn blank_output_is_no_text() {
        for answer in [None, Some("   \n ")] {
            let extractor = TextExtractor::new(FakeInference::new(Behavior::Answer(answer)), 1024);
            let result = extractor
                .extract_text(b"x", "image/jpeg", deadline())
                .await
                .unwrap();
            assert_eq!(result, ExtractionResult::NoText);
        }
    }

    #[tokio::test]
    async fn provider_rejection_is_no_text() {
        let extractor = TextExtractor::new(FakeInference::new(Behavior::Reject), 1024);
        let result = extractor
            .extract_text(b"x", "image/jpeg", deadline())
            .await
            .unwrap();
        assert_eq!(result, ExtractionResult::NoText);
    }

    #[tokio::test]
    async fn transport_failure_is_provider_error() {
        let extractor = TextExtractor::new(FakeInference::new(Behavior::Unreachable), 1024);
        let err = extractor
            .extract_text(b"x", "image/jpeg", deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ExtractionProviderError(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_elapsed_is_timeout() {
        let extractor = TextExtractor::new(FakeInference::new(Behavior::Hang), 1024);
        let err = extractor
            .extract_text(b"x", "image/jpeg", deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ExtractionTimeout));
    }
}
