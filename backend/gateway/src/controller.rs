//! Webhook controller: the per-request pipeline and its deadlines.
//!
//! A request moves `Received → Admitted → MediaResolved → Extracted →
//! Formatted → Delivered`, or to `Errored` from any step. Soft failures are
//! answered through the reply channel and still count as a completed webhook.
//!
//! The pipeline runs as a spawned task raced against the request deadline.
//! When the deadline wins the task is left running; whichever side claims the
//! reply first is the only one that talks to the sender.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use docsnap_channels::{AdmissionController, AdmissionPolicy, ReplyDispatcher};
use docsnap_config::DocsnapConfig;
use docsnap_config::defaults::MAX_TIMEOUT_SECS;
use docsnap_core::{
    CounterStore, InboundMessage, InferenceApi, MediaApi, MessageChunk, PipelineError,
    ReplySender,
};
use docsnap_logging::{PipelineEventLogger, PipelineStage, mask_sender};
use docsnap_markdown::format_for_channel;
use docsnap_media::MediaFetcher;
use docsnap_understanding::TextExtractor;
use tokio::time::{Instant, timeout_at};
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::replies;

/// External clients the pipeline talks to.
pub struct Collaborators {
    pub counter_store: Arc<dyn CounterStore>,
    pub media_api: Arc<dyn MediaApi>,
    pub inference: Arc<dyn InferenceApi>,
    pub reply_sender: Arc<dyn ReplySender>,
}

/// Resolved knobs for one controller.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub quota: u32,
    pub window: Duration,
    pub key_prefix: String,
    pub media_max_bytes: u64,
    pub max_tokens: u32,
    /// Extraction deadline, from request entry.
    pub extraction_timeout: Duration,
    /// Overall deadline, from request entry.
    pub request_timeout: Duration,
    pub max_chunk_length: usize,
    pub pacing: Duration,
    /// Reply origin when the inbound message does not name one.
    pub from_number: Option<String>,
}

fn bounded_timeout(secs: u64, field: &str) -> anyhow::Result<Duration> {
    if secs > MAX_TIMEOUT_SECS {
        anyhow::bail!("{field} of {secs}s exceeds the {MAX_TIMEOUT_SECS}s maximum");
    }
    Ok(Duration::from_secs(secs))
}

impl PipelineSettings {
    pub fn from_config(config: &DocsnapConfig) -> anyhow::Result<Self> {
        let quota = config
            .rate_limit
            .quota
            .context("rateLimit.quota is required")?;
        Ok(Self {
            quota,
            window: Duration::from_secs(config.rate_limit.window_secs),
            key_prefix: config.rate_limit.key_prefix.clone(),
            media_max_bytes: config.media.max_bytes,
            max_tokens: config.extraction.max_tokens,
            extraction_timeout: bounded_timeout(
                config.extraction.timeout_secs,
                "extraction.timeoutSecs",
            )?,
            request_timeout: bounded_timeout(
                config.webhook.request_timeout_secs,
                "webhook.requestTimeoutSecs",
            )?,
            max_chunk_length: config.formatting.max_chunk_length,
            pacing: Duration::from_millis(config.delivery.pacing_ms),
            from_number: config.delivery.from_number.clone(),
        })
    }
}

/// How the webhook call itself ended.
#[derive(Debug)]
pub enum WebhookOutcome {
    /// The sender got a reply (text, or a soft-error explanation).
    Completed,
    /// A hard failure; the webhook answers with an error status.
    Failed(PipelineError),
    /// The request deadline fired before the pipeline finished.
    TimedOut,
}

/// Per-request state shared between the pipeline task and the deadline.
struct RequestContext {
    request_id: String,
    message: InboundMessage,
    reply_from: String,
    extraction_deadline: Instant,
    /// Set by whichever side sends the user-visible reply first.
    reply_claimed: AtomicBool,
}

impl RequestContext {
    fn claim_reply(&self) -> bool {
        !self.reply_claimed.swap(true, Ordering::SeqCst)
    }

    fn transition(&self, stage: PipelineStage, detail: Option<&str>) {
        PipelineEventLogger::transition(&self.request_id, stage, detail);
    }
}

pub struct WebhookController {
    admission: AdmissionController,
    fetcher: MediaFetcher,
    extractor: TextExtractor,
    dispatcher: ReplyDispatcher,
    settings: PipelineSettings,
}

impl WebhookController {
    pub fn new(clients: Collaborators, settings: PipelineSettings) -> Self {
        let policy = AdmissionPolicy::new(settings.quota, settings.window, &settings.key_prefix);
        Self {
            admission: AdmissionController::new(policy, clients.counter_store),
            fetcher: MediaFetcher::new(clients.media_api, settings.media_max_bytes),
            extractor: TextExtractor::new(clients.inference, settings.max_tokens),
            dispatcher: ReplyDispatcher::new(clients.reply_sender, settings.pacing),
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run one inbound message through the pipeline under the request deadline.
    pub async fn handle(self: &Arc<Self>, message: InboundMessage) -> WebhookOutcome {
        let entered = Instant::now();
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "webhook",
            request_id = %request_id,
            message_sid = message.message_id().unwrap_or("-"),
            sender = %mask_sender(message.sender_id()),
        );

        async move {
            PipelineEventLogger::transition(&request_id, PipelineStage::Received, None);

            let Some(reply_from) = message
                .origin()
                .map(str::to_string)
                .or_else(|| self.settings.from_number.clone())
            else {
                let err = PipelineError::InfrastructureFault(
                    "no origin address to reply from".into(),
                );
                PipelineEventLogger::transition(&request_id, PipelineStage::Errored, Some(err.kind()));
                return WebhookOutcome::Failed(err);
            };

            let ctx = Arc::new(RequestContext {
                request_id,
                message,
                reply_from,
                extraction_deadline: entered + self.settings.extraction_timeout,
                reply_claimed: AtomicBool::new(false),
            });

            let pipeline = tokio::spawn({
                let this = Arc::clone(self);
                let ctx = Arc::clone(&ctx);
                async move { this.run_pipeline(&ctx).await }.in_current_span()
            });

            match timeout_at(entered + self.settings.request_timeout, pipeline).await {
                Ok(Ok(Ok(()))) => WebhookOutcome::Completed,
                Ok(Ok(Err(err))) => WebhookOutcome::Failed(err),
                Ok(Err(join_err)) => {
                    error!(error = %join_err, "pipeline task failed");
                    let err = PipelineError::InfrastructureFault(join_err.to_string());
                    ctx.transition(PipelineStage::Errored, Some(err.kind()));
                    WebhookOutcome::Failed(err)
                }
                Err(_) => {
                    warn!(
                        elapsed_ms = entered.elapsed().as_millis() as u64,
                        "request deadline elapsed; pipeline result will be discarded"
                    );
                    if ctx.claim_reply() {
                        self.send_best_effort(&ctx, replies::TOOK_TOO_LONG).await;
                    }
                    ctx.transition(PipelineStage::Errored, Some("request_timeout"));
                    WebhookOutcome::TimedOut
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_pipeline(&self, ctx: &RequestContext) -> Result<(), PipelineError> {
        let (chunks, terminal, detail) = match self.produce_reply(ctx).await {
            Ok(chunks) => (chunks, PipelineStage::Delivered, None),
            Err(err) if err.is_soft() => {
                let terminal = match err {
                    PipelineError::NoMedia | PipelineError::AdmissionDenied { .. } => {
                        PipelineStage::Delivered
                    }
                    _ => PipelineStage::Errored,
                };
                info!(kind = err.kind(), error = %err, "answering with soft-failure reply");
                let reply = vec![MessageChunk::new(0, replies::for_error(&err))];
                (reply, terminal, Some(err.kind()))
            }
            Err(err) => {
                error!(kind = err.kind(), error = %err, "pipeline failed");
                if ctx.claim_reply() {
                    self.send_best_effort(ctx, replies::TRY_AGAIN).await;
                }
                ctx.transition(PipelineStage::Errored, Some(err.kind()));
                return Err(err);
            }
        };

        if !ctx.claim_reply() {
            info!("request already answered by the deadline; discarding pipeline result");
            return Ok(());
        }

        match self
            .dispatcher
            .deliver(ctx.message.sender_id(), &ctx.reply_from, &chunks)
            .await
        {
            Ok(outcomes) => {
                info!(chunks = outcomes.len(), "reply delivered");
                ctx.transition(terminal, detail);
                Ok(())
            }
            Err(dispatch) => {
                let err = PipelineError::DeliveryFailed {
                    index: dispatch.index,
                    reason: dispatch.source.message.clone(),
                };
                error!(
                    index = dispatch.index,
                    delivered = dispatch.outcomes.len().saturating_sub(1),
                    error = %dispatch,
                    "reply delivery failed"
                );
                ctx.transition(PipelineStage::Errored, Some(err.kind()));
                Err(err)
            }
        }
    }

    /// The happy path up to formatted chunks. Every early exit is an error.
    async fn produce_reply(&self, ctx: &RequestContext) -> Result<Vec<MessageChunk>, PipelineError> {
        // Checked before admission so greetings never consume quota.
        let media_ref = ctx.message.media_ref().ok_or(PipelineError::NoMedia)?;

        let decision = self
            .admission
            .check_admission(ctx.message.sender_id())
            .await?;
        if !decision.allowed {
            return Err(PipelineError::AdmissionDenied {
                reset_at: decision.reset_at,
                limit: decision.limit,
            });
        }
        ctx.transition(PipelineStage::Admitted, None);

        let media = self.fetcher.fetch_media(media_ref).await?;
        ctx.transition(PipelineStage::MediaResolved, Some(media.content_type.as_str()));

        let extracted = self
            .extractor
            .extract_text(&media.bytes, &media.content_type, ctx.extraction_deadline)
            .await?;
        ctx.transition(PipelineStage::Extracted, None);

        let text = extracted.into_text();
        let chunks = format_for_channel(Some(&text), self.settings.max_chunk_length);
        ctx.transition(
            PipelineStage::Formatted,
            Some(format!("{} chunk(s)", chunks.len()).as_str()),
        );
        Ok(chunks)
    }

    async fn send_best_effort(&self, ctx: &RequestContext, text: &str) {
        let chunk = [MessageChunk::new(0, text)];
        if let Err(err) = self
            .dispatcher
            .deliver(ctx.message.sender_id(), &ctx.reply_from, &chunk)
            .await
        {
            warn!(error = %err, "best-effort reply failed");
        }
    }
}
