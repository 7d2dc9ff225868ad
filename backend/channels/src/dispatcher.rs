//! Ordered, paced delivery of a reply's chunk sequence.

use std::sync::Arc;
use std::time::Duration;

use docsnap_core::{DeliveryOutcome, MessageChunk, ReplySender, SendError};
use docsnap_logging::mask_sender;
use thiserror::Error;
use tracing::{info, warn};

/// The first chunk that could not be sent. Chunks before it stay delivered.
#[derive(Debug, Error)]
#[error("delivery of chunk {index} failed: {source}")]
pub struct DispatchError {
    pub index: usize,
    #[source]
    pub source: SendError,
    /// Outcomes up to and including the failed chunk.
    pub outcomes: Vec<DeliveryOutcome>,
}

pub struct ReplyDispatcher {
    sender: Arc<dyn ReplySender>,
    pacing: Duration,
}

impl ReplyDispatcher {
    pub fn new(sender: Arc<dyn ReplySender>, pacing: Duration) -> Self {
        Self { sender, pacing }
    }

    /// Send `chunks` to `to` in index order, pausing between sends.
    ///
    /// Stops at the first failure. Nothing is retried or retracted.
    pub async fn deliver(
        &self,
        to: &str,
        from: &str,
        chunks: &[MessageChunk],
    ) -> Result<Vec<DeliveryOutcome>, DispatchError> {
        let mut ordered: Vec<&MessageChunk> = chunks.iter().collect();
        ordered.sort_by_key(|chunk| chunk.index);

        let mut outcomes = Vec::with_capacity(ordered.len());
        for (position, chunk) in ordered.into_iter().enumerate() {
            if position > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            match self.sender.send(to, from, &chunk.text).await {
                Ok(receipt) => {
                    info!(
                        to = %mask_sender(to),
                        index = chunk.index,
                        total = chunks.len(),
                        receipt = %receipt,
                        "reply chunk sent"
                    );
                    outcomes.push(DeliveryOutcome::sent(chunk.index, receipt));
                }
                Err(source) => {
                    warn!(
                        to = %mask_sender(to),
                        index = chunk.index,
                        status = ?source.status,
                        code = ?source.code,
                        "reply chunk failed; aborting remaining chunks"
                    );
                    outcomes.push(DeliveryOutcome::failed(chunk.index, source.message.clone()));
                    return Err(DispatchError {
                        index: chunk.index,
                        source,
                        outcomes,
                    });
                }
            }
        }
        Ok(outcomes)
    }
}
