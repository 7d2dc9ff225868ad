use serde::{Deserialize, Serialize};

/// One inbound message as delivered by the messaging provider.
///
/// Built once per request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    sender_id: String,
    body: Option<String>,
    media_ref: Option<String>,
    message_id: Option<String>,
    origin: Option<String>,
}

impl InboundMessage {
    pub fn new(sender_id: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            body: None,
            media_ref: None,
            message_id: None,
            origin: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_media(mut self, media_ref: impl Into<String>) -> Self {
        self.media_ref = Some(media_ref.into());
        self
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// The address the message was sent to; replies go out from here.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn media_ref(&self) -> Option<&str> {
        self.media_ref.as_deref()
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }
}

/// A bounded-length fragment of a reply. `index` is zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageChunk {
    pub index: usize,
    pub text: String,
}

impl MessageChunk {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Length in characters, which is what the reply channel limits.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed { reason: String },
}

/// Result of sending a single chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub index: usize,
    pub status: DeliveryStatus,
    /// Provider-assigned receipt id, present when the send succeeded.
    pub receipt_id: Option<String>,
}

impl DeliveryOutcome {
    pub fn sent(index: usize, receipt_id: impl Into<String>) -> Self {
        Self {
            index,
            status: DeliveryStatus::Sent,
            receipt_id: Some(receipt_id.into()),
        }
    }

    pub fn failed(index: usize, reason: impl Into<String>) -> Self {
        Self {
            index,
            status: DeliveryStatus::Failed {
                reason: reason.into(),
            },
            receipt_id: None,
        }
    }

    pub fn is_sent(&self) -> bool {
        self.status == DeliveryStatus::Sent
    }
}
