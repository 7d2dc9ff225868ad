//! Fake collaborators for controller and route tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use docsnap_channels::InMemoryCounterStore;
use docsnap_core::{
    CounterState, CounterStore, InferenceApi, InferenceError, MediaApi, MediaLocation,
    ReplySender, SendError, VisionRequest,
};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::controller::{Collaborators, PipelineSettings, WebhookController};

pub struct FakeMedia {
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl FakeMedia {
    pub fn jpeg() -> Self {
        Self {
            content_type: "image/jpeg",
            body: vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00],
        }
    }

    pub fn html() -> Self {
        Self {
            content_type: "text/html",
            body: b"<html>login</html>".to_vec(),
        }
    }
}

#[async_trait]
impl MediaApi for FakeMedia {
    async fn resolve(&self, media_ref: &str) -> Result<MediaLocation> {
        Ok(MediaLocation {
            url: media_ref.to_string(),
            content_type: None,
            size_bytes: None,
        })
    }

    async fn download(
        &self,
        _location: &MediaLocation,
        _max_bytes: u64,
    ) -> Result<(Bytes, Option<String>)> {
        Ok((
            Bytes::from(self.body.clone()),
            Some(self.content_type.to_string()),
        ))
    }
}

pub enum InferenceBehavior {
    Answer(String),
    Unreachable,
    Hang(Duration),
}

pub struct FakeInference {
    pub behavior: InferenceBehavior,
    pub calls: AtomicUsize,
}

impl FakeInference {
    pub fn answering(text: impl Into<String>) -> Self {
        Self::new(InferenceBehavior::Answer(text.into()))
    }

    pub fn new(behavior: InferenceBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceApi for FakeInference {
    fn name(&self) -> &str {
        "fake"
    }

    async fn infer(&self, _request: &VisionRequest) -> Result<Option<String>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            InferenceBehavior::Answer(text) => Ok(Some(text.clone())),
            InferenceBehavior::Unreachable => {
                Err(InferenceError::Transport("connection refused".into()))
            }
            InferenceBehavior::Hang(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(Some("late answer".into()))
            }
        }
    }
}

/// Records every reply with the (possibly paused) clock time it was sent.
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<(String, String, Instant)>>,
    pub fail: bool,
}

impl RecordingSender {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub async fn bodies(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|(_, body, _)| body.clone())
            .collect()
    }
}

#[async_trait]
impl ReplySender for RecordingSender {
    async fn send(&self, to: &str, _from: &str, body: &str) -> Result<String, SendError> {
        if self.fail {
            return Err(SendError {
                status: Some(400),
                code: Some(63016),
                message: "outside the allowed window".into(),
                payload: None,
            });
        }
        let mut sent = self.sent.lock().await;
        sent.push((to.to_string(), body.to_string(), Instant::now()));
        Ok(format!("SM{}", sent.len()))
    }
}

pub struct BrokenCounterStore;

#[async_trait]
impl CounterStore for BrokenCounterStore {
    async fn increment(&self, _key: &str, _window: Duration) -> Result<CounterState> {
        anyhow::bail!("connection refused")
    }
}

pub fn settings(quota: u32) -> PipelineSettings {
    PipelineSettings {
        quota,
        window: Duration::from_secs(3600),
        key_prefix: "test".into(),
        media_max_bytes: 1024 * 1024,
        max_tokens: 1024,
        extraction_timeout: Duration::from_secs(7),
        request_timeout: Duration::from_secs(8),
        max_chunk_length: 1500,
        pacing: Duration::from_secs(1),
        from_number: None,
    }
}

/// Fakes plus the controller wired over them.
pub struct Harness {
    pub inference: Arc<FakeInference>,
    pub sender: Arc<RecordingSender>,
    pub controller: Arc<WebhookController>,
}

impl Harness {
    pub fn new(settings: PipelineSettings, media: FakeMedia, inference: FakeInference) -> Self {
        Self::with(
            settings,
            Arc::new(InMemoryCounterStore::new()),
            media,
            inference,
            RecordingSender::default(),
        )
    }

    pub fn with(
        settings: PipelineSettings,
        counter_store: Arc<dyn CounterStore>,
        media: FakeMedia,
        inference: FakeInference,
        sender: RecordingSender,
    ) -> Self {
        let inference = Arc::new(inference);
        let sender = Arc::new(sender);
        let controller = Arc::new(WebhookController::new(
            Collaborators {
                counter_store,
                media_api: Arc::new(media),
                inference: inference.clone(),
                reply_sender: sender.clone(),
            },
            settings,
        ));
        Self {
            inference,
            sender,
            controller,
        }
    }
}
