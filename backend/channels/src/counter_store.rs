//! Counter store backends for admission control.
//!
//! `InMemoryCounterStore` is for single-process deployments and tests.
//! `RedisRestCounterStore` talks to Redis over its HTTPS REST interface so
//! every worker shares the same counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use docsnap_core::{CounterState, CounterStore};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

const CLEANUP_EVERY_INCREMENTS: u64 = 512;

struct Bucket {
    count: u64,
    expires_at: Instant,
}

#[derive(Default)]
pub struct InMemoryCounterStore {
    buckets: Mutex<HashMap<String, Bucket>>,
    increments_seen: AtomicU64,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired bucket.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        self.buckets
            .lock()
            .await
            .retain(|_, bucket| bucket.expires_at > now);
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<CounterState> {
        let now = Instant::now();
        let state = {
            let mut buckets = self.buckets.lock().await;
            let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
                count: 0,
                expires_at: now + window,
            });
            if bucket.expires_at <= now {
                bucket.count = 0;
                bucket.expires_at = now + window;
            }
            bucket.count += 1;
            CounterState {
                count: bucket.count,
                ttl: bucket.expires_at.saturating_duration_since(now),
            }
        };

        let seen = self.increments_seen.fetch_add(1, Ordering::Relaxed) + 1;
        if seen % CLEANUP_EVERY_INCREMENTS == 0 {
            self.cleanup().await;
        }
        Ok(state)
    }
}

/// One entry of a REST pipeline/transaction response.
#[derive(Debug, Deserialize)]
struct RestReply {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl RestReply {
    fn as_i64(&self, command: &str) -> Result<i64> {
        if let Some(err) = &self.error {
            bail!("{command} failed: {err}");
        }
        self.result
            .as_ref()
            .and_then(serde_json::Value::as_i64)
            .with_context(|| format!("{command} returned a non-integer result"))
    }
}

pub struct RedisRestCounterStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl RedisRestCounterStore {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl CounterStore for RedisRestCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<CounterState> {
        let window_ms = window.as_millis().to_string();
        // INCR and the NX expiry run as one transaction so the first hit
        // in a window always arms the expiry.
        let commands = serde_json::json!([
            ["INCR", key],
            ["PEXPIRE", key, window_ms, "NX"],
            ["PTTL", key],
        ]);

        let resp = self
            .client
            .post(format!("{}/multi-exec", self.base_url))
            .bearer_auth(&self.token)
            .json(&commands)
            .send()
            .await
            .context("counter store request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("counter store returned {status}: {body}");
        }

        let replies: Vec<RestReply> = resp
            .json()
            .await
            .context("counter store returned an unreadable body")?;
        let [incr, _expire, pttl] = replies.as_slice() else {
            bail!("counter store returned {} replies, expected 3", replies.len());
        };

        let count = incr.as_i64("INCR")?;
        let ttl_ms = pttl.as_i64("PTTL")?;
        debug!(count, ttl_ms, "counter incremented");

        Ok(CounterState {
            count: u64::try_from(count).unwrap_or(0),
            // PTTL is negative when the key has no expiry.
            ttl: Duration::from_millis(u64::try_from(ttl_ms).unwrap_or(0)),
        })
    }
}
