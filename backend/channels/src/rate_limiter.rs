//! Per-sender admission control over a shared counter store.
//!
//! The controller keeps no state of its own: every decision is derived from
//! one atomic increment in the store, so any worker can serve any sender.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use docsnap_core::{CounterStore, RateDecision};
use docsnap_logging::mask_sender;
use tracing::debug;

/// Quota and window applied to every sender.
#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    /// Requests allowed per sender per window.
    pub quota: u32,
    pub window: Duration,
    /// Namespace for counter keys in the shared store.
    pub key_prefix: String,
}

impl AdmissionPolicy {
    pub fn new(quota: u32, window: Duration, key_prefix: impl Into<String>) -> Self {
        Self {
            quota,
            window,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, sender_id: &str) -> String {
        format!("{}:{sender_id}", self.key_prefix)
    }
}

pub struct AdmissionController {
    policy: AdmissionPolicy,
    store: Arc<dyn CounterStore>,
}

impl AdmissionController {
    pub fn new(policy: AdmissionPolicy, store: Arc<dyn CounterStore>) -> Self {
        Self { policy, store }
    }

    pub fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    /// Count this request against the sender's window and decide whether it
    /// may proceed. Increments the shared counter exactly once.
    pub async fn check_admission(&self, sender_id: &str) -> Result<RateDecision> {
        let key = self.policy.key_for(sender_id);
        let state = self
            .store
            .increment(&key, self.policy.window)
            .await
            .context("rate-limit counter store unavailable")?;

        // A store that lost the expiry still gets a full window.
        let ttl = if state.ttl.is_zero() {
            self.policy.window
        } else {
            state.ttl
        };
        let reset_at = Utc::now()
            + chrono::Duration::from_std(ttl).context("rate-limit window out of range")?;

        let limit = self.policy.quota;
        let allowed = state.count <= u64::from(limit);
        let remaining = u64::from(limit).saturating_sub(state.count) as u32;

        debug!(
            sender = %mask_sender(sender_id),
            count = state.count,
            limit,
            allowed,
            "admission check"
        );

        Ok(RateDecision {
            allowed,
            reset_at,
            remaining,
            limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter_store::InMemoryCounterStore;
    use async_trait::async_trait;
    use docsnap_core::CounterState;

    fn controller(quota: u32, window_secs: u64) -> AdmissionController {
        AdmissionController::new(
            AdmissionPolicy::new(quota, Duration::from_secs(window_secs), "test"),
            Arc::new(InMemoryCounterStore::new()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn denies_request_after_quota() {
        let limiter = controller(2, 3600);
        let r1 = limiter.check_admission("whatsapp:+1555").await.unwrap();
        let r2 = limiter.check_admission("whatsapp:+1555").await.unwrap();
        let r3 = limiter.check_admission("whatsapp:+1555").await.unwrap();
        assert!(r1.allowed);
        assert_eq!(r1.remaining, 1);
        assert!(r2.allowed);
        assert_eq!(r2.remaining, 0);
        assert!(!r3.allowed);
        assert!(r3.reset_at > Utc::now());
    }

    #[tokio::test(start_paused = true)]
    async fn allows_again_after_window_resets() {
        let limiter = controller(1, 60);
        assert!(limiter.check_admission("a").await.unwrap().allowed);
        assert!(!limiter.check_admission("a").await.unwrap().allowed);

        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(limiter.check_admission("a").await.unwrap().allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn senders_have_separate_windows() {
        let limiter = controller(1, 60);
        assert!(limiter.check_admission("a").await.unwrap().allowed);
        assert!(limiter.check_admission("b").await.unwrap().allowed);
        assert!(!limiter.check_admission("a").await.unwrap().allowed);
    }

    struct FailingStore;

    #[async_trait]
    impl CounterStore for FailingStore {
        async fn increment(&self, _key: &str, _window: Duration) -> Result<CounterState> {
            anyhow::bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let limiter = AdmissionController::new(
            AdmissionPolicy::new(5, Duration::from_secs(60), "test"),
            Arc::new(FailingStore),
        );
        let err = limiter.check_admission("a").await.unwrap_err();
        assert!(format!("{err:#}").contains("connection refused"));
    }
}
