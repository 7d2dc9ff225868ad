//! Builds the external clients the webhook controller is injected with.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use docsnap_channels::{
    InMemoryCounterStore, RedisRestCounterStore, TwilioCredentials, TwilioMediaApi,
    TwilioReplySender,
};
use docsnap_config::{CounterStoreKind, DocsnapConfig, VisionProviderKind};
use docsnap_core::{CounterStore, InferenceApi};
use docsnap_gateway::Collaborators;
use docsnap_understanding::{GeminiVision, OpenAiVision};
use tracing::{info, warn};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!("docsnap/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")
}

fn counter_store(config: &DocsnapConfig, client: &reqwest::Client) -> Result<Arc<dyn CounterStore>> {
    let rate = &config.rate_limit;
    match rate.store {
        CounterStoreKind::Memory => {
            warn!("using in-process rate-limit counters; quotas are per worker");
            Ok(Arc::new(InMemoryCounterStore::new()))
        }
        CounterStoreKind::RedisRest => {
            let url = rate.redis_url.as_deref().context("rateLimit.redisUrl is required")?;
            let token = rate
                .redis_token
                .as_deref()
                .context("rateLimit.redisToken is required")?;
            Ok(Arc::new(RedisRestCounterStore::new(client.clone(), url, token)))
        }
    }
}

fn inference(config: &DocsnapConfig, client: &reqwest::Client) -> Result<Arc<dyn InferenceApi>> {
    let extraction = &config.extraction;
    let api_key = extraction
        .api_key
        .clone()
        .context("extraction.apiKey is required")?;

    let provider: Arc<dyn InferenceApi> = match extraction.provider {
        VisionProviderKind::Openai => {
            let mut vision = OpenAiVision::new(client.clone(), api_key);
            if let Some(model) = &extraction.model {
                vision = vision.with_model(model);
            }
            if let Some(base_url) = &extraction.base_url {
                vision = vision.with_base_url(base_url);
            }
            Arc::new(vision)
        }
        VisionProviderKind::Gemini => {
            let mut vision = GeminiVision::new(client.clone(), api_key);
            if let Some(model) = &extraction.model {
                vision = vision.with_model(model);
            }
            if let Some(base_url) = &extraction.base_url {
                vision = vision.with_base_url(base_url);
            }
            Arc::new(vision)
        }
    };
    Ok(provider)
}

pub fn build_collaborators(config: &DocsnapConfig) -> Result<Collaborators> {
    let client = http_client()?;

    let credentials = TwilioCredentials {
        account_sid: config
            .twilio
            .account_sid
            .clone()
            .context("twilio.accountSid is required")?,
        auth_token: config
            .twilio
            .auth_token
            .clone()
            .context("twilio.authToken is required")?,
    };

    let inference = inference(config, &client)?;
    info!(provider = inference.name(), "vision provider ready");

    Ok(Collaborators {
        counter_store: counter_store(config, &client)?,
        media_api: Arc::new(TwilioMediaApi::new(
            client.clone(),
            &config.twilio.base_url,
            credentials.clone(),
        )?),
        inference,
        reply_sender: Arc::new(TwilioReplySender::new(
            client,
            config.twilio.base_url.clone(),
            credentials,
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_config() -> DocsnapConfig {
        let mut config = DocsnapConfig::default();
        config.rate_limit.quota = Some(30);
        config.extraction.api_key = Some("sk-test".into());
        config.twilio.account_sid = Some("AC123".into());
        config.twilio.auth_token = Some("secret".into());
        config
    }

    #[test]
    fn builds_from_complete_config() {
        let clients = build_collaborators(&complete_config()).unwrap();
        assert_eq!(clients.inference.name(), "openai");
    }

    #[test]
    fn gemini_provider_is_selected() {
        let mut config = complete_config();
        config.extraction.provider = VisionProviderKind::Gemini;
        let clients = build_collaborators(&config).unwrap();
        assert_eq!(clients.inference.name(), "gemini");
    }

    #[test]
    fn missing_credentials_are_reported() {
        let mut config = complete_config();
        config.twilio.auth_token = None;
        let err = build_collaborators(&config).err().unwrap();
        assert!(err.to_string().contains("twilio.authToken"));
    }

    #[test]
    fn redis_store_needs_url_and_token() {
        let mut config = complete_config();
        config.rate_limit.store = CounterStoreKind::RedisRest;
        config.rate_limit.redis_url = Some("https://redis.example".into());
        let err = build_collaborators(&config).err().unwrap();
        assert!(err.to_string().contains("redisToken"));
    }
}
