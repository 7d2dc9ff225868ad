//! docsnap runtime configuration schema.
//!
//! Every section is optional in the file and falls back to the values in
//! [`crate::defaults`]. The rate-limit quota has no default and must be set.

use serde::{Deserialize, Serialize};

use crate::defaults;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocsnapConfig {
    /// HTTP listener
    pub server: ServerConfig,

    /// Per-sender admission control
    pub rate_limit: RateLimitConfig,

    /// Media download limits
    pub media: MediaConfig,

    /// Vision provider and extraction deadline
    pub extraction: ExtractionConfig,

    /// Reply formatting
    pub formatting: FormattingConfig,

    /// Reply delivery
    pub delivery: DeliveryConfig,

    /// Messaging provider credentials
    pub twilio: TwilioConfig,

    /// Webhook request handling
    pub webhook: WebhookConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::DEFAULT_HOST.to_string(),
            port: defaults::DEFAULT_PORT,
        }
    }
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CounterStoreKind {
    /// In-process counters. Only correct with a single worker.
    #[default]
    Memory,
    /// Redis over its HTTPS REST interface.
    RedisRest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RateLimitConfig {
    /// Requests allowed per sender per window. Required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<u32>,
    pub window_secs: u64,
    pub key_prefix: String,
    pub store: CounterStoreKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_token: Option<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            quota: None,
            window_secs: defaults::DEFAULT_RATE_WINDOW_SECS,
            key_prefix: defaults::DEFAULT_RATE_KEY_PREFIX.to_string(),
            store: CounterStoreKind::default(),
            redis_url: None,
            redis_token: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaConfig {
    pub max_bytes: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_bytes: defaults::DEFAULT_MEDIA_MAX_BYTES,
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisionProviderKind {
    #[default]
    Openai,
    Gemini,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractionConfig {
    pub provider: VisionProviderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model id; each provider has its own default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Override the provider's API base URL (proxies, compatible servers).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub max_tokens: u32,
    /// Extraction deadline, measured from request entry.
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            provider: VisionProviderKind::default(),
            api_key: None,
            model: None,
            base_url: None,
            max_tokens: defaults::DEFAULT_MAX_TOKENS,
            timeout_secs: defaults::DEFAULT_EXTRACTION_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting and delivery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormattingConfig {
    pub max_chunk_length: usize,
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            max_chunk_length: defaults::DEFAULT_MAX_CHUNK_LENGTH,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeliveryConfig {
    pub pacing_ms: u64,
    /// Sender address for replies when the inbound message has no `To`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_number: Option<String>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            pacing_ms: defaults::DEFAULT_PACING_MS,
            from_number: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TwilioConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_sid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    pub base_url: String,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            base_url: defaults::DEFAULT_TWILIO_BASE_URL.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Webhook
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebhookConfig {
    pub path: String,
    /// Overall request deadline, measured from request entry.
    pub request_timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            path: defaults::DEFAULT_WEBHOOK_PATH.to_string(),
            request_timeout_secs: defaults::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    /// Directory for daily rolling NDJSON logs. Console only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::default(),
            dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_uses_defaults() {
        let cfg: DocsnapConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg.server.port, defaults::DEFAULT_PORT);
        assert_eq!(cfg.formatting.max_chunk_length, 1500);
        assert_eq!(cfg.delivery.pacing_ms, 1000);
        assert_eq!(cfg.webhook.request_timeout_secs, 8);
        assert!(cfg.rate_limit.quota.is_none());
    }

    #[test]
    fn camel_case_keys_parse() {
        let yaml = r#"
rateLimit:
  quota: 30
  windowSecs: 3600
  store: redisRest
  redisUrl: https://redis.example
extraction:
  provider: gemini
  maxTokens: 512
"#;
        let cfg: DocsnapConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.rate_limit.quota, Some(30));
        assert_eq!(cfg.rate_limit.store, CounterStoreKind::RedisRest);
        assert_eq!(cfg.extraction.provider, VisionProviderKind::Gemini);
        assert_eq!(cfg.extraction.max_tokens, 512);
        assert_eq!(
            cfg.extraction.timeout_secs,
            defaults::DEFAULT_EXTRACTION_TIMEOUT_SECS
        );
    }
}
