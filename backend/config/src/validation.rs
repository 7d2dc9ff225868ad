//! Config validation: collects every problem in one pass with field paths.

use crate::defaults::MAX_TIMEOUT_SECS;
use crate::schema::{CounterStoreKind, DocsnapConfig};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &DocsnapConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_rate_limit(config, &mut report);
    validate_media(config, &mut report);
    validate_extraction(config, &mut report);
    validate_formatting(config, &mut report);
    validate_provider(config, &mut report);
    validate_server(config, &mut report);
    report
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).map(str::is_empty).unwrap_or(true)
}

fn validate_rate_limit(config: &DocsnapConfig, report: &mut ValidationReport) {
    let rl = &config.rate_limit;
    match rl.quota {
        None => report.error("rateLimit.quota", "quota is required; there is no default"),
        Some(0) => report.error("rateLimit.quota", "quota must be >= 1"),
        Some(_) => {}
    }
    if rl.window_secs == 0 {
        report.error("rateLimit.windowSecs", "windowSecs must be >= 1");
    }
    match rl.store {
        CounterStoreKind::RedisRest => {
            if is_blank(&rl.redis_url) {
                report.error("rateLimit.redisUrl", "redisUrl is required for the redisRest store");
            }
            if is_blank(&rl.redis_token) {
                report.error("rateLimit.redisToken", "redisToken is required for the redisRest store");
            }
        }
        CounterStoreKind::Memory => report.warn(
            "rateLimit.store",
            "memory counters are per-process; use redisRest when running more than one worker",
        ),
    }
}

fn validate_media(config: &DocsnapConfig, report: &mut ValidationReport) {
    if config.media.max_bytes == 0 {
        report.error("media.maxBytes", "maxBytes must be > 0");
    }
}

fn validate_extraction(config: &DocsnapConfig, report: &mut ValidationReport) {
    let ex = &config.extraction;
    if is_blank(&ex.api_key) {
        report.error("extraction.apiKey", "vision provider API key is required");
    }
    if ex.max_tokens == 0 {
        report.error("extraction.maxTokens", "maxTokens must be >= 1");
    }
    if ex.timeout_secs == 0 {
        report.error("extraction.timeoutSecs", "timeoutSecs must be >= 1");
    }
    if config.webhook.request_timeout_secs == 0 {
        report.error("webhook.requestTimeoutSecs", "requestTimeoutSecs must be >= 1");
    }
    if ex.timeout_secs > MAX_TIMEOUT_SECS {
        report.error(
            "extraction.timeoutSecs",
            format!("timeoutSecs must be <= {MAX_TIMEOUT_SECS}"),
        );
    }
    if config.webhook.request_timeout_secs > MAX_TIMEOUT_SECS {
        report.error(
            "webhook.requestTimeoutSecs",
            format!("requestTimeoutSecs must be <= {MAX_TIMEOUT_SECS}"),
        );
    }
    if ex.timeout_secs >= config.webhook.request_timeout_secs {
        report.warn(
            "extraction.timeoutSecs",
            format!(
                "extraction timeout ({}s) is not below the request timeout ({}s); slow extractions will end in a 504",
                ex.timeout_secs, config.webhook.request_timeout_secs
            ),
        );
    }
}

fn validate_formatting(config: &DocsnapConfig, report: &mut ValidationReport) {
    // Room for the longest part marker plus some text.
    if config.formatting.max_chunk_length < 64 {
        report.error("formatting.maxChunkLength", "maxChunkLength must be >= 64");
    }
}

fn validate_provider(config: &DocsnapConfig, report: &mut ValidationReport) {
    if is_blank(&config.twilio.account_sid) {
        report.error("twilio.accountSid", "account SID is required");
    }
    if is_blank(&config.twilio.auth_token) {
        report.error("twilio.authToken", "auth token is required");
    }
    if is_blank(&config.delivery.from_number) {
        report.warn(
            "delivery.fromNumber",
            "no fromNumber; replies will use the inbound message's To address",
        );
    }
}

fn validate_server(config: &DocsnapConfig, report: &mut ValidationReport) {
    let port = config.server.port;
    if port < 1024 && port != 80 && port != 443 {
        report.warn(
            "server.port",
            format!("Port {port} requires elevated privileges; consider using a port >= 1024"),
        );
    }
    if !config.webhook.path.starts_with('/') {
        report.error("webhook.path", "path must start with '/'");
    }
}
