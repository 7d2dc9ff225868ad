//! `docsnap-config` - runtime configuration for the docsnap webhook.
//!
//! Provides:
//! - Typed config schema (server, rate limit, media, extraction, formatting, delivery, provider)
//! - YAML loading with `${ENV_VAR}` substitution
//! - Default values for everything except the rate-limit quota
//! - Validation with errors and warnings
//! - Redaction for safe display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, parse_config};
pub use redact::redact;
pub use schema::{
    CounterStoreKind, DeliveryConfig, DocsnapConfig, ExtractionConfig, FormattingConfig,
    LogFormat, LoggingConfig, MediaConfig, RateLimitConfig, ServerConfig, TwilioConfig,
    VisionProviderKind, WebhookConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Result};
use std::path::Path;

/// Log a config's warnings and fail if it has any validation errors.
pub fn ensure_valid(config: &DocsnapConfig, path: &Path) -> Result<()> {
    let report = validate(config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        bail!(
            "config at {} has {} error(s)",
            path.display(),
            report.errors.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_valid_rejects_missing_quota() {
        let err = ensure_valid(&DocsnapConfig::default(), Path::new("config.yaml")).unwrap_err();
        assert!(err.to_string().contains("error(s)"));
    }

    #[test]
    fn ensure_valid_accepts_complete_config() {
        let mut config = DocsnapConfig::default();
        config.rate_limit.quota = Some(30);
        config.extraction.api_key = Some("sk-test".into());
        config.twilio.account_sid = Some("AC123".into());
        config.twilio.auth_token = Some("secret".into());
        assert!(ensure_valid(&config, Path::new("config.yaml")).is_ok());
    }
}
