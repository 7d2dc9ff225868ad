//! Default values for every setting that has one.
//!
//! The rate-limit quota is deliberately absent: it must come from config.

pub const DEFAULT_HOST: &str = "0.0.0.0";

pub const DEFAULT_PORT: u16 = 3000;

/// One hour admission window.
pub const DEFAULT_RATE_WINDOW_SECS: u64 = 3600;

pub const DEFAULT_RATE_KEY_PREFIX: &str = "docsnap:ratelimit";

/// 20 MiB. Media comes from the provider's store, not a direct upload.
pub const DEFAULT_MEDIA_MAX_BYTES: u64 = 20 * 1024 * 1024;

/// Token budget for one OCR completion.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

pub const DEFAULT_EXTRACTION_TIMEOUT_SECS: u64 = 7;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 8;

/// Upper bound for either timeout. A webhook caller gives up long before this.
pub const MAX_TIMEOUT_SECS: u64 = 300;

pub const DEFAULT_MAX_CHUNK_LENGTH: usize = 1500;

pub const DEFAULT_PACING_MS: u64 = 1000;

pub const DEFAULT_TWILIO_BASE_URL: &str = "https://api.twilio.com";

pub const DEFAULT_WEBHOOK_PATH: &str = "/webhook";

pub const DEFAULT_LOG_LEVEL: &str = "info";
