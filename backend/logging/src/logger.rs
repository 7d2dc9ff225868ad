//! Structured Logger
//!
//! Wraps `tracing` with a console layer (pretty or JSON), an optional daily
//! rolling NDJSON file, and environment-based level control.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global logger. `RUST_LOG` takes precedence over `level`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logger(level: &str, json: bool, log_dir: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stdout)
            .with_current_span(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false)
            .with_ansi(true)
            .boxed()
    };

    // Rolling file appender: writes NDJSON to `<dir>/docsnap.log.YYYY-MM-DD`
    let file_layer = log_dir.map(|dir| {
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, "docsnap.log");
        fmt::layer()
            .json()
            .with_writer(appender)
            .with_ansi(false)
            .boxed()
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
