//! Tracing-subscriber initialization: pretty console output or structured
//! JSON, selected by config.

use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::infrastructure::config::LogFormat;

/// Installs the global tracing subscriber. Call once at process start.
pub fn init(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => {
            registry.with(fmt::layer().json().with_target(true).with_current_span(true)).init();
        }
        LogFormat::Pretty => {
            registry.with(fmt::layer().with_target(false).compact()).init();
        }
    }
}
