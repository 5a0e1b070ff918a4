//! Structured logging initialization.
//!
//! Environment-aware tracing setup used by binaries and integration harnesses
//! embedding the engine. Library code only emits `tracing` events and never
//! installs a subscriber on its own.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific defaults.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let default_level = get_log_level(&environment);
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true),
        );

        // A global subscriber may already be set by the embedding process
        if subscriber.try_init().is_err() {
            tracing::debug!("global tracing subscriber already initialized");
        }
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("STRATUS_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get default log level for an environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("test"), "debug");
    }
}
