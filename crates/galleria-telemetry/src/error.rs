//! Telemetry error types.

use thiserror::Error;

/// Errors raised while installing the logging subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed or a global subscriber
    /// was already installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),
}
