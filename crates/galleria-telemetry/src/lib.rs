//! Structured logging for Galleria services.
//!
//! Everything in Galleria reports through `tracing`. This crate installs the
//! process-wide subscriber once, at startup:
//!
//! - `json` output for production, one object per event with the span
//!   fields (`request_id`, `endpoint`, `tenant_id`) attached,
//! - `pretty` output for local development.
//!
//! The level is an [`EnvFilter`](tracing_subscriber::EnvFilter) directive,
//! so `info,galleria_server=debug` works as well as a bare level.
//!
//! # Example
//!
//! ```rust,no_run
//! use galleria_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development()).expect("logging");
//! tracing::info!(user_id = "u-1", "signed in");
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
