//! Typed configuration for Galleria.
//!
//! - TOML and JSON files
//! - `.env` files via `dotenvy`
//! - `GALLERIA__SECTION__KEY` environment overrides
//! - strict sections (unknown keys fail) with per-key defaults
//!
//! # Example
//!
//! ```no_run
//! use galleria_config::{ConfigLoader, DEFAULT_ENV_PREFIX};
//!
//! # fn main() -> Result<(), galleria_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("galleria.toml")?
//!     .with_dotenv()?
//!     .with_env_prefix(DEFAULT_ENV_PREFIX)
//!     .load()?;
//!
//! println!("listening on {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # File format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! expose_internal_errors = false
//!
//! [logging]
//! level = "info,galleria_server=debug"
//! format = "json"
//!
//! [session]
//! cookie_name = "galleria.sid"
//! secure = true
//!
//! [oidc]
//! issuer_url = "https://sso.example.com/realms/galleria"
//! client_id = "galleria"
//! redirect_url = "https://albums.example.com/auth/callback"
//!
//! [docs]
//! title = "Galleria"
//! assets_dir = "assets"
//!
//! [views]
//! templates_dir = "templates"
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::GalleriaConfig;
pub use error::ConfigError;
pub use galleria_telemetry::LogFormat;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::{
    DocsSettings, LoggingSettings, OidcSettings, ServerSettings, SessionSettings, ViewsSettings,
};
