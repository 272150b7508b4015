//! The root configuration type.

use serde::{Deserialize, Serialize};

use crate::{
    ConfigError, DocsSettings, LoggingSettings, OidcSettings, ServerSettings, SessionSettings,
    ViewsSettings,
};
use galleria_telemetry::LogFormat;

/// Complete Galleria configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to layer files and environment
/// variables on top of the defaults.
///
/// # Example
///
/// ```
/// use galleria_config::GalleriaConfig;
///
/// let config = GalleriaConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct GalleriaConfig {
    /// HTTP server.
    #[serde(default)]
    pub server: ServerSettings,

    /// Structured logging.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Session cookie.
    #[serde(default)]
    pub session: SessionSettings,

    /// Identity provider.
    #[serde(default)]
    pub oidc: OidcSettings,

    /// API documentation.
    #[serde(default)]
    pub docs: DocsSettings,

    /// Server-rendered views.
    #[serde(default)]
    pub views: ViewsSettings,
}

impl GalleriaConfig {
    /// Checks cross-field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// - `server.http_addr` is not a socket address
    /// - `server.shutdown_timeout_secs` or `session.max_age_secs` is zero
    /// - `session.cookie_name` is empty or not a cookie token
    /// - `oidc.issuer_url`, `oidc.client_id` or `oidc.redirect_url` is empty
    /// - `oidc.scopes` does not contain `openid`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.socket_addr().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.shutdown_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "server.shutdown_timeout_secs",
                "must be greater than zero",
            ));
        }

        let cookie = &self.session.cookie_name;
        if cookie.is_empty()
            || !cookie
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
        {
            return Err(ConfigError::invalid_value(
                "session.cookie_name",
                format!("not a valid cookie name: '{cookie}'"),
            ));
        }

        if self.session.max_age_secs == 0 {
            return Err(ConfigError::invalid_value(
                "session.max_age_secs",
                "must be greater than zero",
            ));
        }

        for (field, value) in [
            ("oidc.issuer_url", &self.oidc.issuer_url),
            ("oidc.client_id", &self.oidc.client_id),
            ("oidc.redirect_url", &self.oidc.redirect_url),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::missing_field(field));
            }
        }

        if !self.oidc.scopes.iter().any(|s| s == "openid") {
            return Err(ConfigError::invalid_value(
                "oidc.scopes",
                "must include 'openid'",
            ));
        }

        Ok(())
    }

    /// Local development preset: pretty debug logs, internal errors shown.
    ///
    /// ```
    /// use galleria_config::GalleriaConfig;
    ///
    /// let config = GalleriaConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// assert!(config.server.expose_internal_errors);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi_enabled = true;

        config.server.expose_internal_errors = true;
        config.server.shutdown_timeout_secs = 5;

        config
    }

    /// Production preset: JSON logs at `info`, secure cookies, masked 5xx.
    ///
    /// ```
    /// use galleria_config::GalleriaConfig;
    /// use galleria_config::LogFormat;
    ///
    /// let config = GalleriaConfig::production();
    /// assert_eq!(config.logging.format, LogFormat::Json);
    /// assert!(config.session.secure);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi_enabled = false;

        config.server.expose_internal_errors = false;
        config.session.secure = true;

        config
    }
}
