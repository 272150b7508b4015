//! Configuration sections.
//!
//! Every section rejects unknown keys and fills missing keys with the
//! defaults below, so a file only needs to name what it changes.

use std::net::SocketAddr;
use std::time::Duration;

use galleria_telemetry::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

/// HTTP server settings.
///
/// # Example
///
/// ```
/// use galleria_config::ServerSettings;
///
/// let server = ServerSettings::default();
/// assert_eq!(server.http_addr, "0.0.0.0:8080");
/// assert_eq!(server.shutdown_timeout().as_secs(), 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ServerSettings {
    /// Bind address, `host:port`. Port `0` picks a free port.
    pub http_addr: String,

    /// Upper bound for draining in-flight requests on stop.
    pub shutdown_timeout_secs: u64,

    /// HTTP/1.1 keep-alive.
    pub keep_alive: bool,

    /// Show 5xx messages and details to clients.
    pub expose_internal_errors: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            shutdown_timeout_secs: 30,
            keep_alive: true,
            expose_internal_errors: false,
        }
    }
}

impl ServerSettings {
    /// Parses `http_addr`.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    /// Returns the drain timeout.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingSettings {
    /// Install a subscriber at all.
    pub enabled: bool,

    /// `EnvFilter` directive.
    pub level: String,

    /// `json` or `pretty`.
    pub format: LogFormat,

    /// Colour pretty output.
    pub ansi_enabled: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            ansi_enabled: false,
        }
    }
}

impl LoggingSettings {
    /// Converts into the subscriber configuration.
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format: self.format,
            span_events: false,
            file_line_info: self.format == LogFormat::Pretty,
            ansi: self.ansi_enabled,
        }
    }
}

/// Session cookie settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct SessionSettings {
    /// Cookie name.
    pub cookie_name: String,

    /// Set the `Secure` attribute.
    pub secure: bool,

    /// Cookie lifetime and store idle timeout.
    pub max_age_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: "galleria.sid".to_string(),
            secure: false,
            max_age_secs: 60 * 60 * 24,
        }
    }
}

impl SessionSettings {
    /// Returns the cookie lifetime.
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

/// OpenID Connect client settings.
///
/// Endpoints are derived from `issuer_url` using the Keycloak layout
/// (`{issuer}/protocol/openid-connect/{auth,token,userinfo}`) unless set
/// explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct OidcSettings {
    /// Realm issuer, e.g. `http://localhost:8081/realms/galleria`.
    pub issuer_url: String,

    /// OAuth client id.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: Option<String>,

    /// Callback URL registered with the provider.
    pub redirect_url: String,

    /// Requested scopes.
    pub scopes: Vec<String>,

    /// Authorization endpoint override.
    pub authorize_url: Option<String>,

    /// Token endpoint override.
    pub token_url: Option<String>,

    /// Userinfo endpoint override.
    pub userinfo_url: Option<String>,
}

impl Default for OidcSettings {
    fn default() -> Self {
        Self {
            issuer_url: "http://localhost:8081/realms/galleria".to_string(),
            client_id: "galleria".to_string(),
            client_secret: None,
            redirect_url: "http://localhost:8080/auth/callback".to_string(),
            scopes: vec!["openid".to_string(), "profile".to_string(), "email".to_string()],
            authorize_url: None,
            token_url: None,
            userinfo_url: None,
        }
    }
}

impl OidcSettings {
    fn endpoint(&self, explicit: Option<&String>, suffix: &str) -> String {
        explicit.cloned().unwrap_or_else(|| {
            format!(
                "{}/protocol/openid-connect/{suffix}",
                self.issuer_url.trim_end_matches('/')
            )
        })
    }

    /// Authorization endpoint.
    pub fn authorize_endpoint(&self) -> String {
        self.endpoint(self.authorize_url.as_ref(), "auth")
    }

    /// Token endpoint.
    pub fn token_endpoint(&self) -> String {
        self.endpoint(self.token_url.as_ref(), "token")
    }

    /// Userinfo endpoint.
    pub fn userinfo_endpoint(&self) -> String {
        self.endpoint(self.userinfo_url.as_ref(), "userinfo")
    }
}

/// API documentation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct DocsSettings {
    /// OpenAPI `info.title`.
    pub title: String,

    /// OpenAPI `info.version`.
    pub version: String,

    /// OpenAPI `info.description`.
    pub description: Option<String>,

    /// Directory holding `rapidoc-min.js`.
    pub assets_dir: String,
}

impl Default for DocsSettings {
    fn default() -> Self {
        Self {
            title: "Galleria".to_string(),
            version: "1.0.0".to_string(),
            description: Some("Multi-tenant album management".to_string()),
            assets_dir: "assets".to_string(),
        }
    }
}

/// Server-rendered view settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ViewsSettings {
    /// Directory templates are loaded from.
    pub templates_dir: String,
}

impl Default for ViewsSettings {
    fn default() -> Self {
        Self {
            templates_dir: "templates".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let server = ServerSettings::default();
        assert_eq!(server.socket_addr().unwrap().port(), 8080);
        assert!(server.keep_alive);
        assert!(!server.expose_internal_errors);
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let server: ServerSettings = toml::from_str("shutdown_timeout_secs = 5").unwrap();
        assert_eq!(server.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(server.http_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result: Result<SessionSettings, _> = toml::from_str("cookie = \"x\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_logging_to_log_config() {
        let logging = LoggingSettings {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            ..Default::default()
        };
        let config = logging.to_log_config();
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.file_line_info);
    }

    #[test]
    fn test_oidc_keycloak_endpoints() {
        let oidc = OidcSettings {
            issuer_url: "https://sso.example.com/realms/photos/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            oidc.authorize_endpoint(),
            "https://sso.example.com/realms/photos/protocol/openid-connect/auth"
        );
        assert_eq!(
            oidc.token_endpoint(),
            "https://sso.example.com/realms/photos/protocol/openid-connect/token"
        );
        assert_eq!(
            oidc.userinfo_endpoint(),
            "https://sso.example.com/realms/photos/protocol/openid-connect/userinfo"
        );
    }

    #[test]
    fn test_oidc_explicit_endpoint_wins() {
        let oidc = OidcSettings {
            token_url: Some("https://idp.test/token".to_string()),
            ..Default::default()
        };
        assert_eq!(oidc.token_endpoint(), "https://idp.test/token");
        assert!(oidc.authorize_endpoint().ends_with("/protocol/openid-connect/auth"));
    }

    #[test]
    fn test_session_max_age() {
        assert_eq!(SessionSettings::default().max_age(), Duration::from_secs(86_400));
    }
}
