//! Layered configuration loading.
//!
//! [`ConfigLoader`] stacks sources, later ones winning key by key:
//!
//! 1. defaults or a preset,
//! 2. TOML/JSON files and strings,
//! 3. `.env` (only fills variables not already set in the process),
//! 4. `PREFIX__SECTION__KEY` environment variables.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::{ConfigError, GalleriaConfig, LogFormat};

/// Environment prefix used by the Galleria binary.
pub const DEFAULT_ENV_PREFIX: &str = "GALLERIA";

/// Configuration loader with a layered approach.
///
/// # Example
///
/// ```no_run
/// use galleria_config::ConfigLoader;
///
/// # fn main() -> Result<(), galleria_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_production()
///     .with_optional_file("galleria.toml")?
///     .with_dotenv()?
///     .with_env_prefix("GALLERIA")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: Value,
    env_prefix: Option<String>,
    files_loaded: Vec<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader seeded with [`GalleriaConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: to_value(&GalleriaConfig::default()),
            env_prefix: None,
            files_loaded: Vec::new(),
        }
    }

    /// Resets the base layer to the defaults.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = to_value(&GalleriaConfig::default());
        self
    }

    /// Resets the base layer to [`GalleriaConfig::development`].
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = to_value(&GalleriaConfig::development());
        self
    }

    /// Resets the base layer to [`GalleriaConfig::production`].
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = to_value(&GalleriaConfig::production());
        self
    }

    /// Merges a TOML (`.toml`) or JSON (`.json`) file.
    ///
    /// # Errors
    ///
    /// The file is missing, unreadable, has another extension, or does not
    /// parse.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        let layer = parse_layer(&content, &format)?;
        merge(&mut self.config, layer);
        self.files_loaded.push(path.display().to_string());

        tracing::debug!(path = %path.display(), "configuration file loaded");
        Ok(self)
    }

    /// Merges a file if it exists.
    ///
    /// # Errors
    ///
    /// The file exists but cannot be read or parsed.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Merges configuration text in the named format (`toml` or `json`).
    ///
    /// # Errors
    ///
    /// Unknown format or parse failure.
    ///
    /// # Example
    ///
    /// ```
    /// use galleria_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[server]\nhttp_addr = \"127.0.0.1:3000\"\n", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.server.http_addr, "127.0.0.1:3000");
    /// assert_eq!(config.server.shutdown_timeout_secs, 30);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let layer = parse_layer(content, &format.to_lowercase())?;
        merge(&mut self.config, layer);
        Ok(self)
    }

    /// Enables `PREFIX__SECTION__KEY` overrides at [`load`](Self::load).
    ///
    /// With prefix `GALLERIA`, `GALLERIA__SERVER__HTTP_ADDR=0.0.0.0:9000`
    /// sets `server.http_addr`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads `.env` from the working directory or its parents.
    ///
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// The file exists but is malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "loaded .env");
                Ok(self)
            }
            Err(err) if err.not_found() => Ok(self),
            Err(err) => Err(err.into()),
        }
    }

    /// Files merged so far, in order.
    pub fn files_loaded(&self) -> &[String] {
        &self.files_loaded
    }

    /// Applies environment overrides, deserializes and validates.
    ///
    /// # Errors
    ///
    /// An override cannot be parsed, a layer has unknown keys or wrong
    /// types, or [`GalleriaConfig::validate`] fails.
    pub fn load(self) -> Result<GalleriaConfig, ConfigError> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load) without [`GalleriaConfig::validate`].
    ///
    /// # Errors
    ///
    /// An override cannot be parsed or a layer does not deserialize.
    pub fn load_unvalidated(mut self) -> Result<GalleriaConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars: BTreeMap<String, String> = env::vars()
                .filter(|(k, _)| k.starts_with(&prefix))
                .collect();
            for (key, value) in &vars {
                self.apply_env_var(key, value, &prefix)?;
            }
        }

        Ok(serde_json::from_value(self.config)?)
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(path) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix("__")) else {
            return Ok(());
        };

        let parts: Vec<String> = path.split("__").map(str::to_lowercase).collect();
        let parsed = match parts.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["server", "http_addr"]
            | ["logging", "level"]
            | ["session", "cookie_name"]
            | ["oidc", "issuer_url" | "client_id" | "redirect_url"]
            | ["docs", "title" | "version" | "assets_dir"]
            | ["views", "templates_dir"] => Value::String(value.to_string()),

            ["oidc", "client_secret" | "authorize_url" | "token_url" | "userinfo_url"]
            | ["docs", "description"] => optional_string(value),

            ["server", "shutdown_timeout_secs"] | ["session", "max_age_secs"] => {
                let n: u64 = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
                Value::from(n)
            }

            ["server", "keep_alive" | "expose_internal_errors"]
            | ["logging", "enabled" | "ansi_enabled"]
            | ["session", "secure"] => Value::Bool(
                parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?,
            ),

            ["logging", "format"] => {
                let format: LogFormat = value
                    .parse()
                    .map_err(|reason: String| ConfigError::env_parse_error(key, reason))?;
                Value::String(format.to_string())
            }

            ["oidc", "scopes"] => Value::Array(
                value
                    .split([',', ' '])
                    .filter(|s| !s.is_empty())
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
            ),

            _ => {
                tracing::debug!(var = key, "ignoring unknown configuration variable");
                return Ok(());
            }
        };

        let mut layer = parsed;
        for part in parts.iter().rev() {
            let mut map = Map::new();
            map.insert(part.clone(), layer);
            layer = Value::Object(map);
        }
        merge(&mut self.config, layer);
        Ok(())
    }
}

fn to_value(config: &GalleriaConfig) -> Value {
    // A struct of strings, numbers and vectors always serializes.
    serde_json::to_value(config).unwrap_or_else(|_| Value::Object(Map::new()))
}

fn parse_layer(content: &str, format: &str) -> Result<Value, ConfigError> {
    match format {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// Deep-merges `layer` into `base`; objects merge per key, anything else
/// replaces.
fn merge(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

fn optional_string(value: &str) -> Value {
    if value.is_empty() {
        Value::Null
    } else {
        Value::String(value.to_string())
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
