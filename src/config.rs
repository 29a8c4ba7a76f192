//! Configuration parsing and validation for chat-relay.
//!
//! Settings come from an optional TOML file and are then overridden by
//! environment variables. The result is an immutable [`Config`] that is
//! handed to the server once at startup.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

/// Environment variable holding the upstream API key.
pub const API_KEY_ENV: &str = "GROK_API_KEY";
/// Environment variable overriding the upstream endpoint URL.
pub const API_URL_ENV: &str = "GROK_API_URL";
/// Environment variable overriding the primary model.
pub const MODEL_ENV: &str = "GROK_MODEL";
/// Environment variable setting the fallback model.
pub const FALLBACK_MODEL_ENV: &str = "GROK_FALLBACK_MODEL";
/// Environment variable overriding the listen port.
pub const PORT_ENV: &str = "PORT";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:5000")
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Directory containing the frontend `index.html`
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

fn default_listen() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_static_dir() -> String {
    "static".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            static_dir: default_static_dir(),
        }
    }
}

/// Upstream chat-completion API configuration.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamConfig {
    /// Bearer token sent to the upstream; requests are refused while unset
    pub api_key: Option<ApiKey>,
    /// Full chat-completions endpoint URL
    pub url: String,
    /// Primary model identifier
    pub model: String,
    /// Model retried once when the primary is reported as not found
    pub fallback_model: Option<String>,
    /// Timeout applied to each upstream call independently
    pub timeout_secs: u64,
}

pub const DEFAULT_UPSTREAM_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn default_upstream_url() -> String {
    DEFAULT_UPSTREAM_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            url: default_upstream_url(),
            model: default_model(),
            fallback_model: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl UpstreamConfig {
    /// The fallback model, if one is configured and differs from the primary.
    pub fn effective_fallback(&self) -> Option<&str> {
        self.fallback_model
            .as_deref()
            .filter(|fallback| *fallback != self.model)
    }
}

/// API key wrapper that redacts in Debug/Display/Serialize and zeroizes on drop.
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Access the raw key value. Every call site is auditable via `grep expose_secret`.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for ApiKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| ApiKey(SecretString::from(s)))
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        ApiKey(SecretString::from(s))
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        ApiKey(SecretString::from(s))
    }
}

/// How the upstream API key was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum KeySource {
    /// Key was a literal string in the config file
    Literal,
    /// Key contained ${VAR} references expanded from environment
    EnvExpanded,
    /// Key was taken from an environment variable (holds var name)
    Environment(String),
    /// No key available
    None,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Literal => write!(f, "config-literal"),
            KeySource::EnvExpanded => write!(f, "env-expanded"),
            KeySource::Environment(var) => write!(f, "environment ({})", var),
            KeySource::None => write!(f, "none"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default log level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable '{var}' not set: {message}")]
    EnvVar { var: String, message: String },
}

/// Raw upstream config deserialized directly from TOML.
/// `api_key` may contain `${VAR}` references not yet expanded.
#[derive(Debug, Default, Deserialize)]
pub struct RawUpstreamConfig {
    api_key: Option<String>,
    url: Option<String>,
    model: Option<String>,
    fallback_model: Option<String>,
    timeout_secs: Option<u64>,
}

/// Raw configuration deserialized directly from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    upstream: RawUpstreamConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl RawConfig {
    /// Parse raw configuration from a TOML string.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Read and parse raw configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;
        Self::parse_str(&content)
    }
}

/// Expand all `${VAR}` references in a string using a custom lookup function.
///
/// Supports multiple `${VAR}` in one string. Fails on the first missing
/// variable, unclosed `${`, or empty variable name.
fn expand_env_vars_with<F>(input: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !input.contains("${") {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let end = after.find('}').ok_or_else(|| ConfigError::EnvVar {
            var: "<unclosed>".to_string(),
            message: "Unclosed '${' in upstream.api_key".to_string(),
        })?;

        let var_name = &after[..end];
        if var_name.is_empty() {
            return Err(ConfigError::EnvVar {
                var: "".to_string(),
                message: "Empty variable name in '${}' reference".to_string(),
            });
        }

        let value = lookup(var_name).ok_or_else(|| ConfigError::EnvVar {
            var: var_name.to_string(),
            message: format!(
                "Environment variable '{}' is not set (referenced in upstream.api_key)",
                var_name
            ),
        })?;

        result.push_str(&value);
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

/// Look up an environment value, treating blank values as unset.
fn non_blank<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Build the final config from raw file values and environment overrides.
    ///
    /// Environment variables win over file values. The API key is resolved as:
    /// - `GROK_API_KEY` if set, source = `Environment`
    /// - `upstream.api_key` containing `${VAR}`: expanded, source = `EnvExpanded`
    /// - `upstream.api_key` literal, source = `Literal`
    /// - otherwise `KeySource::None`
    pub fn from_raw_with<F>(raw: RawConfig, lookup: F) -> Result<(Self, KeySource), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (api_key, source) = match non_blank(&lookup, API_KEY_ENV) {
            Some(value) => (
                Some(ApiKey::from(value)),
                KeySource::Environment(API_KEY_ENV.to_string()),
            ),
            None => match raw.upstream.api_key {
                Some(ref raw_key) if raw_key.contains("${") => {
                    let expanded = expand_env_vars_with(raw_key, &lookup)?;
                    (Some(ApiKey::from(expanded)), KeySource::EnvExpanded)
                }
                Some(ref raw_key) if !raw_key.trim().is_empty() => {
                    (Some(ApiKey::from(raw_key.as_str())), KeySource::Literal)
                }
                _ => (None, KeySource::None),
            },
        };

        let mut server = raw.server;
        if let Some(port) = non_blank(&lookup, PORT_ENV) {
            let port: u16 = port.parse().map_err(|_| {
                ConfigError::Validation(format!("{} must be a port number, got '{}'", PORT_ENV, port))
            })?;
            server.listen = format!("0.0.0.0:{}", port);
        }

        let upstream = UpstreamConfig {
            api_key,
            url: non_blank(&lookup, API_URL_ENV)
                .or(raw.upstream.url)
                .unwrap_or_else(default_upstream_url),
            model: non_blank(&lookup, MODEL_ENV)
                .or(raw.upstream.model)
                .unwrap_or_else(default_model),
            fallback_model: non_blank(&lookup, FALLBACK_MODEL_ENV).or_else(|| {
                raw.upstream
                    .fallback_model
                    .filter(|m| !m.trim().is_empty())
            }),
            timeout_secs: raw.upstream.timeout_secs.unwrap_or_else(default_timeout_secs),
        };

        let config = Config {
            server,
            upstream,
            logging: raw.logging,
        };
        config.validate()?;

        Ok((config, source))
    }

    /// Load configuration from an optional TOML file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<(Self, KeySource), ConfigError> {
        let raw = match path {
            Some(path) => RawConfig::from_file(path)?,
            None => RawConfig::default(),
        };
        Self::from_raw_with(raw, |name| std::env::var(name).ok())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.upstream.url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "Upstream URL must start with http:// or https://, got '{}'",
                url
            )));
        }

        if self.upstream.model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Upstream model must not be empty".to_string(),
            ));
        }

        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "Upstream timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.server.listen.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Listen address must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
