//! Environment variable names used by this crate for convenient
//! configuration of the exporter from microservices.
//!
//! These are purely helpers; the exporter and sink types remain decoupled
//! from environment access. Values are read once and never refreshed.

use crate::builder::ServiceIdentity;

/// Full OTLP/HTTP logs URL, e.g. `https://collector.example.com/v1/logs`.
pub const OTLP_LOGS_ENDPOINT_ENV: &str = "OTLP_LOGS_ENDPOINT";

/// Optional collector access token.
pub const OTLP_LOGS_ACCESS_TOKEN_ENV: &str = "OTLP_LOGS_ACCESS_TOKEN";

/// Optional header name for the token. When unset the token is sent as
/// `Authorization: Bearer <token>`.
pub const OTLP_LOGS_TOKEN_HEADER_ENV: &str = "OTLP_LOGS_TOKEN_HEADER";

/// Logical service name reported with every record.
pub const SERVICE_NAME_ENV: &str = "SERVICE_NAME";

/// Service version reported as a resource attribute.
pub const SERVICE_VERSION_ENV: &str = "SERVICE_VERSION";

pub const DEFAULT_SERVICE_NAME: &str = "unknown_service";
pub const DEFAULT_SERVICE_VERSION: &str = "0.0.0";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Error type returned when building [`ExportConfig`] from the environment.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("collector endpoint must be an http(s) URL, got {0:?}")]
    InvalidEndpoint(String),
}

/// Immutable exporter settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub identity: ServiceIdentity,
    pub endpoint: String,
    pub access_token: Option<String>,
    /// Header carrying `access_token`; `None` means bearer authorization.
    pub token_header: Option<String>,
}

impl ExportConfig {
    /// Build the config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let endpoint =
            get(OTLP_LOGS_ENDPOINT_ENV).ok_or(ConfigError::Missing(OTLP_LOGS_ENDPOINT_ENV))?;
        let lower = endpoint.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(ConfigError::InvalidEndpoint(endpoint));
        }

        Ok(Self {
            identity: ServiceIdentity::new(
                get(SERVICE_NAME_ENV).unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
                get(SERVICE_VERSION_ENV).unwrap_or_else(|| DEFAULT_SERVICE_VERSION.to_string()),
            ),
            endpoint,
            access_token: get(OTLP_LOGS_ACCESS_TOKEN_ENV),
            token_header: get(OTLP_LOGS_TOKEN_HEADER_ENV),
        })
    }

    /// Settings for the HTTP sink.
    #[cfg(feature = "otlp-http")]
    pub fn sink_config(&self) -> crate::otlp_http::OtlpHttpConfig {
        use crate::otlp_http::{AccessToken, OtlpHttpConfig};

        let access_token = self.access_token.clone().map(|token| match &self.token_header {
            Some(name) => AccessToken::Header {
                name: name.clone(),
                value: token,
            },
            None => AccessToken::Bearer(token),
        });

        OtlpHttpConfig {
            endpoint: self.endpoint.clone(),
            access_token,
        }
    }
}
