use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Top-level settings, read from `config.yml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiSettings {
    /// Base path of the notes resource. Relative paths are resolved
    /// against `origin`.
    pub base_url: String,
    pub origin: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// flexi_logger filter, e.g. `info` or `notedesk=debug`
    pub level: String,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid api origin {origin:?}: {reason}")]
    InvalidOrigin { origin: String, reason: String },
    #[error("invalid api url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "/api".to_string(),
            origin: "http://localhost:8000".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

impl ApiSettings {
    /// Absolute URL of the API base. An `http(s)` base is used as-is;
    /// anything else is treated as a path under `origin`.
    pub fn resolve_base_url(&self) -> Result<Url, ConfigError> {
        if let Ok(url) = Url::parse(&self.base_url) {
            if matches!(url.scheme(), "http" | "https") {
                return Ok(url);
            }
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }
        let origin = Url::parse(&self.origin).map_err(|e| ConfigError::InvalidOrigin {
            origin: self.origin.clone(),
            reason: e.to_string(),
        })?;
        origin
            .join(&self.base_url)
            .map_err(|e| ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: e.to_string(),
            })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}
