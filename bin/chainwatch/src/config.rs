use std::{fs, path::Path, time::Duration};

use chainwatch_common::logging::LoggingSettings;
use chainwatch_node_client::DEFAULT_REQUEST_TIMEOUT;
use chainwatch_sync::SyncConfig;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::InitError;

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8101";

/// Node connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ClientConfig {
    /// JSON-RPC endpoint of the node.
    #[serde(default = "default_values::endpoint")]
    pub endpoint: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_values::request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_values::endpoint(),
            request_timeout_ms: default_values::request_timeout_ms(),
        }
    }
}

impl ClientConfig {
    pub(crate) fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Config {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    /// Logging configuration (optional).
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Config {
    /// Loads configuration from a TOML file.
    pub(crate) fn from_file(path: &Path) -> Result<Self, InitError> {
        let content = fs::read_to_string(path).map_err(|source| InitError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Normalizes the endpoint and checks the sync parameters.
    pub(crate) fn validate(&mut self) -> Result<(), InitError> {
        self.client.endpoint = normalize_endpoint(&self.client.endpoint)?;
        if self.client.request_timeout_ms == 0 {
            return Err(InitError::InvalidConfig(
                "request_timeout_ms must be non-zero".into(),
            ));
        }
        self.sync.validate()?;
        Ok(())
    }
}

/// Accepts `host:port` or an http(s) URL and returns the URL without a trailing slash.
pub(crate) fn normalize_endpoint(raw: &str) -> Result<String, InitError> {
    let raw = raw.trim();
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };

    let url = Url::parse(&with_scheme)
        .map_err(|e| InitError::InvalidEndpoint(format!("{raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(InitError::InvalidEndpoint(format!(
            "{raw:?}: unsupported scheme {}",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(InitError::InvalidEndpoint(format!("{raw:?}: missing host")));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Default value functions to make [`serde`] happy.
mod default_values {
    use super::*;

    pub(super) fn endpoint() -> String {
        DEFAULT_ENDPOINT.to_string()
    }

    pub(super) fn request_timeout_ms() -> u64 {
        DEFAULT_REQUEST_TIMEOUT.as_millis() as u64
    }
}
