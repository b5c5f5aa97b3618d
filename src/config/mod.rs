use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Base URL of the reporting API (e.g., "http://localhost:8000")
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Milliseconds between import status checks
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Address for the Prometheus scrape endpoint. Metrics are not served when unset.
    #[serde(default)]
    pub metrics_bind_addr: Option<String>,
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Env(#[from] envy::Error),

    #[error("POLL_INTERVAL_MS must be greater than zero")]
    ZeroPollInterval,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit key/value pairs, with the same checks as `from_env`.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::from_iter(vars)?;
        if config.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
