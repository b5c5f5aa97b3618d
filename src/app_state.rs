use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::api::{ApiClient, ApiError};
use crate::services::imports::ImportApi;
use crate::services::poller::ImportPoller;

/// Shared client state used by every command.
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<ApiClient>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config.api_base_url, config.request_timeout())?;
        Ok(Self {
            api: Arc::new(api),
            config: Arc::new(config),
        })
    }

    /// A poller bound to this API client and the configured interval.
    pub fn import_poller(&self) -> ImportPoller {
        let api: Arc<dyn ImportApi> = self.api.clone();
        ImportPoller::new(api).with_interval(self.config.poll_interval())
    }
}
