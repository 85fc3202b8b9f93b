use packharvest_core::{Config, HarvestStatus, SanitizedConfig};
use tokio::sync::watch;

/// Shared application state
pub struct AppState {
    config: Config,
    status: watch::Receiver<HarvestStatus>,
}

impl AppState {
    pub fn new(config: Config, status: watch::Receiver<HarvestStatus>) -> Self {
        Self { config, status }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// Latest snapshot published by the harvest loop.
    pub fn status(&self) -> HarvestStatus {
        self.status.borrow().clone()
    }
}
