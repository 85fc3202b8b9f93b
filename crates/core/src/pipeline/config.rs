use serde::{Deserialize, Serialize};

/// Batching and pacing of the pipeline driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Packs processed concurrently per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Batch size while in efficiency mode.
    #[serde(default = "default_efficiency_batch_size")]
    pub efficiency_batch_size: usize,

    /// Valid assets taken from one pack before the rest are ignored.
    #[serde(default = "default_max_valid_assets")]
    pub max_valid_assets: usize,

    /// Pause after each completed continuous cycle.
    #[serde(default = "default_cycle_pause_secs")]
    pub cycle_pause_secs: u64,

    /// Pause after a failed continuous iteration.
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,
}

fn default_batch_size() -> usize {
    3
}

fn default_efficiency_batch_size() -> usize {
    5
}

fn default_max_valid_assets() -> usize {
    30
}

fn default_cycle_pause_secs() -> u64 {
    300
}

fn default_error_backoff_secs() -> u64 {
    30
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            efficiency_batch_size: default_efficiency_batch_size(),
            max_valid_assets: default_max_valid_assets(),
            cycle_pause_secs: default_cycle_pause_secs(),
            error_backoff_secs: default_error_backoff_secs(),
        }
    }
}

impl PipelineConfig {
    pub fn batch_size_for(&self, efficient: bool) -> usize {
        let size = if efficient {
            self.efficiency_batch_size
        } else {
            self.batch_size
        };
        size.max(1)
    }

    /// No pauses; for tests.
    pub fn without_pauses(mut self) -> Self {
        self.cycle_pause_secs = 0;
        self.error_backoff_secs = 0;
        self
    }
}
