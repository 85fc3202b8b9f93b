use serde::Serialize;

use super::PipelineError;
use crate::config::{Config, SanitizedConfig};
use crate::cursor::CursorState;
use crate::store::{CursorStore, PackStore, StoreStats};

/// Output of the `stats` command.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub store: String,
    pub totals: StoreStats,
    pub cursor: CursorState,
    /// Percentage of the current locale x keyword cycle already walked.
    pub cycle_progress: f64,
    pub config: SanitizedConfig,
}

/// Reads store totals and the persisted cursor without touching upstream.
pub async fn collect_stats(
    config: &Config,
    store: &dyn PackStore,
    cursor_store: &dyn CursorStore,
) -> Result<StatsReport, PipelineError> {
    let totals = store.stats().await?;
    let mut cursor = cursor_store.load_cursor().await?.unwrap_or_default();
    let locales = config.discovery.locales.len();
    let keywords = config.discovery.keywords.len();
    cursor.clamp(locales, keywords);

    Ok(StatsReport {
        store: store.name().to_string(),
        totals,
        cycle_progress: cursor.cycle_progress(locales, keywords),
        cursor,
        config: SanitizedConfig::from(config),
    })
}
