use serde::Serialize;
use tracing::{debug, warn};

use super::{PackOutcome, PackReport, SessionStats, SkipReason};
use crate::cursor::{CursorMachine, CursorState};
use crate::dedup::DuplicateIndex;
use crate::discovery::{DiscoveryController, StrategySnapshot};
use crate::metrics;
use crate::pack::Pack;
use crate::upstream::Endpoint;

/// Process-wide mutable state of a harvest run.
///
/// The driver is the only writer; every mutation goes through these methods.
pub struct HarvestContext {
    index: DuplicateIndex,
    cursor: CursorMachine,
    discovery: DiscoveryController,
    stats: SessionStats,
}

/// Read-only view published to the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HarvestStatus {
    pub stats: SessionStats,
    pub cursor: CursorState,
    pub cycle_progress: f64,
    pub strategy: StrategySnapshot,
    pub known_packs: usize,
}

impl HarvestContext {
    pub fn new(index: DuplicateIndex, cursor: CursorMachine, discovery: DiscoveryController) -> Self {
        Self {
            index,
            cursor,
            discovery,
            stats: SessionStats::new(),
        }
    }

    pub fn index(&self) -> &DuplicateIndex {
        &self.index
    }

    pub fn cursor(&self) -> &CursorMachine {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut CursorMachine {
        &mut self.cursor
    }

    pub fn discovery(&self) -> &DiscoveryController {
        &self.discovery
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn record_api_call(&mut self, endpoint: Endpoint) {
        self.stats.record_api_call(endpoint);
    }

    /// Runs a fetched page through the duplicate index.
    ///
    /// Returns the packs that still need processing. This is the decision
    /// point of the discovery strategy.
    pub async fn screen(&mut self, locale: &str, packs: Vec<Pack>) -> Vec<Pack> {
        let found = packs.len();
        let filtered = self.index.filter(packs);
        let mut new = filtered.new;

        if !new.is_empty() {
            let candidates: Vec<String> = new.iter().map(|p| p.identifier.clone()).collect();
            match self.index.reconcile_if_stale(&candidates).await {
                Ok(fresh) if fresh.len() < new.len() => {
                    new.retain(|p| fresh.contains(&p.identifier));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Duplicate reconciliation failed, using cached index");
                }
            }
        }

        let duplicates = found - new.len();
        for _ in 0..duplicates {
            metrics::record_pack_outcome("duplicate");
        }
        self.stats.record_page(locale, found, new.len());
        if self.discovery.record(new.len(), duplicates).is_some() {
            self.stats.record_mode_switch();
        }

        debug!(locale, found, new = new.len(), duplicates, "Page screened");
        new
    }

    /// Folds one pack report into the index, cursor and stats.
    pub async fn settle(&mut self, locale: &str, report: &PackReport) {
        if report.outcome.is_committed()
            || matches!(report.outcome, PackOutcome::Skipped(SkipReason::Duplicate))
        {
            self.index.mark_seen(&report.identifier);
            metrics::DEDUP_INDEX_SIZE.set(self.index.committed_count() as i64);
        }
        metrics::record_pack_outcome(report.outcome.label());
        self.stats
            .record_outcome(locale, &report.outcome, &report.tally);
        self.cursor.record_pack(&report.identifier).await;
    }

    pub fn status(&self) -> HarvestStatus {
        HarvestStatus {
            stats: self.stats.clone(),
            cursor: self.cursor.state().clone(),
            cycle_progress: self.cursor.cycle_progress(),
            strategy: self.discovery.strategy().snapshot(),
            known_packs: self.index.committed_count(),
        }
    }
}
