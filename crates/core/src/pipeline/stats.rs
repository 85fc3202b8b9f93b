use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use super::{AssetTally, PackOutcome, SkipReason};
use crate::upstream::Endpoint;

/// Per-locale counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LocaleTally {
    pub found: u64,
    pub new: u64,
    pub committed: u64,
}

/// Counters for one process lifetime.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    /// Start timestamp as `YYYYMMDD_HHMMSS`.
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub packs_found: u64,
    pub duplicates_skipped: u64,
    pub rejected: u64,
    pub processed: u64,
    pub failed: u64,
    pub stickers_processed: u64,
    pub stickers_failed: u64,
    pub api_calls: BTreeMap<String, u64>,
    pub mode_switches: u64,
    pub locales: BTreeMap<String, LocaleTally>,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStats {
    pub fn new() -> Self {
        let started_at = Utc::now();
        Self {
            session_id: started_at.format("%Y%m%d_%H%M%S").to_string(),
            started_at,
            packs_found: 0,
            duplicates_skipped: 0,
            rejected: 0,
            processed: 0,
            failed: 0,
            stickers_processed: 0,
            stickers_failed: 0,
            api_calls: BTreeMap::new(),
            mode_switches: 0,
            locales: BTreeMap::new(),
        }
    }

    pub fn record_api_call(&mut self, endpoint: Endpoint) {
        self.record_api_calls(endpoint, 1);
    }

    pub fn record_api_calls(&mut self, endpoint: Endpoint, count: u64) {
        if count > 0 {
            *self.api_calls.entry(endpoint.as_str().to_string()).or_default() += count;
        }
    }

    /// A filtered page: `found` fetched, `new` survived the duplicate check.
    pub fn record_page(&mut self, locale: &str, found: usize, new: usize) {
        let duplicates = found.saturating_sub(new) as u64;
        self.packs_found += found as u64;
        self.duplicates_skipped += duplicates;

        let tally = self.locales.entry(locale.to_string()).or_default();
        tally.found += found as u64;
        tally.new += new as u64;
    }

    pub fn record_outcome(&mut self, locale: &str, outcome: &PackOutcome, assets: &AssetTally) {
        self.stickers_processed += assets.transcoded as u64;
        self.stickers_failed += assets.failed as u64;
        self.record_api_calls(Endpoint::Download, assets.downloads as u64);

        match outcome {
            PackOutcome::Committed { .. } => {
                self.processed += 1;
                self.locales.entry(locale.to_string()).or_default().committed += 1;
            }
            PackOutcome::Skipped(reason) => match reason {
                SkipReason::Duplicate => self.duplicates_skipped += 1,
                SkipReason::Rejected(_) => self.rejected += 1,
                SkipReason::TooFewAssets { .. } => self.failed += 1,
            },
            PackOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn record_mode_switch(&mut self) {
        self.mode_switches += 1;
    }

    /// Share of found packs that were already known.
    pub fn duplicate_ratio(&self) -> f64 {
        if self.packs_found == 0 {
            0.0
        } else {
            self.duplicates_skipped as f64 / self.packs_found as f64
        }
    }

    /// Share of found packs that were committed.
    pub fn efficiency(&self) -> f64 {
        if self.packs_found == 0 {
            0.0
        } else {
            self.processed as f64 / self.packs_found as f64
        }
    }

    pub fn total_api_calls(&self) -> u64 {
        self.api_calls.values().sum()
    }

    pub fn log_summary(&self, label: &str) {
        let elapsed = Utc::now() - self.started_at;
        info!(
            label,
            session = %self.session_id,
            elapsed_secs = elapsed.num_seconds(),
            found = self.packs_found,
            duplicates = self.duplicates_skipped,
            rejected = self.rejected,
            processed = self.processed,
            failed = self.failed,
            stickers = self.stickers_processed,
            stickers_failed = self.stickers_failed,
            api_calls = self.total_api_calls(),
            mode_switches = self.mode_switches,
            duplicate_ratio = format!("{:.1}%", self.duplicate_ratio() * 100.0),
            efficiency = format!("{:.1}%", self.efficiency() * 100.0),
            "Session summary"
        );
    }
}
