use chrono::Utc;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info};

use super::CursorState;
use crate::metrics;
use crate::store::{CursorStore, StoreError};

/// Outcome of one cursor step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    NextPage,
    NextKeyword,
    NextLocale,
    CycleCompleted,
}

/// Single-writer owner of the iteration cursor.
pub struct CursorMachine {
    store: Arc<dyn CursorStore>,
    state: CursorState,
    locales: usize,
    keywords: usize,
    cycle_started: Instant,
    /// Runtime since this instant is not yet in `total_runtime_hours`.
    accrued_until: Instant,
}

impl CursorMachine {
    /// Reads the persisted cursor, or starts from the origin if none exists.
    pub async fn load(
        store: Arc<dyn CursorStore>,
        locales: usize,
        keywords: usize,
    ) -> Result<Self, StoreError> {
        let mut state = store.load_cursor().await?.unwrap_or_default();

        if state.clamp(locales, keywords) {
            info!(
                locales,
                keywords, "Persisted cursor out of range for current configuration, reset"
            );
        }

        info!(
            locale_index = state.locale_index,
            keyword_index = state.keyword_index,
            page = state.page,
            cycles_completed = state.cycles_completed,
            "Cursor loaded"
        );

        Ok(Self {
            store,
            state,
            locales,
            keywords,
            cycle_started: Instant::now(),
            accrued_until: Instant::now(),
        })
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    /// `(locale_index, keyword_index, page)`.
    pub fn position(&self) -> (usize, usize, u32) {
        (
            self.state.locale_index,
            self.state.keyword_index,
            self.state.page,
        )
    }

    pub fn cycle_progress(&self) -> f64 {
        self.state.cycle_progress(self.locales, self.keywords)
    }

    /// Remembers the last pack handled and persists.
    pub async fn record_pack(&mut self, identifier: &str) -> bool {
        self.state.last_processed_pack_id = Some(identifier.to_string());
        self.accrue_runtime();
        self.persist().await
    }

    /// Moves past the page just processed and persists.
    ///
    /// With `more_pages` the page advances; otherwise the keyword does, then
    /// the locale, and exhausting the locales completes a cycle.
    pub async fn advance(&mut self, more_pages: bool) -> Transition {
        self.accrue_runtime();
        let transition = self.step(more_pages);
        debug!(
            ?transition,
            locale_index = self.state.locale_index,
            keyword_index = self.state.keyword_index,
            page = self.state.page,
            "Cursor advanced"
        );
        self.persist().await;
        transition
    }

    fn step(&mut self, more_pages: bool) -> Transition {
        if more_pages {
            self.state.page += 1;
            return Transition::NextPage;
        }

        self.state.page = 0;
        self.state.keyword_index += 1;
        if self.state.keyword_index < self.keywords {
            return Transition::NextKeyword;
        }

        self.state.keyword_index = 0;
        self.state.locale_index += 1;
        if self.state.locale_index < self.locales {
            return Transition::NextLocale;
        }

        self.state.locale_index = 0;
        self.complete_cycle();
        Transition::CycleCompleted
    }

    fn complete_cycle(&mut self) {
        let elapsed = self.cycle_started.elapsed();
        self.cycle_started = Instant::now();

        self.state.cycles_completed += 1;
        self.state.last_cycle_at = Some(Utc::now());
        metrics::CYCLES_COMPLETED.inc();

        info!(
            cycles_completed = self.state.cycles_completed,
            cycle_secs = elapsed.as_secs(),
            total_runtime_hours = format!("{:.2}", self.state.total_runtime_hours),
            "Cycle completed"
        );
    }

    /// Folds the time since the last write into the persisted runtime.
    fn accrue_runtime(&mut self) {
        let now = Instant::now();
        self.state.total_runtime_hours +=
            now.duration_since(self.accrued_until).as_secs_f64() / 3600.0;
        self.accrued_until = now;
    }

    /// Upserts the current state. A failed write is logged and counted, and
    /// the in-memory cursor stays authoritative.
    pub async fn persist(&self) -> bool {
        match self.store.save_cursor(&self.state).await {
            Ok(()) => true,
            Err(e) => {
                metrics::CURSOR_PERSIST_FAILURES.inc();
                error!(
                    error = %e,
                    locale_index = self.state.locale_index,
                    keyword_index = self.state.keyword_index,
                    page = self.state.page,
                    "Failed to persist cursor, continuing in memory"
                );
                false
            }
        }
    }
}
