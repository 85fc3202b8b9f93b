use tracing::{debug, warn};

use crate::pack::Pack;

/// Why a paginated walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxPages,
    MaxPacks,
    EmptyPages,
}

/// Pagination bookkeeping for one keyword or one recommended feed.
#[derive(Debug, Clone)]
pub struct PageWalk {
    label: String,
    max_pages: u32,
    max_packs: usize,
    max_empty_pages: u32,
    next_page: u32,
    empty_streak: u32,
    packs_taken: usize,
    stopped: Option<StopReason>,
}

impl PageWalk {
    pub fn new(label: impl Into<String>, max_pages: u32, max_packs: usize, max_empty_pages: u32) -> Self {
        Self {
            label: label.into(),
            max_pages,
            max_packs,
            max_empty_pages: max_empty_pages.max(1),
            next_page: 0,
            empty_streak: 0,
            packs_taken: 0,
            stopped: None,
        }
    }

    /// The next page to fetch, or `None` once a stop condition is hit.
    pub fn next_page(&mut self) -> Option<u32> {
        if self.stopped.is_some() {
            return None;
        }
        if self.next_page >= self.max_pages {
            self.stopped = Some(StopReason::MaxPages);
            return None;
        }
        Some(self.next_page)
    }

    /// How many more packs this walk may take.
    pub fn remaining_packs(&self) -> usize {
        self.max_packs.saturating_sub(self.packs_taken)
    }

    /// Caps a fetched page to the remaining pack budget and records it.
    pub fn accept(&mut self, mut packs: Vec<Pack>) -> Vec<Pack> {
        packs.truncate(self.remaining_packs());
        self.record_page(packs.len());
        packs
    }

    /// Records a fetched page of `found` packs (after capping).
    pub fn record_page(&mut self, found: usize) {
        let page = self.next_page;
        self.next_page += 1;

        if found == 0 {
            self.empty_streak += 1;
            if page == 0 {
                warn!(walk = %self.label, "First page came back empty");
            } else {
                debug!(walk = %self.label, page, streak = self.empty_streak, "Empty page");
            }
            if self.empty_streak >= self.max_empty_pages {
                self.stopped = Some(StopReason::EmptyPages);
            }
            return;
        }

        self.empty_streak = 0;
        self.packs_taken += found;
        if self.packs_taken >= self.max_packs {
            self.stopped = Some(StopReason::MaxPacks);
        }
    }

    /// A failed fetch counts as an empty page.
    pub fn record_error(&mut self) {
        self.next_page += 1;
        self.empty_streak += 1;
        if self.empty_streak >= self.max_empty_pages {
            self.stopped = Some(StopReason::EmptyPages);
        }
    }

    pub fn pages_fetched(&self) -> u32 {
        self.next_page
    }

    pub fn packs_taken(&self) -> usize {
        self.packs_taken
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stopped
    }
}
