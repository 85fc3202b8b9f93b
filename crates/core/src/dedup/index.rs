use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tracing::{debug, info};

use crate::pack::Pack;
use crate::store::{list_all_identifiers, PackStore, StoreError};

/// Duplicate index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Cache age after which batches are re-confirmed against the store.
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,
    /// Page size used when loading identifiers.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_freshness_secs() -> u64 {
    3600
}

fn default_page_size() -> usize {
    1000
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            freshness_secs: default_freshness_secs(),
            page_size: default_page_size(),
        }
    }
}

/// Split of a fetched batch.
#[derive(Debug, Default)]
pub struct FilterOutcome {
    pub new: Vec<Pack>,
    pub duplicates: Vec<Pack>,
}

/// In-memory set of known pack identifiers.
///
/// `committed` holds identifiers with a pack record in the store.
/// `observed` holds identifiers already handed to the pipeline during this
/// process lifetime, whatever their outcome, so a pack is attempted at most
/// once per run.
pub struct DuplicateIndex {
    store: Arc<dyn PackStore>,
    config: DedupConfig,
    committed: HashSet<String>,
    observed: HashSet<String>,
    loaded_at: Option<Instant>,
}

impl DuplicateIndex {
    pub fn new(store: Arc<dyn PackStore>, config: DedupConfig) -> Self {
        Self {
            store,
            config,
            committed: HashSet::new(),
            observed: HashSet::new(),
            loaded_at: None,
        }
    }

    /// Loads every committed identifier from the store. Returns the count.
    pub async fn load(&mut self) -> Result<usize, StoreError> {
        let started = Instant::now();
        let ids = list_all_identifiers(self.store.as_ref(), self.config.page_size).await?;

        self.committed = ids.into_iter().collect();
        self.loaded_at = Some(Instant::now());

        info!(
            count = self.committed.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Duplicate index loaded"
        );
        Ok(self.committed.len())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded_at.is_some()
    }

    /// Whether the identifier was committed or already attempted this run.
    pub fn contains(&self, identifier: &str) -> bool {
        self.committed.contains(identifier) || self.observed.contains(identifier)
    }

    /// Whether the identifier has a pack record.
    pub fn is_committed(&self, identifier: &str) -> bool {
        self.committed.contains(identifier)
    }

    /// Records a successful commit.
    pub fn mark_seen(&mut self, identifier: &str) {
        self.committed.insert(identifier.to_string());
    }

    /// Records that a pack was handed to the pipeline.
    pub fn observe(&mut self, identifier: &str) {
        self.observed.insert(identifier.to_string());
    }

    pub fn committed_count(&self) -> usize {
        self.committed.len()
    }

    /// True once the cache is older than the freshness window.
    pub fn is_stale(&self) -> bool {
        match self.loaded_at {
            Some(at) => at.elapsed() > Duration::from_secs(self.config.freshness_secs),
            None => true,
        }
    }

    /// Splits a batch into new and already known packs in one pass.
    ///
    /// New packs are observed immediately, so repeats inside the same batch
    /// count as duplicates.
    pub fn filter(&mut self, packs: Vec<Pack>) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();
        for pack in packs {
            if self.contains(&pack.identifier) {
                outcome.duplicates.push(pack);
            } else {
                self.observe(&pack.identifier);
                outcome.new.push(pack);
            }
        }
        outcome
    }

    /// Confirms candidates against the store when the cache is stale.
    ///
    /// Returns the subset that is still new. A fresh cache answers from
    /// memory; a stale one issues exactly one bulk lookup and folds any
    /// identifiers found there into the committed set.
    pub async fn reconcile_if_stale(
        &mut self,
        candidates: &[String],
    ) -> Result<Vec<String>, StoreError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        if !self.is_stale() {
            return Ok(candidates
                .iter()
                .filter(|id| !self.committed.contains(id.as_str()))
                .cloned()
                .collect());
        }

        let existing = self.store.find_existing(candidates).await?;
        if !existing.is_empty() {
            debug!(
                candidates = candidates.len(),
                already_stored = existing.len(),
                "Stale cache reconciled against store"
            );
        }

        let fresh = candidates
            .iter()
            .filter(|id| !existing.contains(id.as_str()))
            .cloned()
            .collect();
        self.committed.extend(existing);
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockPackStore};

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_load_pages_through_store() {
        let store = Arc::new(MockPackStore::new());
        for i in 0..2_500 {
            store.seed_pack(&format!("p{}", i)).await;
        }
        let mut index = DuplicateIndex::new(store.clone(), DedupConfig::default());

        assert_eq!(index.load().await.unwrap(), 2_500);
        assert!(index.contains("p0"));
        assert!(index.contains("p2499"));
        assert_eq!(store.list_page_calls().await, 3);
    }

    #[tokio::test]
    async fn test_filter_separates_duplicates() {
        let store = Arc::new(MockPackStore::new());
        store.seed_pack("B").await;
        store.seed_pack("D").await;
        let mut index = DuplicateIndex::new(store, DedupConfig::default());
        index.load().await.unwrap();

        let batch = ["A", "B", "C", "D", "E", "A"]
            .iter()
            .map(|id| fixtures::pack(id, 3))
            .collect();
        let outcome = index.filter(batch);

        let new: Vec<_> = outcome.new.iter().map(|p| p.identifier.as_str()).collect();
        assert_eq!(new, vec!["A", "C", "E"]);
        assert_eq!(outcome.duplicates.len(), 3);
        assert!(!index.is_committed("A"));
        assert!(index.contains("A"));
    }

    #[tokio::test]
    async fn test_mark_seen_commits() {
        let store = Arc::new(MockPackStore::new());
        let mut index = DuplicateIndex::new(store, DedupConfig::default());
        index.load().await.unwrap();

        index.mark_seen("X");
        assert!(index.is_committed("X"));
        assert_eq!(index.committed_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconcile_only_when_stale() {
        let store = Arc::new(MockPackStore::new());
        let mut index = DuplicateIndex::new(store.clone(), DedupConfig::default());
        index.load().await.unwrap();

        // An external writer commits "B" after the cache was built.
        store.seed_pack("B").await;

        let fresh = index.reconcile_if_stale(&ids(&["A", "B"])).await.unwrap();
        assert_eq!(fresh, ids(&["A", "B"]));
        assert_eq!(store.find_existing_calls().await, 0);

        tokio::time::advance(Duration::from_secs(3601)).await;
        assert!(index.is_stale());

        let fresh = index.reconcile_if_stale(&ids(&["A", "B", "C"])).await.unwrap();
        assert_eq!(fresh, ids(&["A", "C"]));
        assert_eq!(store.find_existing_calls().await, 1);
        assert!(index.is_committed("B"));
    }
}
