//! Duplicate index of already ingested packs.
//!
//! The index is materialized from the store once per run and then answers
//! membership in O(1). Batches are filtered against memory first; when the
//! cache is older than the freshness window, the survivors are confirmed
//! against the store with a single bulk query.

mod index;

pub use index::{DedupConfig, DuplicateIndex, FilterOutcome};
