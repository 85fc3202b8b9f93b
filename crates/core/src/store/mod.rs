//! Asset and metadata storage.
//!
//! The pipeline only sees the [`PackStore`] and [`CursorStore`] traits. Two
//! backends implement both:
//!
//! - [`LocalStore`]: assets on the local filesystem, metadata and cursor in SQLite
//! - [`SupabaseStore`]: Supabase Storage for assets, PostgREST tables for metadata

mod config;
mod error;
mod local;
mod supabase;
mod types;

pub use config::{LocalStoreConfig, StoreBackend, StoreConfig, SupabaseConfig};
pub use error::StoreError;
pub use local::LocalStore;
pub use supabase::SupabaseStore;
pub use types::{PackRecord, StickerRecord, StoreStats, UploadOutcome};

use async_trait::async_trait;
use std::collections::HashSet;

use crate::cursor::CursorState;

/// Durable home of pack assets and metadata records.
#[async_trait]
pub trait PackStore: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Whether a pack record with this identifier exists.
    async fn exists(&self, identifier: &str) -> Result<bool, StoreError>;

    /// One page of committed identifiers, oldest first.
    async fn list_identifiers_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<String>, StoreError>;

    /// The subset of `identifiers` that already have pack records.
    ///
    /// Implementations must answer with a single bulk query.
    async fn find_existing(&self, identifiers: &[String]) -> Result<HashSet<String>, StoreError>;

    /// Makes sure the pack's asset namespace exists.
    async fn ensure_namespace(&self, pack_identifier: &str) -> Result<(), StoreError>;

    /// Writes an asset unless something already lives at `path`.
    async fn upload_asset(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<UploadOutcome, StoreError>;

    async fn asset_exists(&self, path: &str) -> Result<bool, StoreError>;

    /// Creates the pack record. Returns the backend's record id.
    ///
    /// An existing record for the same identifier is [`StoreError::Conflict`].
    async fn create_pack_record(&self, record: &PackRecord) -> Result<String, StoreError>;

    /// Creates one sticker record. Returns the backend's record id.
    async fn create_sticker_record(&self, record: &StickerRecord) -> Result<String, StoreError>;

    /// Totals for the stats dump.
    async fn stats(&self) -> Result<StoreStats, StoreError>;
}

/// Persistence for the iteration cursor.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Reads the single cursor record, if one was ever saved.
    async fn load_cursor(&self) -> Result<Option<CursorState>, StoreError>;

    /// Upserts the single cursor record.
    async fn save_cursor(&self, state: &CursorState) -> Result<(), StoreError>;
}

/// Enumerates every committed identifier, page by page.
pub async fn list_all_identifiers(
    store: &dyn PackStore,
    page_size: usize,
) -> Result<Vec<String>, StoreError> {
    let page_size = page_size.max(1);
    let mut all = Vec::new();
    let mut offset = 0;

    loop {
        let page = store.list_identifiers_page(offset, page_size).await?;
        let len = page.len();
        all.extend(page);
        if len < page_size {
            break;
        }
        offset += len;
    }

    Ok(all)
}

/// Object path of an asset inside a pack namespace.
pub fn asset_path(pack_identifier: &str, filename: &str) -> String {
    format!("{}/{}", pack_identifier, filename)
}
