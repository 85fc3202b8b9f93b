//! Mock store for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::cursor::CursorState;
use crate::store::{
    CursorStore, PackRecord, PackStore, StickerRecord, StoreError, StoreStats, UploadOutcome,
};

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ListIdentifiers,
    FindExisting,
    EnsureNamespace,
    UploadAsset,
    AssetExists,
    CreatePackRecord,
    CreateStickerRecord,
    SaveCursor,
}

/// Mock implementation of the PackStore and CursorStore traits.
///
/// Keeps packs in insertion order, records every asset write and counts the
/// queries the duplicate index cares about.
#[derive(Debug)]
pub struct MockPackStore {
    packs: Arc<RwLock<Vec<PackRecord>>>,
    assets: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    uploaded: Arc<RwLock<Vec<String>>>,
    stickers: Arc<RwLock<Vec<StickerRecord>>>,
    cursor: Arc<RwLock<Option<CursorState>>>,
    cursor_saves: Arc<RwLock<usize>>,
    failing: Arc<RwLock<HashSet<StoreOp>>>,
    list_page_calls: Arc<RwLock<usize>>,
    find_existing_calls: Arc<RwLock<usize>>,
}

impl Default for MockPackStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPackStore {
    pub fn new() -> Self {
        Self {
            packs: Arc::new(RwLock::new(Vec::new())),
            assets: Arc::new(RwLock::new(HashMap::new())),
            uploaded: Arc::new(RwLock::new(Vec::new())),
            stickers: Arc::new(RwLock::new(Vec::new())),
            cursor: Arc::new(RwLock::new(None)),
            cursor_saves: Arc::new(RwLock::new(0)),
            failing: Arc::new(RwLock::new(HashSet::new())),
            list_page_calls: Arc::new(RwLock::new(0)),
            find_existing_calls: Arc::new(RwLock::new(0)),
        }
    }

    /// Adds a committed pack record, as if written by an earlier run.
    pub async fn seed_pack(&self, identifier: &str) {
        self.packs.write().await.push(PackRecord {
            identifier: identifier.to_string(),
            name: format!("Pack {}", identifier),
            publisher: "seed".to_string(),
            is_animated: false,
            lang: "pt".to_string(),
            tray_image_file: "tray.png".to_string(),
            sticker_count: 3,
        });
    }

    /// Adds an asset without recording it as uploaded.
    pub async fn seed_asset(&self, path: &str) {
        self.assets
            .write()
            .await
            .insert(path.to_string(), b"seeded".to_vec());
    }

    pub async fn set_cursor(&self, state: CursorState) {
        *self.cursor.write().await = Some(state);
    }

    /// The last cursor written (or seeded).
    pub async fn saved_cursor(&self) -> Option<CursorState> {
        self.cursor.read().await.clone()
    }

    pub async fn cursor_saves(&self) -> usize {
        *self.cursor_saves.read().await
    }

    pub async fn fail_cursor_writes(&self, fail: bool) {
        let mut failing = self.failing.write().await;
        if fail {
            failing.insert(StoreOp::SaveCursor);
        } else {
            failing.remove(&StoreOp::SaveCursor);
        }
    }

    pub async fn fail_on(&self, op: StoreOp) {
        self.failing.write().await.insert(op);
    }

    pub async fn clear_failures(&self) {
        self.failing.write().await.clear();
    }

    /// Paths written by `upload_asset`, in order. Skipped writes are excluded.
    pub async fn uploaded_paths(&self) -> Vec<String> {
        self.uploaded.read().await.clone()
    }

    pub async fn pack_record(&self, identifier: &str) -> Option<PackRecord> {
        self.packs
            .read()
            .await
            .iter()
            .find(|p| p.identifier == identifier)
            .cloned()
    }

    pub async fn pack_identifiers(&self) -> Vec<String> {
        self.packs
            .read()
            .await
            .iter()
            .map(|p| p.identifier.clone())
            .collect()
    }

    pub async fn sticker_records(&self) -> Vec<StickerRecord> {
        self.stickers.read().await.clone()
    }

    pub async fn list_page_calls(&self) -> usize {
        *self.list_page_calls.read().await
    }

    pub async fn find_existing_calls(&self) -> usize {
        *self.find_existing_calls.read().await
    }

    async fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        if self.failing.read().await.contains(&op) {
            return Err(StoreError::Database(format!("{:?} configured to fail", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl PackStore for MockPackStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn exists(&self, identifier: &str) -> Result<bool, StoreError> {
        Ok(self
            .packs
            .read()
            .await
            .iter()
            .any(|p| p.identifier == identifier))
    }

    async fn list_identifiers_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        *self.list_page_calls.write().await += 1;
        self.check(StoreOp::ListIdentifiers).await?;
        Ok(self
            .packs
            .read()
            .await
            .iter()
            .skip(offset)
            .take(limit)
            .map(|p| p.identifier.clone())
            .collect())
    }

    async fn find_existing(&self, identifiers: &[String]) -> Result<HashSet<String>, StoreError> {
        *self.find_existing_calls.write().await += 1;
        self.check(StoreOp::FindExisting).await?;
        let packs = self.packs.read().await;
        Ok(identifiers
            .iter()
            .filter(|id| packs.iter().any(|p| &p.identifier == *id))
            .cloned()
            .collect())
    }

    async fn ensure_namespace(&self, _pack_identifier: &str) -> Result<(), StoreError> {
        self.check(StoreOp::EnsureNamespace).await
    }

    async fn upload_asset(
        &self,
        path: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<UploadOutcome, StoreError> {
        self.check(StoreOp::UploadAsset).await?;
        let url = format!("mock://{}", path);
        let mut assets = self.assets.write().await;
        if assets.contains_key(path) {
            return Ok(UploadOutcome::AlreadyPresent { url });
        }
        assets.insert(path.to_string(), bytes.to_vec());
        self.uploaded.write().await.push(path.to_string());
        Ok(UploadOutcome::Uploaded { url })
    }

    async fn asset_exists(&self, path: &str) -> Result<bool, StoreError> {
        self.check(StoreOp::AssetExists).await?;
        Ok(self.assets.read().await.contains_key(path))
    }

    async fn create_pack_record(&self, record: &PackRecord) -> Result<String, StoreError> {
        self.check(StoreOp::CreatePackRecord).await?;
        let mut packs = self.packs.write().await;
        if packs.iter().any(|p| p.identifier == record.identifier) {
            return Err(StoreError::Conflict(record.identifier.clone()));
        }
        packs.push(record.clone());
        Ok(packs.len().to_string())
    }

    async fn create_sticker_record(&self, record: &StickerRecord) -> Result<String, StoreError> {
        self.check(StoreOp::CreateStickerRecord).await?;
        let mut stickers = self.stickers.write().await;
        stickers.push(record.clone());
        Ok(stickers.len().to_string())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let packs = self.packs.read().await;
        Ok(StoreStats {
            packs: packs.len() as u64,
            animated_packs: packs.iter().filter(|p| p.is_animated).count() as u64,
            stickers: self.stickers.read().await.len() as u64,
        })
    }
}

#[async_trait]
impl CursorStore for MockPackStore {
    async fn load_cursor(&self) -> Result<Option<CursorState>, StoreError> {
        Ok(self.cursor.read().await.clone())
    }

    async fn save_cursor(&self, state: &CursorState) -> Result<(), StoreError> {
        self.check(StoreOp::SaveCursor).await?;
        *self.cursor.write().await = Some(state.clone());
        *self.cursor_saves.write().await += 1;
        Ok(())
    }
}
