//! Filesystem + SQLite storage backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::error::StoreError;
use super::types::{PackRecord, StickerRecord, StoreStats, UploadOutcome};
use super::{CursorStore, PackStore};
use crate::cursor::CursorState;

/// Assets under a root directory, metadata in SQLite.
pub struct LocalStore {
    root: PathBuf,
    conn: Mutex<Connection>,
}

impl LocalStore {
    /// Opens (or creates) the database and asset root.
    pub fn new(root: &Path, database: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(root)?;
        let conn = Connection::open(database)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            root: root.to_path_buf(),
            conn: Mutex::new(conn),
        })
    }

    /// Asset root on disk, metadata in memory (useful for testing).
    pub fn in_memory(root: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(root)?;
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            root: root.to_path_buf(),
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS packs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                identifier TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                publisher TEXT NOT NULL,
                is_animated INTEGER NOT NULL,
                lang TEXT NOT NULL,
                tray_image_file TEXT NOT NULL,
                sticker_count INTEGER NOT NULL DEFAULT 0,
                level INTEGER NOT NULL DEFAULT 0,
                zip_size INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_packs_created_at ON packs(created_at);

            CREATE TABLE IF NOT EXISTS stickers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pack_id INTEGER NOT NULL REFERENCES packs(id) ON DELETE CASCADE,
                pack_identifier TEXT NOT NULL,
                name TEXT NOT NULL,
                emojis TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(pack_identifier, name)
            );

            CREATE TABLE IF NOT EXISTS cursor_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                locale_index INTEGER NOT NULL,
                keyword_index INTEGER NOT NULL,
                page INTEGER NOT NULL,
                last_processed_pack_id TEXT,
                total_runtime_hours REAL NOT NULL,
                cycles_completed INTEGER NOT NULL,
                last_cycle_at TEXT,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }

    /// Resolves an object path under the root, refusing anything that
    /// would escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(path);
        let clean = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl PackStore for LocalStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn exists(&self, identifier: &str) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM packs WHERE identifier = ?",
            params![identifier],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    async fn list_identifiers_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT identifier FROM packs ORDER BY created_at ASC, id ASC LIMIT ? OFFSET ?",
        )?;
        let rows = stmt.query_map(params![limit as i64, offset as i64], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<String>, _>>()?)
    }

    async fn find_existing(&self, identifiers: &[String]) -> Result<HashSet<String>, StoreError> {
        if identifiers.is_empty() {
            return Ok(HashSet::new());
        }

        let placeholders = vec!["?"; identifiers.len()].join(",");
        let sql = format!(
            "SELECT identifier FROM packs WHERE identifier IN ({})",
            placeholders
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(identifiers.iter()), |row| row.get(0))?;
        Ok(rows.collect::<Result<HashSet<String>, _>>()?)
    }

    async fn ensure_namespace(&self, pack_identifier: &str) -> Result<(), StoreError> {
        let dir = self.resolve(pack_identifier)?;
        tokio::fs::create_dir_all(dir).await?;
        Ok(())
    }

    async fn upload_asset(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<UploadOutcome, StoreError> {
        let target = self.resolve(path)?;
        let url = target.to_string_lossy().to_string();

        if tokio::fs::try_exists(&target).await? {
            debug!(path, "Asset already present");
            return Ok(UploadOutcome::AlreadyPresent { url });
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Never expose a half-written asset under its final name.
        let partial = target.with_extension("partial");
        tokio::fs::write(&partial, bytes).await?;
        tokio::fs::rename(&partial, &target).await?;

        debug!(path, content_type, size = bytes.len(), "Asset written");
        Ok(UploadOutcome::Uploaded { url })
    }

    async fn asset_exists(&self, path: &str) -> Result<bool, StoreError> {
        let target = self.resolve(path)?;
        Ok(tokio::fs::try_exists(target).await?)
    }

    async fn create_pack_record(&self, record: &PackRecord) -> Result<String, StoreError> {
        let conn = self.conn()?;
        let result = conn.execute(
            "INSERT INTO packs (identifier, name, publisher, is_animated, lang, tray_image_file, sticker_count, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                record.identifier,
                record.name,
                record.publisher,
                record.is_animated,
                record.lang,
                record.tray_image_file,
                record.sticker_count as i64,
                Utc::now().to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(conn.last_insert_rowid().to_string()),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::Conflict(record.identifier.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create_sticker_record(&self, record: &StickerRecord) -> Result<String, StoreError> {
        let pack_id: i64 = record
            .pack_record_id
            .parse()
            .map_err(|_| StoreError::Database(format!("bad pack id {}", record.pack_record_id)))?;
        let emojis = serde_json::to_string(&record.emojis)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO stickers (pack_id, pack_identifier, name, emojis, size_bytes, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(pack_identifier, name) DO NOTHING",
            params![
                pack_id,
                record.pack_identifier,
                record.name,
                emojis,
                record.size_bytes as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;

        let id: i64 = conn.query_row(
            "SELECT id FROM stickers WHERE pack_identifier = ? AND name = ?",
            params![record.pack_identifier, record.name],
            |row| row.get(0),
        )?;
        Ok(id.to_string())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let conn = self.conn()?;
        let (packs, animated_packs): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(is_animated), 0) FROM packs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let stickers: i64 = conn.query_row("SELECT COUNT(*) FROM stickers", [], |row| row.get(0))?;

        Ok(StoreStats {
            packs: packs as u64,
            animated_packs: animated_packs as u64,
            stickers: stickers as u64,
        })
    }
}

#[async_trait]
impl CursorStore for LocalStore {
    async fn load_cursor(&self) -> Result<Option<CursorState>, StoreError> {
        let conn = self.conn()?;
        let state = conn
            .query_row(
                "SELECT locale_index, keyword_index, page, last_processed_pack_id,
                        total_runtime_hours, cycles_completed, last_cycle_at
                 FROM cursor_state WHERE id = 1",
                [],
                |row| {
                    let last_cycle_at: Option<String> = row.get(6)?;
                    Ok(CursorState {
                        locale_index: row.get::<_, i64>(0)? as usize,
                        keyword_index: row.get::<_, i64>(1)? as usize,
                        page: row.get::<_, i64>(2)? as u32,
                        last_processed_pack_id: row.get(3)?,
                        total_runtime_hours: row.get(4)?,
                        cycles_completed: row.get::<_, i64>(5)? as u64,
                        last_cycle_at: last_cycle_at.and_then(|s| {
                            DateTime::parse_from_rfc3339(&s)
                                .map(|dt| dt.with_timezone(&Utc))
                                .ok()
                        }),
                    })
                },
            )
            .optional()?;
        Ok(state)
    }

    async fn save_cursor(&self, state: &CursorState) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO cursor_state (id, locale_index, keyword_index, page, last_processed_pack_id,
                                       total_runtime_hours, cycles_completed, last_cycle_at, updated_at)
             VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                locale_index = excluded.locale_index,
                keyword_index = excluded.keyword_index,
                page = excluded.page,
                last_processed_pack_id = excluded.last_processed_pack_id,
                total_runtime_hours = excluded.total_runtime_hours,
                cycles_completed = excluded.cycles_completed,
                last_cycle_at = excluded.last_cycle_at,
                updated_at = excluded.updated_at",
            params![
                state.locale_index as i64,
                state.keyword_index as i64,
                state.page as i64,
                state.last_processed_pack_id,
                state.total_runtime_hours,
                state.cycles_completed as i64,
                state.last_cycle_at.map(|dt| dt.to_rfc3339()),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::list_all_identifiers;
    use tempfile::TempDir;

    fn store() -> (TempDir, LocalStore) {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::in_memory(&dir.path().join("assets")).unwrap();
        (dir, store)
    }

    fn record(id: &str) -> PackRecord {
        PackRecord {
            identifier: id.to_string(),
            name: format!("Pack {}", id),
            publisher: "tester".to_string(),
            is_animated: false,
            lang: "pt".to_string(),
            tray_image_file: "tray.png".to_string(),
            sticker_count: 3,
        }
    }

    #[tokio::test]
    async fn test_pack_record_roundtrip_and_conflict() {
        let (_dir, store) = store();

        assert!(!store.exists("a").await.unwrap());
        let id = store.create_pack_record(&record("a")).await.unwrap();
        assert!(!id.is_empty());
        assert!(store.exists("a").await.unwrap());

        let err = store.create_pack_record(&record("a")).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_find_existing_bulk() {
        let (_dir, store) = store();
        for id in ["b", "d"] {
            store.create_pack_record(&record(id)).await.unwrap();
        }

        let ids: Vec<String> = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        let existing = store.find_existing(&ids).await.unwrap();
        assert_eq!(existing, HashSet::from(["b".to_string(), "d".to_string()]));
        assert!(store.find_existing(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_paged_listing() {
        let (_dir, store) = store();
        for i in 0..7 {
            store.create_pack_record(&record(&format!("p{}", i))).await.unwrap();
        }

        let page = store.list_identifiers_page(0, 3).await.unwrap();
        assert_eq!(page, vec!["p0", "p1", "p2"]);

        let all = list_all_identifiers(&store, 3).await.unwrap();
        assert_eq!(all.len(), 7);
        assert_eq!(all[6], "p6");
    }

    #[tokio::test]
    async fn test_upload_is_idempotent() {
        let (_dir, store) = store();
        store.ensure_namespace("pk").await.unwrap();

        let first = store.upload_asset("pk/1.webp", b"one", "image/webp").await.unwrap();
        assert!(first.was_written());
        assert!(store.asset_exists("pk/1.webp").await.unwrap());

        let second = store.upload_asset("pk/1.webp", b"two", "image/webp").await.unwrap();
        assert!(!second.was_written());
        assert_eq!(first.url(), second.url());

        let on_disk = tokio::fs::read(first.url()).await.unwrap();
        assert_eq!(on_disk, b"one");
    }

    #[tokio::test]
    async fn test_path_escape_rejected() {
        let (_dir, store) = store();
        let err = store
            .upload_asset("../outside.webp", b"x", "image/webp")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath(_)));
        assert!(store.asset_exists("/etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn test_sticker_records_and_stats() {
        let (_dir, store) = store();
        let pack_id = store.create_pack_record(&record("a")).await.unwrap();

        let sticker = StickerRecord {
            pack_record_id: pack_id.clone(),
            pack_identifier: "a".to_string(),
            name: "1.webp".to_string(),
            emojis: vec!["😊".to_string()],
            size_bytes: 1234,
        };
        let first = store.create_sticker_record(&sticker).await.unwrap();
        let again = store.create_sticker_record(&sticker).await.unwrap();
        assert_eq!(first, again);

        let stats = store.stats().await.unwrap();
        assert_eq!(
            stats,
            StoreStats {
                packs: 1,
                animated_packs: 0,
                stickers: 1
            }
        );
    }

    #[tokio::test]
    async fn test_cursor_roundtrip() {
        let (_dir, store) = store();
        assert!(store.load_cursor().await.unwrap().is_none());

        let state = CursorState {
            locale_index: 1,
            keyword_index: 3,
            page: 2,
            last_processed_pack_id: Some("xyz".to_string()),
            total_runtime_hours: 1.5,
            cycles_completed: 4,
            last_cycle_at: Some(Utc::now()),
        };
        store.save_cursor(&state).await.unwrap();
        let loaded = store.load_cursor().await.unwrap().unwrap();
        assert_eq!(loaded.locale_index, 1);
        assert_eq!(loaded.keyword_index, 3);
        assert_eq!(loaded.page, 2);
        assert_eq!(loaded.cycles_completed, 4);
        assert!(loaded.last_cycle_at.is_some());

        let mut next = state.clone();
        next.page = 3;
        store.save_cursor(&next).await.unwrap();
        assert_eq!(store.load_cursor().await.unwrap().unwrap().page, 3);
    }

    #[tokio::test]
    async fn test_file_backed_store_persists() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("meta.db");
        {
            let store = LocalStore::new(&dir.path().join("assets"), &db).unwrap();
            store.create_pack_record(&record("kept")).await.unwrap();
        }
        let store = LocalStore::new(&dir.path().join("assets"), &db).unwrap();
        assert!(store.exists("kept").await.unwrap());
    }
}
