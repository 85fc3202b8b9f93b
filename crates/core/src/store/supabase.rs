//! Supabase (Storage + PostgREST) backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

use super::config::SupabaseConfig;
use super::error::StoreError;
use super::types::{PackRecord, StickerRecord, StoreStats, UploadOutcome};
use super::{CursorStore, PackStore};
use crate::cursor::CursorState;

const PACKS_TABLE: &str = "packs";
const STICKERS_TABLE: &str = "stickers";
const CURSOR_TABLE: &str = "scraping_persistent_state";

/// Supabase-backed store.
pub struct SupabaseStore {
    client: Client,
    config: SupabaseConfig,
}

#[derive(Debug, Deserialize)]
struct IdentifierRow {
    identifier: String,
}

#[derive(Debug, Deserialize)]
struct InsertedRow {
    id: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct CursorRow {
    id: i64,
    current_locale_index: i64,
    current_keyword_index: i64,
    current_page: i64,
    last_processed_pack_id: Option<String>,
    total_runtime_hours: f64,
    cycles_completed: i64,
    last_cycle_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl From<CursorRow> for CursorState {
    fn from(row: CursorRow) -> Self {
        Self {
            locale_index: row.current_locale_index.max(0) as usize,
            keyword_index: row.current_keyword_index.max(0) as usize,
            page: row.current_page.max(0) as u32,
            last_processed_pack_id: row.last_processed_pack_id,
            total_runtime_hours: row.total_runtime_hours,
            cycles_completed: row.cycles_completed.max(0) as u64,
            last_cycle_at: row.last_cycle_at,
        }
    }
}

impl SupabaseStore {
    pub fn new(config: SupabaseConfig) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.service_key)
            .map_err(|e| StoreError::Request(format!("invalid service key: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.service_key))
            .map_err(|e| StoreError::Request(format!("invalid service key: {}", e)))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    fn base(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base(), table)
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base(),
            self.config.bucket,
            path
        )
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base(),
            self.config.bucket,
            path
        )
    }

    async fn get_rows<T: for<'de> Deserialize<'de>>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let response = self
            .client
            .get(self.table_url(table))
            .query(query)
            .send()
            .await?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    async fn insert_row(&self, table: &str, body: Value) -> Result<String, StoreError> {
        let response = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Conflict(body));
        }
        let response = check_status(response).await?;

        let rows: Vec<InsertedRow> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::InvalidResponse("insert returned no rows".to_string()))?;

        Ok(match row.id {
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    async fn count(&self, table: &str, filter: Option<(&str, &str)>) -> Result<u64, StoreError> {
        let mut request = self
            .client
            .head(self.table_url(table))
            .header("Prefer", "count=exact")
            .query(&[("select", "id")]);
        if let Some((column, value)) = filter {
            request = request.query(&[(column, value)]);
        }

        let response = check_status(request.send().await?).await?;
        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        parse_content_range_total(range)
            .ok_or_else(|| StoreError::InvalidResponse(format!("bad Content-Range: {}", range)))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Http {
        status,
        body: body.chars().take(200).collect(),
    })
}

/// Builds a PostgREST `in.(...)` filter with quoted values.
pub(crate) fn in_filter(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

/// Total from a `Content-Range: 0-24/573` header.
pub(crate) fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.trim().parse().ok()
}

/// Whether a storage error body means the object already exists.
fn is_duplicate_object(status: u16, body: &str) -> bool {
    status == 409 || body.contains("Duplicate") || body.contains("already exists")
}

/// Numeric record ids are sent back as JSON numbers.
fn record_id_value(id: &str) -> Value {
    id.parse::<i64>().map(Value::from).unwrap_or_else(|_| Value::from(id))
}

#[async_trait]
impl PackStore for SupabaseStore {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn exists(&self, identifier: &str) -> Result<bool, StoreError> {
        let rows: Vec<IdentifierRow> = self
            .get_rows(
                PACKS_TABLE,
                &[
                    ("select", "identifier".to_string()),
                    ("identifier", format!("eq.{}", identifier)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn list_identifiers_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let rows: Vec<IdentifierRow> = self
            .get_rows(
                PACKS_TABLE,
                &[
                    ("select", "identifier".to_string()),
                    ("order", "created_at.asc".to_string()),
                    ("offset", offset.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.identifier).collect())
    }

    async fn find_existing(&self, identifiers: &[String]) -> Result<HashSet<String>, StoreError> {
        if identifiers.is_empty() {
            return Ok(HashSet::new());
        }
        let rows: Vec<IdentifierRow> = self
            .get_rows(
                PACKS_TABLE,
                &[
                    ("select", "identifier".to_string()),
                    ("identifier", in_filter(identifiers)),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.identifier).collect())
    }

    async fn ensure_namespace(&self, _pack_identifier: &str) -> Result<(), StoreError> {
        // Object storage creates prefixes implicitly.
        Ok(())
    }

    async fn upload_asset(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<UploadOutcome, StoreError> {
        let response = self
            .client
            .post(self.object_url(path))
            .header(CONTENT_TYPE, content_type)
            .header("cache-control", "3600")
            .header("x-upsert", "false")
            .body(bytes.to_vec())
            .send()
            .await?;

        let url = self.public_url(path);
        let status = response.status();
        if status.is_success() {
            debug!(path, size = bytes.len(), "Asset uploaded");
            return Ok(UploadOutcome::Uploaded { url });
        }

        let body = response.text().await.unwrap_or_default();
        if is_duplicate_object(status.as_u16(), &body) {
            debug!(path, "Asset already present");
            return Ok(UploadOutcome::AlreadyPresent { url });
        }

        Err(StoreError::Http {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        })
    }

    async fn asset_exists(&self, path: &str) -> Result<bool, StoreError> {
        let url = format!(
            "{}/storage/v1/object/info/{}/{}",
            self.base(),
            self.config.bucket,
            path
        );
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            return Ok(false);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Http {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        })
    }

    async fn create_pack_record(&self, record: &PackRecord) -> Result<String, StoreError> {
        let now = Utc::now().to_rfc3339();
        self.insert_row(
            PACKS_TABLE,
            json!({
                "identifier": record.identifier,
                "name": record.name,
                "publisher": record.publisher,
                "tray": record.tray_image_file,
                "is_animated": record.is_animated,
                "lang": record.lang,
                "zip_size": 0,
                "downloads": 0,
                "level": 0,
                "origin": "sticker.ly",
                "created_at": now,
                "updated_at": now,
            }),
        )
        .await
    }

    async fn create_sticker_record(&self, record: &StickerRecord) -> Result<String, StoreError> {
        let now = Utc::now().to_rfc3339();
        self.insert_row(
            STICKERS_TABLE,
            json!({
                "pack_id": record_id_value(&record.pack_record_id),
                "name": record.name,
                "size": record.size_bytes,
                "emoji": record.emojis,
                "downloads": 0,
                "created_at": now,
                "updated_at": now,
            }),
        )
        .await
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        Ok(StoreStats {
            packs: self.count(PACKS_TABLE, None).await?,
            animated_packs: self
                .count(PACKS_TABLE, Some(("is_animated", "eq.true")))
                .await?,
            stickers: self.count(STICKERS_TABLE, None).await?,
        })
    }
}

#[async_trait]
impl CursorStore for SupabaseStore {
    async fn load_cursor(&self) -> Result<Option<CursorState>, StoreError> {
        let rows: Vec<CursorRow> = self
            .get_rows(
                CURSOR_TABLE,
                &[("select", "*".to_string()), ("id", "eq.1".to_string())],
            )
            .await?;
        Ok(rows.into_iter().next().map(CursorState::from))
    }

    async fn save_cursor(&self, state: &CursorState) -> Result<(), StoreError> {
        let row = CursorRow {
            id: 1,
            current_locale_index: state.locale_index as i64,
            current_keyword_index: state.keyword_index as i64,
            current_page: state.page as i64,
            last_processed_pack_id: state.last_processed_pack_id.clone(),
            total_runtime_hours: state.total_runtime_hours,
            cycles_completed: state.cycles_completed as i64,
            last_cycle_at: state.last_cycle_at,
            updated_at: Some(Utc::now()),
        };

        let response = self
            .client
            .post(self.table_url(CURSOR_TABLE))
            .header("Prefer", "resolution=merge-duplicates")
            .json(&row)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SupabaseStore {
        SupabaseStore::new(SupabaseConfig {
            url: "https://proj.supabase.co/".to_string(),
            service_key: "secret".to_string(),
            bucket: "stickers".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_urls() {
        let s = store();
        assert_eq!(s.table_url("packs"), "https://proj.supabase.co/rest/v1/packs");
        assert_eq!(
            s.object_url("abc/1.webp"),
            "https://proj.supabase.co/storage/v1/object/stickers/abc/1.webp"
        );
        assert_eq!(
            s.public_url("abc/tray.png"),
            "https://proj.supabase.co/storage/v1/object/public/stickers/abc/tray.png"
        );
    }

    #[test]
    fn test_in_filter_quotes_values() {
        let ids = vec!["a".to_string(), "b,c".to_string(), "q\"x".to_string()];
        assert_eq!(in_filter(&ids), r#"in.("a","b,c","q\"x")"#);
    }

    #[test]
    fn test_content_range() {
        assert_eq!(parse_content_range_total("0-24/573"), Some(573));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("garbage"), None);
    }

    #[test]
    fn test_duplicate_detection() {
        assert!(is_duplicate_object(409, ""));
        assert!(is_duplicate_object(400, r#"{"error":"Duplicate","message":"The resource already exists"}"#));
        assert!(!is_duplicate_object(500, "boom"));
    }

    #[test]
    fn test_record_id_value() {
        assert_eq!(record_id_value("42"), json!(42));
        assert_eq!(record_id_value("uuid-like"), json!("uuid-like"));
    }

    #[test]
    fn test_cursor_row_conversion() {
        let row: CursorRow = serde_json::from_value(json!({
            "id": 1,
            "current_locale_index": 1,
            "current_keyword_index": 3,
            "current_page": 2,
            "last_processed_pack_id": null,
            "total_runtime_hours": 12.5,
            "cycles_completed": 7,
            "last_cycle_at": "2026-01-02T03:04:05Z"
        }))
        .unwrap();
        let state = CursorState::from(row);
        assert_eq!((state.locale_index, state.keyword_index, state.page), (1, 3, 2));
        assert_eq!(state.cycles_completed, 7);
        assert!(state.last_cycle_at.is_some());
    }
}
