//! Mock upstream API for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::fixtures;
use crate::pack::Pack;
use crate::upstream::{StickerApi, UpstreamError};

/// A recorded upstream call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Recommended {
        locale: String,
        page: u32,
        category: Option<String>,
    },
    RecommendedLight {
        locale: String,
        category: Option<String>,
    },
    Search {
        keyword: String,
        page: u32,
        locale: String,
    },
    Download {
        url: String,
    },
}

/// Mock implementation of the StickerApi trait.
///
/// Unconfigured pages come back empty. Unconfigured downloads return a
/// small well-formed WebP so the happy path needs no setup.
#[derive(Debug)]
pub struct MockStickerApi {
    calls: Arc<RwLock<Vec<ApiCall>>>,
    search_pages: Arc<RwLock<HashMap<(String, u32), Vec<Pack>>>>,
    recommended_pages: Arc<RwLock<HashMap<u32, Vec<Pack>>>>,
    light_feed: Arc<RwLock<HashMap<Option<String>, Vec<Pack>>>>,
    downloads: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    failing_downloads: Arc<RwLock<HashSet<String>>>,
    /// Remaining search calls that fail with a 503.
    search_failures: Arc<RwLock<usize>>,
}

impl Default for MockStickerApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStickerApi {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            search_pages: Arc::new(RwLock::new(HashMap::new())),
            recommended_pages: Arc::new(RwLock::new(HashMap::new())),
            light_feed: Arc::new(RwLock::new(HashMap::new())),
            downloads: Arc::new(RwLock::new(HashMap::new())),
            failing_downloads: Arc::new(RwLock::new(HashSet::new())),
            search_failures: Arc::new(RwLock::new(0)),
        }
    }

    /// Sets one search page for a keyword (any locale).
    pub async fn set_search_page(&self, keyword: &str, page: u32, packs: Vec<Pack>) {
        self.search_pages
            .write()
            .await
            .insert((keyword.to_string(), page), packs);
    }

    /// Sets one page of the full recommended feed (any locale).
    pub async fn set_recommended_page(&self, page: u32, packs: Vec<Pack>) {
        self.recommended_pages.write().await.insert(page, packs);
    }

    pub async fn set_light_feed(&self, category: Option<&str>, packs: Vec<Pack>) {
        self.light_feed
            .write()
            .await
            .insert(category.map(String::from), packs);
    }

    pub async fn set_download(&self, url: &str, bytes: Vec<u8>) {
        self.downloads.write().await.insert(url.to_string(), bytes);
    }

    pub async fn fail_download(&self, url: &str) {
        self.failing_downloads.write().await.insert(url.to_string());
    }

    /// Makes the next `count` search calls fail with a 503.
    pub async fn fail_searches(&self, count: usize) {
        *self.search_failures.write().await = count;
    }

    pub async fn calls(&self) -> Vec<ApiCall> {
        self.calls.read().await.clone()
    }

    pub async fn search_calls(&self) -> Vec<(String, u32, String)> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                ApiCall::Search {
                    keyword,
                    page,
                    locale,
                } => Some((keyword.clone(), *page, locale.clone())),
                _ => None,
            })
            .collect()
    }

    /// URLs downloaded, in order.
    pub async fn downloaded_urls(&self) -> Vec<String> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                ApiCall::Download { url } => Some(url.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl StickerApi for MockStickerApi {
    async fn fetch_recommended(
        &self,
        locale: &str,
        cursor: u32,
        category: Option<&str>,
    ) -> Result<Vec<Pack>, UpstreamError> {
        self.calls.write().await.push(ApiCall::Recommended {
            locale: locale.to_string(),
            page: cursor,
            category: category.map(String::from),
        });
        Ok(self
            .recommended_pages
            .read()
            .await
            .get(&cursor)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_recommended_light(
        &self,
        locale: &str,
        category: Option<&str>,
    ) -> Result<Vec<Pack>, UpstreamError> {
        self.calls.write().await.push(ApiCall::RecommendedLight {
            locale: locale.to_string(),
            category: category.map(String::from),
        });
        Ok(self
            .light_feed
            .read()
            .await
            .get(&category.map(String::from))
            .cloned()
            .unwrap_or_default())
    }

    async fn search(
        &self,
        keyword: &str,
        cursor: u32,
        locale: &str,
    ) -> Result<Vec<Pack>, UpstreamError> {
        self.calls.write().await.push(ApiCall::Search {
            keyword: keyword.to_string(),
            page: cursor,
            locale: locale.to_string(),
        });

        {
            let mut failures = self.search_failures.write().await;
            if *failures > 0 {
                *failures -= 1;
                return Err(UpstreamError::Http {
                    status: 503,
                    body: "mock outage".to_string(),
                });
            }
        }

        Ok(self
            .search_pages
            .read()
            .await
            .get(&(keyword.to_string(), cursor))
            .cloned()
            .unwrap_or_default())
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, UpstreamError> {
        self.calls.write().await.push(ApiCall::Download {
            url: url.to_string(),
        });
        if self.failing_downloads.read().await.contains(url) {
            return Err(UpstreamError::Http {
                status: 404,
                body: "not found".to_string(),
            });
        }
        Ok(self
            .downloads
            .read()
            .await
            .get(url)
            .cloned()
            .unwrap_or_else(|| fixtures::webp_bytes(4_000)))
    }
}
