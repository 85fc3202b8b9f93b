//! HTTP client for the sticker.ly mobile API.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use super::config::UpstreamConfig;
use super::error::UpstreamError;
use super::retry::retry_with_backoff;
use super::types::{normalize_light, Envelope, LightResult, RecommendResult, SearchResult};
use super::{Endpoint, StickerApi};
use crate::metrics;
use crate::pack::{Pack, PackSource};

/// sticker.ly API client.
///
/// Each request carries a device identifier taken round-robin from a pool
/// generated at construction, plus the mobile app User-Agent.
pub struct StickerlyClient {
    client: Client,
    config: UpstreamConfig,
    device_ids: Vec<String>,
    next_device: AtomicUsize,
}

impl StickerlyClient {
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UpstreamError::Client(e.to_string()))?;

        let device_ids = (0..config.device_pool_size.max(1))
            .map(|_| generate_device_id())
            .collect();

        Ok(Self {
            client,
            config,
            device_ids,
            next_device: AtomicUsize::new(0),
        })
    }

    fn next_device_id(&self) -> String {
        let idx = self.next_device.fetch_add(1, Ordering::Relaxed) % self.device_ids.len();
        self.device_ids[idx].clone()
    }

    fn recommend_url(&self, cursor: u32, category: Option<&str>) -> String {
        let mut url = format!(
            "{}/v3.1/stickerPack/recommend?withAnimation=true&cursor={}",
            self.config.base_url, cursor
        );
        if let Some(category) = category {
            url.push_str("&category=");
            url.push_str(&urlencoding::encode(category));
        }
        url
    }

    fn light_url(&self, category: Option<&str>) -> String {
        match category {
            Some(category) => format!(
                "{}/v1/sticker/recommend?category={}",
                self.config.base_url,
                urlencoding::encode(category)
            ),
            None => format!("{}/v1/sticker/recommend", self.config.base_url),
        }
    }

    fn search_url(&self) -> String {
        format!(
            "{}/v3.1/stickerPack/search?withAnimation=true",
            self.config.base_url
        )
    }

    /// Sends a request with retries and decodes the JSON envelope.
    async fn call<T, B>(&self, endpoint: Endpoint, locale: &str, build: B) -> Result<T, UpstreamError>
    where
        T: DeserializeOwned + Default,
        B: Fn(&Client) -> RequestBuilder,
    {
        let user_agent = self.config.user_agent(locale);

        let result = retry_with_backoff(&self.config.retry, endpoint.as_str(), || {
            let request = build(&self.client)
                .header(USER_AGENT, user_agent.clone())
                .header("x-duid", self.next_device_id());
            async move {
                let response = request.send().await?;
                let response = check_status(response).await?;
                response
                    .json::<Envelope<T>>()
                    .await
                    .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))
            }
        })
        .await;

        metrics::record_upstream_call(endpoint, result.is_ok());
        Ok(result?.result.unwrap_or_default())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::Http {
        status,
        body: body.chars().take(200).collect(),
    })
}

/// 16 hex characters, the shape the app sends as `x-duid`.
fn generate_device_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..16].to_string()
}

#[async_trait]
impl StickerApi for StickerlyClient {
    async fn fetch_recommended(
        &self,
        locale: &str,
        cursor: u32,
        category: Option<&str>,
    ) -> Result<Vec<Pack>, UpstreamError> {
        let url = self.recommend_url(cursor, category);
        debug!(locale, cursor, ?category, "Fetching recommended packs");

        let result: RecommendResult = self
            .call(Endpoint::Recommended, locale, |c| c.get(&url))
            .await?;

        Ok(result
            .packs
            .into_iter()
            .filter_map(|p| p.into_pack(locale, PackSource::Recommended))
            .collect())
    }

    async fn fetch_recommended_light(
        &self,
        locale: &str,
        category: Option<&str>,
    ) -> Result<Vec<Pack>, UpstreamError> {
        let url = self.light_url(category);
        debug!(locale, ?category, "Fetching light recommended feed");

        let result: LightResult = self
            .call(Endpoint::RecommendedLight, locale, |c| c.get(&url))
            .await?;

        Ok(normalize_light(result.items, locale, category))
    }

    async fn search(
        &self,
        keyword: &str,
        cursor: u32,
        locale: &str,
    ) -> Result<Vec<Pack>, UpstreamError> {
        let url = self.search_url();
        let body = serde_json::json!({ "keyword": keyword, "cursor": cursor });
        debug!(keyword, cursor, locale, "Searching packs");

        let result: SearchResult = self
            .call(Endpoint::Search, locale, |c| {
                c.post(&url)
                    .header(CONTENT_TYPE, "application/json")
                    .json(&body)
            })
            .await?;

        Ok(result
            .stickerPacks
            .into_iter()
            .filter_map(|p| {
                p.into_pack(
                    locale,
                    PackSource::Search {
                        keyword: keyword.to_string(),
                        page: cursor,
                    },
                )
            })
            .collect())
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, UpstreamError> {
        let result = retry_with_backoff(&self.config.retry, Endpoint::Download.as_str(), || {
            let request = self.client.get(url).header("x-duid", self.next_device_id());
            async move {
                let response = check_status(request.send().await?).await?;
                Ok::<_, UpstreamError>(response.bytes().await?.to_vec())
            }
        })
        .await;

        metrics::record_upstream_call(Endpoint::Download, result.is_ok());
        result
    }
}
