//! Upstream sticker API.
//!
//! [`StickerApi`] is the narrow seam the discovery controller and pipeline
//! consume. [`StickerlyClient`] talks to the real service; every response
//! shape is normalized into [`Pack`] before it leaves this module.

mod client;
mod config;
mod error;
mod retry;
mod types;

pub use client::StickerlyClient;
pub use config::UpstreamConfig;
pub use error::UpstreamError;
pub use retry::{retry_with_backoff, RetryConfig};
pub use types::{LightItem, RawPack};

use async_trait::async_trait;

use crate::pack::Pack;

/// Endpoint label used in logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Recommended,
    RecommendedLight,
    Search,
    Download,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recommended => "recommended",
            Self::RecommendedLight => "recommended_light",
            Self::Search => "search",
            Self::Download => "download",
        }
    }
}

/// Read access to the upstream pack catalogue.
#[async_trait]
pub trait StickerApi: Send + Sync {
    /// One page of the full recommended feed.
    async fn fetch_recommended(
        &self,
        locale: &str,
        cursor: u32,
        category: Option<&str>,
    ) -> Result<Vec<Pack>, UpstreamError>;

    /// The lightweight recommended feed (single preview asset per pack).
    async fn fetch_recommended_light(
        &self,
        locale: &str,
        category: Option<&str>,
    ) -> Result<Vec<Pack>, UpstreamError>;

    /// One page of keyword search results.
    async fn search(
        &self,
        keyword: &str,
        cursor: u32,
        locale: &str,
    ) -> Result<Vec<Pack>, UpstreamError>;

    /// Downloads a raw asset.
    async fn download(&self, url: &str) -> Result<Vec<u8>, UpstreamError>;
}
