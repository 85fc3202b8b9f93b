//! Raw upstream payload shapes and their normalization into [`Pack`].

use serde::Deserialize;
use std::collections::HashSet;

use crate::pack::{Pack, PackSource};

/// Pack entry as returned by the recommended and search endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[allow(non_snake_case)]
pub struct RawPack {
    pub packId: Option<String>,
    pub name: Option<String>,
    pub authorName: Option<String>,
    #[serde(default)]
    pub isAnimated: bool,
    #[serde(default)]
    pub resourceFiles: Vec<String>,
    pub resourceUrlPrefix: Option<String>,
}

impl RawPack {
    /// Converts to the common shape; entries without an id are dropped.
    pub fn into_pack(self, locale: &str, source: PackSource) -> Option<Pack> {
        let identifier = self.packId.filter(|id| !id.trim().is_empty())?;
        Some(Pack {
            identifier,
            name: self.name.unwrap_or_default(),
            publisher: self.authorName.unwrap_or_default(),
            locale: locale.to_string(),
            is_animated: self.isAnimated,
            resource_url_prefix: self.resourceUrlPrefix,
            resource_files: self.resourceFiles,
            source,
        })
    }
}

/// Item of the lightweight recommended feed.
#[derive(Debug, Clone, Default, Deserialize)]
#[allow(non_snake_case)]
pub struct LightItem {
    pub packId: Option<String>,
    pub packName: Option<String>,
    #[serde(default)]
    pub isAnimated: bool,
    pub resourceUrl: Option<String>,
    #[serde(default)]
    pub viewCount: u64,
}

impl LightItem {
    /// Converts to the common shape.
    ///
    /// The light feed carries a single asset URL and no publisher, so the
    /// URL is split into prefix and file name and the publisher is
    /// recorded as "unknown".
    pub fn into_pack(self, locale: &str, category: Option<&str>) -> Option<Pack> {
        let identifier = self.packId.filter(|id| !id.trim().is_empty())?;

        let (prefix, files) = match self.resourceUrl.as_deref() {
            Some(url) => match url.rfind('/') {
                Some(idx) if idx + 1 < url.len() => (
                    Some(url[..=idx].to_string()),
                    vec![url[idx + 1..].to_string()],
                ),
                _ => (None, Vec::new()),
            },
            None => (None, Vec::new()),
        };

        Some(Pack {
            identifier,
            name: self.packName.unwrap_or_default(),
            publisher: "unknown".to_string(),
            locale: locale.to_string(),
            is_animated: self.isAnimated,
            resource_url_prefix: prefix,
            resource_files: files,
            source: PackSource::RecommendedLight {
                category: category.map(String::from),
            },
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub result: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RecommendResult {
    #[serde(default)]
    pub packs: Vec<RawPack>,
}

#[derive(Debug, Default, Deserialize)]
#[allow(non_snake_case)]
pub(crate) struct SearchResult {
    #[serde(default)]
    pub stickerPacks: Vec<RawPack>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LightResult {
    #[serde(default)]
    pub items: Vec<LightItem>,
}

/// Normalizes light items, collapsing repeated pack ids.
pub(crate) fn normalize_light(items: Vec<LightItem>, locale: &str, category: Option<&str>) -> Vec<Pack> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter_map(|item| item.into_pack(locale, category))
        .filter(|pack| seen.insert(pack.identifier.clone()))
        .collect()
}
