use serde::{Deserialize, Serialize};

/// Where a pack was discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PackSource {
    /// Full recommended feed.
    Recommended,
    /// Lightweight recommended feed (single preview asset per item).
    RecommendedLight { category: Option<String> },
    /// Keyword search.
    Search { keyword: String, page: u32 },
}

/// A content pack as announced by the upstream API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pack {
    /// Globally unique, opaque identifier.
    pub identifier: String,
    pub name: String,
    pub publisher: String,
    /// Locale the pack was discovered under (e.g. "pt-BR").
    pub locale: String,
    /// Animated flag as claimed at discovery time. Never rewritten later.
    pub is_animated: bool,
    /// Shared prefix for every asset URL.
    pub resource_url_prefix: Option<String>,
    /// Ordered raw asset filenames.
    pub resource_files: Vec<String>,
    pub source: PackSource,
}

impl Pack {
    /// Full download URL for one of the pack's asset files.
    pub fn asset_url(&self, file: &str) -> Option<String> {
        let prefix = self.resource_url_prefix.as_deref()?;
        if prefix.ends_with('/') {
            Some(format!("{}{}", prefix, file))
        } else {
            Some(format!("{}/{}", prefix, file))
        }
    }

    /// Two-letter language code stored with the pack record.
    pub fn lang(&self) -> &str {
        lang_for_locale(&self.locale)
    }
}

/// Maps a locale such as "pt-BR" to the language code stored on pack records.
pub fn lang_for_locale(locale: &str) -> &str {
    match locale {
        "pt-BR" => "pt",
        "en-US" => "en",
        "es-ES" => "es",
        "fr-FR" => "fr",
        "" => "pt",
        other => other.split('-').next().filter(|s| !s.is_empty()).unwrap_or("pt"),
    }
}

/// Output filename for a transcoded sticker: same stem, `.webp` extension.
pub fn output_filename(original: &str) -> String {
    let stem = match original.rfind('.') {
        Some(idx) if idx > 0 => &original[..idx],
        _ => original,
    };
    format!("{}.webp", stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack_with_prefix(prefix: Option<&str>) -> Pack {
        Pack {
            identifier: "abc".to_string(),
            name: "Cats".to_string(),
            publisher: "someone".to_string(),
            locale: "pt-BR".to_string(),
            is_animated: false,
            resource_url_prefix: prefix.map(String::from),
            resource_files: vec!["1.webp".to_string()],
            source: PackSource::Recommended,
        }
    }

    #[test]
    fn test_asset_url_joins_prefix() {
        let pack = pack_with_prefix(Some("https://cdn.example/packs/abc/"));
        assert_eq!(
            pack.asset_url("1.webp").as_deref(),
            Some("https://cdn.example/packs/abc/1.webp")
        );

        let pack = pack_with_prefix(Some("https://cdn.example/packs/abc"));
        assert_eq!(
            pack.asset_url("1.webp").as_deref(),
            Some("https://cdn.example/packs/abc/1.webp")
        );
    }

    #[test]
    fn test_asset_url_without_prefix() {
        assert!(pack_with_prefix(None).asset_url("1.webp").is_none());
    }

    #[test]
    fn test_lang_for_locale() {
        assert_eq!(lang_for_locale("pt-BR"), "pt");
        assert_eq!(lang_for_locale("en-US"), "en");
        assert_eq!(lang_for_locale("de-DE"), "de");
        assert_eq!(lang_for_locale(""), "pt");
    }

    #[test]
    fn test_output_filename() {
        assert_eq!(output_filename("smile.png"), "smile.webp");
        assert_eq!(output_filename("a.b.gif"), "a.b.webp");
        assert_eq!(output_filename("noext"), "noext.webp");
        assert_eq!(output_filename("x.webp"), "x.webp");
    }
}
