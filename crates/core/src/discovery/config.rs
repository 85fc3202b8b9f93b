use serde::{Deserialize, Serialize};

/// Discovery controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Locales walked in order.
    #[serde(default = "default_locales")]
    pub locales: Vec<String>,

    /// Search keywords walked in order.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,

    /// Category hints for the recommended feed.
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,

    /// Terms that historically yield the most new packs.
    #[serde(default = "default_high_yield_keywords")]
    pub high_yield_keywords: Vec<String>,

    /// Chance that a recommended fetch carries a category hint.
    #[serde(default = "default_category_probability")]
    pub category_probability: f64,

    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Page limit while in efficiency mode.
    #[serde(default = "default_efficiency_max_pages")]
    pub efficiency_max_pages: u32,

    /// Packs taken from one keyword before moving on.
    #[serde(default = "default_max_packs_per_keyword")]
    pub max_packs_per_keyword: usize,

    /// Consecutive empty (or failed) pages that end a walk.
    #[serde(default = "default_max_empty_pages")]
    pub max_empty_pages: u32,

    /// Keywords kept when narrowing in efficiency mode.
    #[serde(default = "default_efficiency_keyword_limit")]
    pub efficiency_keyword_limit: usize,

    /// Request delay multiplier in efficiency mode.
    #[serde(default = "default_efficiency_delay_factor")]
    pub efficiency_delay_factor: f64,

    #[serde(default)]
    pub strategy: StrategyConfig,
}

/// Hysteresis thresholds for the discovery/efficiency switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Consecutive duplicates that force efficiency mode.
    #[serde(default = "default_enter_consecutive_duplicates")]
    pub enter_consecutive_duplicates: u64,

    /// Duplicate ratio above which efficiency mode is entered.
    #[serde(default = "default_enter_duplicate_ratio")]
    pub enter_duplicate_ratio: f64,

    /// Observations required before the ratio is trusted.
    #[serde(default = "default_min_ratio_samples")]
    pub min_ratio_samples: u64,

    /// Consecutive new packs needed to leave efficiency mode.
    #[serde(default = "default_exit_consecutive_new")]
    pub exit_consecutive_new: u64,

    /// Consecutive duplicates must be below this to leave efficiency mode.
    #[serde(default = "default_exit_max_consecutive_duplicates")]
    pub exit_max_consecutive_duplicates: u64,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_locales() -> Vec<String> {
    strings(&["pt-BR"])
}

fn default_keywords() -> Vec<String> {
    strings(&[
        "memes",
        "emoji",
        "animado",
        "brasileiro",
        "whatsapp",
        "telegram",
        "funny",
        "amor",
        "trabalho",
        "família",
        "amigos",
        "feliz",
        "triste",
        "raiva",
        "surpresa",
        "festa",
        "natal",
        "ano novo",
        "halloween",
        "carnaval",
    ])
}

fn default_categories() -> Vec<String> {
    strings(&[
        "amor",
        "memes",
        "emoji",
        "love",
        "cute",
        "anime",
        "funny",
        "cat",
        "kpop",
        "brasil",
        "happy",
        "flamengo",
        "pokemon",
        "disney",
        "food",
        "christmas",
        "sad",
        "thinking",
        "sleeping",
        "party",
    ])
}

fn default_high_yield_keywords() -> Vec<String> {
    strings(&["amor", "memes", "emoji", "funny", "cute"])
}

fn default_category_probability() -> f64 {
    0.7
}

fn default_max_pages() -> u32 {
    5
}

fn default_efficiency_max_pages() -> u32 {
    2
}

fn default_max_packs_per_keyword() -> usize {
    50
}

fn default_max_empty_pages() -> u32 {
    3
}

fn default_efficiency_keyword_limit() -> usize {
    3
}

fn default_efficiency_delay_factor() -> f64 {
    0.7
}

fn default_enter_consecutive_duplicates() -> u64 {
    50
}

fn default_enter_duplicate_ratio() -> f64 {
    0.8
}

fn default_min_ratio_samples() -> u64 {
    20
}

fn default_exit_consecutive_new() -> u64 {
    10
}

fn default_exit_max_consecutive_duplicates() -> u64 {
    10
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            locales: default_locales(),
            keywords: default_keywords(),
            categories: default_categories(),
            high_yield_keywords: default_high_yield_keywords(),
            category_probability: default_category_probability(),
            max_pages: default_max_pages(),
            efficiency_max_pages: default_efficiency_max_pages(),
            max_packs_per_keyword: default_max_packs_per_keyword(),
            max_empty_pages: default_max_empty_pages(),
            efficiency_keyword_limit: default_efficiency_keyword_limit(),
            efficiency_delay_factor: default_efficiency_delay_factor(),
            strategy: StrategyConfig::default(),
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            enter_consecutive_duplicates: default_enter_consecutive_duplicates(),
            enter_duplicate_ratio: default_enter_duplicate_ratio(),
            min_ratio_samples: default_min_ratio_samples(),
            exit_consecutive_new: default_exit_consecutive_new(),
            exit_max_consecutive_duplicates: default_exit_max_consecutive_duplicates(),
        }
    }
}

impl DiscoveryConfig {
    /// Sets locales and keywords.
    pub fn with_targets(mut self, locales: &[&str], keywords: &[&str]) -> Self {
        self.locales = strings(locales);
        self.keywords = strings(keywords);
        self
    }

    /// Page limit for the given mode.
    pub fn page_limit(&self, efficient: bool) -> u32 {
        if efficient {
            self.efficiency_max_pages.min(self.max_pages)
        } else {
            self.max_pages
        }
    }

    /// Keywords to walk in efficiency mode.
    ///
    /// Configured keywords that are also high-yield, capped; if none overlap,
    /// the first high-yield terms.
    pub fn narrowed_keywords(&self) -> Vec<String> {
        let limit = self.efficiency_keyword_limit;
        let overlap: Vec<String> = self
            .keywords
            .iter()
            .filter(|k| self.high_yield_keywords.contains(k))
            .take(limit)
            .cloned()
            .collect();
        if overlap.is_empty() {
            self.high_yield_keywords.iter().take(limit).cloned().collect()
        } else {
            overlap
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.locales, vec!["pt-BR"]);
        assert_eq!(config.keywords.len(), 20);
        assert_eq!(config.categories.len(), 20);
        assert_eq!(config.max_pages, 5);
        assert_eq!(config.max_empty_pages, 3);
        assert_eq!(config.strategy.enter_consecutive_duplicates, 50);
    }

    #[test]
    fn test_page_limit_by_mode() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.page_limit(false), 5);
        assert_eq!(config.page_limit(true), 2);
    }

    #[test]
    fn test_narrowed_keywords_overlap() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.narrowed_keywords(), vec!["memes", "emoji", "funny"]);
    }

    #[test]
    fn test_narrowed_keywords_without_overlap() {
        let config = DiscoveryConfig::default().with_targets(&["pt-BR"], &["natal", "festa"]);
        assert_eq!(config.narrowed_keywords(), vec!["amor", "memes", "emoji"]);
    }

    #[test]
    fn test_partial_toml() {
        let config: DiscoveryConfig = toml::from_str(
            r#"
            locales = ["pt-BR", "en-US"]
            max_pages = 8

            [strategy]
            exit_consecutive_new = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.locales.len(), 2);
        assert_eq!(config.max_pages, 8);
        assert_eq!(config.keywords.len(), 20);
        assert_eq!(config.strategy.exit_consecutive_new, 4);
        assert_eq!(config.strategy.min_ratio_samples, 20);
    }
}
