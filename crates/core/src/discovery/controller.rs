use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{DiscoveryConfig, Mode, PageWalk, Pacer, Strategy};
use crate::pack::Pack;
use crate::upstream::{StickerApi, UpstreamError};

/// Decides what to fetch next and paces every upstream call.
pub struct DiscoveryController {
    api: Arc<dyn StickerApi>,
    config: DiscoveryConfig,
    strategy: Strategy,
    pacer: Pacer,
}

impl DiscoveryController {
    pub fn new(api: Arc<dyn StickerApi>, config: DiscoveryConfig, request_delay: Duration) -> Self {
        let strategy = Strategy::new(config.strategy.clone());
        Self {
            api,
            config,
            strategy,
            pacer: Pacer::new(request_delay),
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn mode(&self) -> Mode {
        self.strategy.mode()
    }

    pub fn is_efficient(&self) -> bool {
        self.strategy.is_efficient()
    }

    /// Keywords for a one-shot keyword run in the current mode.
    pub fn keywords_for_run(&self) -> Vec<String> {
        if self.is_efficient() {
            self.config.narrowed_keywords()
        } else {
            self.config.keywords.clone()
        }
    }

    /// Whether the continuous loop should search `keyword` in the current
    /// mode. Efficiency mode skips configured keywords outside the narrowed
    /// set; when nothing configured is high-yield, every keyword is kept.
    pub fn visits_keyword(&self, keyword: &str) -> bool {
        if !self.is_efficient() {
            return true;
        }
        let narrowed = self.config.narrowed_keywords();
        let addressable = narrowed.iter().any(|k| self.config.keywords.contains(k));
        !addressable || narrowed.iter().any(|k| k == keyword)
    }

    /// A fresh walk over one keyword, sized for the current mode.
    pub fn search_walk(&self, keyword: &str) -> PageWalk {
        PageWalk::new(
            format!("search:{}", keyword),
            self.config.page_limit(self.is_efficient()),
            self.config.max_packs_per_keyword,
            self.config.max_empty_pages,
        )
    }

    /// A fresh walk over the full recommended feed of one locale.
    pub fn recommended_walk(&self, locale: &str) -> PageWalk {
        PageWalk::new(
            format!("recommended:{}", locale),
            self.config.max_pages,
            usize::MAX,
            self.config.max_empty_pages,
        )
    }

    /// Categories walked through the light feed in efficiency mode.
    pub fn light_categories(&self) -> &[String] {
        &self.config.high_yield_keywords
    }

    /// A random category hint, present `category_probability` of the time.
    pub fn pick_category(&self) -> Option<String> {
        let mut rng = rand::thread_rng();
        if !rng.gen_bool(self.config.category_probability.clamp(0.0, 1.0)) {
            return None;
        }
        self.config.categories.choose(&mut rng).cloned()
    }

    async fn pace(&self) {
        let factor = if self.is_efficient() {
            self.config.efficiency_delay_factor
        } else {
            1.0
        };
        self.pacer.wait_scaled(factor).await;
    }

    pub async fn search(
        &self,
        keyword: &str,
        page: u32,
        locale: &str,
    ) -> Result<Vec<Pack>, UpstreamError> {
        self.pace().await;
        let packs = self.api.search(keyword, page, locale).await?;
        debug!(keyword, page, locale, found = packs.len(), "Search page fetched");
        Ok(packs)
    }

    pub async fn recommended(&self, locale: &str, page: u32) -> Result<Vec<Pack>, UpstreamError> {
        self.pace().await;
        let category = self.pick_category();
        let packs = self
            .api
            .fetch_recommended(locale, page, category.as_deref())
            .await?;
        debug!(
            locale,
            page,
            category = category.as_deref().unwrap_or("-"),
            found = packs.len(),
            "Recommended page fetched"
        );
        Ok(packs)
    }

    pub async fn recommended_light(
        &self,
        locale: &str,
        category: Option<&str>,
    ) -> Result<Vec<Pack>, UpstreamError> {
        self.pace().await;
        let packs = self.api.fetch_recommended_light(locale, category).await?;
        debug!(
            locale,
            category = category.unwrap_or("-"),
            found = packs.len(),
            "Light feed fetched"
        );
        Ok(packs)
    }

    /// Decision point after a page was filtered.
    pub fn record(&mut self, new: usize, duplicates: usize) -> Option<Mode> {
        self.strategy.record(new, duplicates);
        let switched = self.strategy.decide();
        if let Some(mode) = switched {
            info!(
                mode = mode.as_str(),
                max_pages = self.config.page_limit(mode == Mode::Efficiency),
                "Discovery mode changed"
            );
        }
        switched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, ApiCall, MockStickerApi};

    fn controller(api: Arc<MockStickerApi>) -> DiscoveryController {
        DiscoveryController::new(api, DiscoveryConfig::default(), Duration::ZERO)
    }

    #[tokio::test]
    async fn test_search_delegates_to_api() {
        let api = Arc::new(MockStickerApi::new());
        api.set_search_page("memes", 0, vec![fixtures::pack("a", 3)]).await;
        let controller = controller(api.clone());

        let packs = controller.search("memes", 0, "pt-BR").await.unwrap();
        assert_eq!(packs.len(), 1);
        assert_eq!(
            api.calls().await,
            vec![ApiCall::Search {
                keyword: "memes".to_string(),
                page: 0,
                locale: "pt-BR".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_mode_switch_reshapes_walks() {
        let api = Arc::new(MockStickerApi::new());
        let mut controller = controller(api);

        assert_eq!(controller.keywords_for_run().len(), 20);
        let mut walk = controller.search_walk("memes");
        let mut pages = 0;
        while walk.next_page().is_some() {
            walk.record_page(1);
            pages += 1;
        }
        assert_eq!(pages, 5);

        assert_eq!(controller.record(0, 50), Some(Mode::Efficiency));
        assert_eq!(controller.keywords_for_run(), vec!["memes", "emoji", "funny"]);

        let mut walk = controller.search_walk("memes");
        let mut pages = 0;
        while walk.next_page().is_some() {
            walk.record_page(1);
            pages += 1;
        }
        assert_eq!(pages, 2);

        assert_eq!(controller.record(10, 0), Some(Mode::Discovery));
    }

    #[tokio::test]
    async fn test_efficiency_visits_only_narrowed_keywords() {
        let api = Arc::new(MockStickerApi::new());
        let mut controller = controller(api);
        assert!(controller.visits_keyword("animado"));

        controller.record(0, 50);
        assert!(controller.is_efficient());
        assert!(controller.visits_keyword("memes"));
        assert!(!controller.visits_keyword("animado"));
    }

    #[tokio::test]
    async fn test_efficiency_without_overlap_visits_everything() {
        let api = Arc::new(MockStickerApi::new());
        let config = DiscoveryConfig::default().with_targets(&["pt-BR"], &["gatos", "futebol"]);
        let mut controller = DiscoveryController::new(api, config, Duration::ZERO);

        controller.record(0, 50);
        assert!(controller.is_efficient());
        assert!(controller.visits_keyword("gatos"));
        assert!(controller.visits_keyword("futebol"));
    }

    #[test]
    fn test_category_probability_bounds() {
        let api = Arc::new(MockStickerApi::new());
        let mut config = DiscoveryConfig::default();

        config.category_probability = 0.0;
        let never = DiscoveryController::new(api.clone(), config.clone(), Duration::ZERO);
        assert!((0..50).all(|_| never.pick_category().is_none()));

        config.category_probability = 1.0;
        let always = DiscoveryController::new(api, config, Duration::ZERO);
        for _ in 0..50 {
            let category = always.pick_category().unwrap();
            assert!(always.config().categories.contains(&category));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_efficiency_mode_shortens_delay() {
        let api = Arc::new(MockStickerApi::new());
        let mut controller =
            DiscoveryController::new(api, DiscoveryConfig::default(), Duration::from_secs(2));
        controller.search("memes", 0, "pt-BR").await.unwrap();

        let start = tokio::time::Instant::now();
        controller.search("memes", 1, "pt-BR").await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(2));

        controller.record(0, 50);
        let start = tokio::time::Instant::now();
        controller.search("memes", 2, "pt-BR").await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1400));
        assert!(elapsed < Duration::from_secs(2));
    }
}
