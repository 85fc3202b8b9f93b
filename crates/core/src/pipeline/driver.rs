use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{HarvestContext, HarvestStatus, PackProcessor, PackReport, PipelineError, SessionStats};
use crate::codec::Codec;
use crate::config::Config;
use crate::cursor::{CursorMachine, Transition};
use crate::dedup::DuplicateIndex;
use crate::discovery::{DiscoveryController, Pacer};
use crate::metrics;
use crate::pack::Pack;
use crate::store::{CursorStore, PackStore};
use crate::transcoder::Transcoder;
use crate::upload::Uploader;
use crate::upstream::{Endpoint, StickerApi};

/// Top-level harvest loop.
///
/// Owns the [`HarvestContext`] and is its only writer. Packs of one page are
/// processed in small concurrent batches; everything else is sequential.
pub struct PipelineDriver {
    processor: PackProcessor,
    ctx: HarvestContext,
    status: watch::Sender<HarvestStatus>,
}

impl PipelineDriver {
    /// Wires the pipeline and loads the duplicate index and cursor.
    pub async fn build(
        config: &Config,
        api: Arc<dyn StickerApi>,
        codec: Arc<dyn Codec>,
        store: Arc<dyn PackStore>,
        cursor_store: Arc<dyn CursorStore>,
    ) -> Result<Self, PipelineError> {
        info!(store = store.name(), "Building pipeline");

        let mut index = DuplicateIndex::new(Arc::clone(&store), config.dedup.clone());
        let known = index.load().await?;
        metrics::DEDUP_INDEX_SIZE.set(known as i64);

        let cursor = CursorMachine::load(
            cursor_store,
            config.discovery.locales.len(),
            config.discovery.keywords.len(),
        )
        .await?;

        let discovery = DiscoveryController::new(
            Arc::clone(&api),
            config.discovery.clone(),
            Duration::from_millis(config.upstream.request_delay_ms),
        );

        let processor = PackProcessor::new(
            api,
            Transcoder::new(codec, config.transcode.clone()),
            Uploader::new(store),
            config.compliance.clone(),
            config.pipeline.clone(),
            Pacer::new(Duration::from_millis(config.upstream.download_delay_ms)),
        );

        let ctx = HarvestContext::new(index, cursor, discovery);
        let (status, _) = watch::channel(ctx.status());

        Ok(Self {
            processor,
            ctx,
            status,
        })
    }

    pub fn context(&self) -> &HarvestContext {
        &self.ctx
    }

    /// Live status updates, refreshed after every batch.
    pub fn subscribe(&self) -> watch::Receiver<HarvestStatus> {
        self.status.subscribe()
    }

    fn publish(&self) {
        self.status.send_replace(self.ctx.status());
    }

    /// Runs one pack through validation, transcoding and upload.
    pub async fn process_pack(&self, pack: &Pack) -> PackReport {
        self.processor.process(pack).await
    }

    /// Recommended feed for every locale.
    pub async fn run_recommended(&mut self, cancel: &CancellationToken) -> SessionStats {
        self.recommended_pass(cancel).await;
        self.finish("recommended").await
    }

    /// Keyword search for every locale and keyword.
    pub async fn run_keywords(&mut self, cancel: &CancellationToken) -> SessionStats {
        self.keyword_pass(cancel).await;
        self.finish("keywords").await
    }

    /// Recommended feed, then keyword search.
    pub async fn run_full(&mut self, cancel: &CancellationToken) -> SessionStats {
        self.recommended_pass(cancel).await;
        if !cancel.is_cancelled() {
            self.keyword_pass(cancel).await;
        }
        self.finish("full").await
    }

    /// Cursor-driven loop that runs until cancelled.
    ///
    /// Each iteration fetches exactly one search page at the cursor,
    /// processes it and advances the cursor. Restarting resumes at the
    /// persisted position.
    pub async fn run_continuous(&mut self, cancel: &CancellationToken) -> SessionStats {
        let locales = self.ctx.discovery().config().locales.clone();
        let keywords = self.ctx.discovery().config().keywords.clone();
        let cycle_pause = self.processor.config().cycle_pause_secs;
        let error_backoff = self.processor.config().error_backoff_secs;

        let (li, ki, page) = self.ctx.cursor().position();
        info!(
            locales = locales.len(),
            keywords = keywords.len(),
            locale_index = li,
            keyword_index = ki,
            page,
            "Starting continuous harvest"
        );

        while !cancel.is_cancelled() {
            let (li, ki, page) = self.ctx.cursor().position();
            let (Some(locale), Some(keyword)) = (locales.get(li), keywords.get(ki)) else {
                error!(li, ki, "Cursor outside configured targets");
                break;
            };

            if !self.ctx.discovery().visits_keyword(keyword) {
                debug!(keyword = %keyword, "Keyword outside efficiency set, skipped");
                let transition = self.ctx.cursor_mut().advance(false).await;
                self.publish();
                if !self.after_transition(transition, cycle_pause, cancel).await {
                    break;
                }
                continue;
            }

            let fetched = self.ctx.discovery().search(keyword, page, locale).await;
            self.ctx.record_api_call(Endpoint::Search);

            match fetched {
                Ok(packs) => {
                    let found = packs.len();
                    self.process_page(locale, packs, cancel).await;
                    if cancel.is_cancelled() {
                        // Unfinished page; refetched on restart.
                        break;
                    }

                    let discovery = self.ctx.discovery();
                    let limit = discovery.config().page_limit(discovery.is_efficient());
                    let more = found > 0 && page + 1 < limit;

                    let transition = self.ctx.cursor_mut().advance(more).await;
                    self.publish();
                    if !self.after_transition(transition, cycle_pause, cancel).await {
                        break;
                    }
                }
                Err(e) => {
                    error!(
                        locale = %locale,
                        keyword = %keyword,
                        page,
                        error = %e,
                        backoff_secs = error_backoff,
                        "Iteration failed"
                    );
                    if !pause(cancel, error_backoff).await {
                        break;
                    }
                    let transition = self.ctx.cursor_mut().advance(false).await;
                    self.publish();
                    if !self.after_transition(transition, cycle_pause, cancel).await {
                        break;
                    }
                }
            }
        }

        info!("Continuous harvest stopping");
        self.finish("continuous").await
    }

    /// Logs and pauses at a cycle boundary. Returns false once cancelled.
    async fn after_transition(
        &self,
        transition: Transition,
        cycle_pause: u64,
        cancel: &CancellationToken,
    ) -> bool {
        if transition != Transition::CycleCompleted {
            return true;
        }
        self.ctx.stats().log_summary("cycle");
        info!(pause_secs = cycle_pause, "Cycle finished, pausing");
        pause(cancel, cycle_pause).await
    }

    async fn recommended_pass(&mut self, cancel: &CancellationToken) {
        let locales = self.ctx.discovery().config().locales.clone();
        for locale in &locales {
            if cancel.is_cancelled() {
                return;
            }
            if self.ctx.discovery().is_efficient() {
                self.light_feed(locale, cancel).await;
            } else {
                self.walk_recommended(locale, cancel).await;
            }
        }
    }

    async fn keyword_pass(&mut self, cancel: &CancellationToken) {
        let locales = self.ctx.discovery().config().locales.clone();
        for locale in &locales {
            for keyword in self.ctx.discovery().keywords_for_run() {
                if cancel.is_cancelled() {
                    return;
                }
                self.walk_search(locale, &keyword, cancel).await;
            }
        }
    }

    async fn walk_recommended(&mut self, locale: &str, cancel: &CancellationToken) {
        let mut walk = self.ctx.discovery().recommended_walk(locale);
        while let Some(page) = walk.next_page() {
            if cancel.is_cancelled() {
                return;
            }
            let fetched = self.ctx.discovery().recommended(locale, page).await;
            self.ctx.record_api_call(Endpoint::Recommended);
            match fetched {
                Ok(packs) => {
                    let packs = walk.accept(packs);
                    self.process_page(locale, packs, cancel).await;
                }
                Err(e) => {
                    warn!(locale, page, error = %e, "Recommended page failed");
                    walk.record_error();
                }
            }
        }
        debug!(
            locale,
            pages = walk.pages_fetched(),
            stop = ?walk.stop_reason(),
            "Recommended feed finished"
        );
    }

    async fn light_feed(&mut self, locale: &str, cancel: &CancellationToken) {
        let categories = self.ctx.discovery().light_categories().to_vec();
        for category in &categories {
            if cancel.is_cancelled() {
                return;
            }
            let fetched = self
                .ctx
                .discovery()
                .recommended_light(locale, Some(category))
                .await;
            self.ctx.record_api_call(Endpoint::RecommendedLight);
            match fetched {
                Ok(packs) => self.process_page(locale, packs, cancel).await,
                Err(e) => warn!(locale, category = %category, error = %e, "Light feed failed"),
            }
        }
    }

    async fn walk_search(&mut self, locale: &str, keyword: &str, cancel: &CancellationToken) {
        let mut walk = self.ctx.discovery().search_walk(keyword);
        while let Some(page) = walk.next_page() {
            if cancel.is_cancelled() {
                return;
            }
            let fetched = self.ctx.discovery().search(keyword, page, locale).await;
            self.ctx.record_api_call(Endpoint::Search);
            match fetched {
                Ok(packs) => {
                    let packs = walk.accept(packs);
                    self.process_page(locale, packs, cancel).await;
                }
                Err(e) => {
                    warn!(locale, keyword, page, error = %e, "Search page failed");
                    walk.record_error();
                }
            }
        }
        debug!(
            locale,
            keyword,
            pages = walk.pages_fetched(),
            packs = walk.packs_taken(),
            stop = ?walk.stop_reason(),
            "Keyword finished"
        );
    }

    /// Screens a fetched page and processes the new packs in batches.
    async fn process_page(&mut self, locale: &str, packs: Vec<Pack>, cancel: &CancellationToken) {
        let new = self.ctx.screen(locale, packs).await;
        if new.is_empty() {
            self.publish();
            return;
        }

        let batch_size = self
            .processor
            .config()
            .batch_size_for(self.ctx.discovery().is_efficient());

        for batch in new.chunks(batch_size) {
            if cancel.is_cancelled() {
                info!(locale, "Shutdown requested, leaving page unfinished");
                return;
            }

            let reports = join_all(batch.iter().map(|pack| self.processor.process(pack))).await;
            for report in &reports {
                self.ctx.settle(locale, report).await;
            }
            self.publish();
        }
    }

    /// Persists the cursor, logs the summary and returns the stats.
    async fn finish(&mut self, label: &str) -> SessionStats {
        self.ctx.cursor().persist().await;
        self.ctx.stats().log_summary(label);
        self.publish();
        self.ctx.stats().clone()
    }
}

/// Sleeps unless cancelled first. Returns false on cancellation.
async fn pause(cancel: &CancellationToken, secs: u64) -> bool {
    if secs == 0 {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(Duration::from_secs(secs)) => true,
    }
}
