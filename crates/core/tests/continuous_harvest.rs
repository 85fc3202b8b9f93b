//! Continuous harvest integration tests.
//!
//! The driver runs in a spawned task with a long cycle pause, so every test
//! waits for the first completed cycle on the status channel and then
//! cancels.

use std::sync::Arc;

use packharvest_core::{
    testing::{fixtures, MockCodec, MockPackStore, MockStickerApi},
    Config, CursorState, HarvestStatus, PipelineDriver, SessionStats,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

fn config(locales: &[&str], keywords: &[&str]) -> Config {
    let mut config = Config::default();
    config.upstream = config.upstream.without_delays();
    config.discovery = config.discovery.with_targets(locales, keywords);
    config.pipeline.cycle_pause_secs = 3600;
    config.pipeline.error_backoff_secs = 0;
    config
}

struct Running {
    status: watch::Receiver<HarvestStatus>,
    cancel: CancellationToken,
    handle: JoinHandle<SessionStats>,
}

impl Running {
    async fn start(config: Config, api: Arc<MockStickerApi>, store: Arc<MockPackStore>) -> Self {
        let mut driver = PipelineDriver::build(
            &config,
            api,
            Arc::new(MockCodec::new()),
            store.clone(),
            store,
        )
        .await
        .expect("Failed to build driver");

        let status = driver.subscribe();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move { driver.run_continuous(&token).await });

        Self {
            status,
            cancel,
            handle,
        }
    }

    /// Waits for the first completed cycle, then stops the driver.
    async fn stop_after_cycle(mut self) -> SessionStats {
        self.status
            .wait_for(|s| s.cursor.cycles_completed >= 1)
            .await
            .expect("Driver dropped its status channel");
        self.cancel.cancel();
        self.handle.await.expect("Driver task panicked")
    }
}

#[tokio::test]
async fn test_resumes_at_persisted_cursor() {
    let api = Arc::new(MockStickerApi::new());
    let store = Arc::new(MockPackStore::new());
    store
        .set_cursor(CursorState {
            locale_index: 1,
            keyword_index: 3,
            page: 2,
            ..Default::default()
        })
        .await;

    let running = Running::start(
        config(&["pt-BR", "en"], &["a", "b", "c", "d"]),
        api.clone(),
        store.clone(),
    )
    .await;
    running.stop_after_cycle().await;

    let searches = api.search_calls().await;
    assert_eq!(searches[0], ("d".to_string(), 2, "en".to_string()));
    assert_eq!(searches.len(), 1);

    let saved = store.saved_cursor().await.unwrap();
    assert_eq!(saved.locale_index, 0);
    assert_eq!(saved.keyword_index, 0);
    assert_eq!(saved.page, 0);
    assert_eq!(saved.cycles_completed, 1);
    assert!(saved.last_cycle_at.is_some());
}

#[tokio::test]
async fn test_out_of_range_cursor_restarts_from_origin() {
    let api = Arc::new(MockStickerApi::new());
    let store = Arc::new(MockPackStore::new());
    store
        .set_cursor(CursorState {
            locale_index: 4,
            keyword_index: 9,
            page: 1,
            ..Default::default()
        })
        .await;

    let running = Running::start(config(&["pt-BR"], &["memes"]), api.clone(), store).await;
    running.stop_after_cycle().await;

    let searches = api.search_calls().await;
    assert_eq!(searches[0], ("memes".to_string(), 0, "pt-BR".to_string()));
}

#[tokio::test]
async fn test_pages_advance_until_empty() {
    let api = Arc::new(MockStickerApi::new());
    let store = Arc::new(MockPackStore::new());
    api.set_search_page("memes", 0, vec![
        fixtures::pack("A", 3),
        fixtures::pack("B", 3),
        fixtures::pack("C", 3),
    ])
    .await;
    api.set_search_page("memes", 1, vec![fixtures::pack("D", 3), fixtures::pack("E", 3)])
        .await;

    let running = Running::start(config(&["pt-BR"], &["memes"]), api.clone(), store.clone()).await;
    let stats = running.stop_after_cycle().await;

    let pages: Vec<u32> = api.search_calls().await.iter().map(|(_, p, _)| *p).collect();
    assert_eq!(pages, vec![0, 1, 2]);
    assert_eq!(stats.processed, 5);
    assert_eq!(store.pack_identifiers().await.len(), 5);

    let saved = store.saved_cursor().await.unwrap();
    assert_eq!(saved.last_processed_pack_id.as_deref(), Some("E"));
}

#[tokio::test]
async fn test_failed_fetch_skips_keyword() {
    let api = Arc::new(MockStickerApi::new());
    let store = Arc::new(MockPackStore::new());
    api.fail_searches(1).await;
    api.set_search_page("a", 0, vec![fixtures::pack("A", 3)]).await;

    let running = Running::start(config(&["pt-BR"], &["a", "b"]), api.clone(), store.clone()).await;
    let stats = running.stop_after_cycle().await;

    let searches: Vec<(String, u32)> = api
        .search_calls()
        .await
        .into_iter()
        .map(|(k, p, _)| (k, p))
        .collect();
    assert_eq!(searches, vec![("a".to_string(), 0), ("b".to_string(), 0)]);
    assert_eq!(stats.processed, 0);
    assert!(store.pack_record("A").await.is_none());
}

#[tokio::test]
async fn test_cursor_write_failures_do_not_stop_harvest() {
    let api = Arc::new(MockStickerApi::new());
    let store = Arc::new(MockPackStore::new());
    store.fail_cursor_writes(true).await;
    api.set_search_page("memes", 0, vec![fixtures::pack("A", 3)]).await;

    let running = Running::start(config(&["pt-BR"], &["memes"]), api, store.clone()).await;
    let stats = running.stop_after_cycle().await;

    assert_eq!(stats.processed, 1);
    assert_eq!(store.cursor_saves().await, 0);
    assert!(store.pack_record("A").await.is_some());
}

#[tokio::test]
async fn test_efficiency_mode_skips_low_yield_keywords() {
    let api = Arc::new(MockStickerApi::new());
    let store = Arc::new(MockPackStore::new());
    let seeded = ["s1", "s2", "s3", "s4"];
    for id in seeded {
        store.seed_pack(id).await;
    }
    api.set_search_page(
        "memes",
        0,
        seeded.iter().map(|id| fixtures::pack(id, 3)).collect(),
    )
    .await;

    let mut config = config(&["pt-BR"], &["memes", "zzz", "amor"]);
    config.discovery.strategy.enter_consecutive_duplicates = 3;
    config.discovery.strategy.min_ratio_samples = 1_000;

    let running = Running::start(config, api.clone(), store.clone()).await;
    running.stop_after_cycle().await;

    // Four duplicates switch modes on the first page; "zzz" is never searched.
    let searches: Vec<(String, u32)> = api
        .search_calls()
        .await
        .into_iter()
        .map(|(k, p, _)| (k, p))
        .collect();
    assert_eq!(
        searches,
        vec![
            ("memes".to_string(), 0),
            ("memes".to_string(), 1),
            ("amor".to_string(), 0),
        ]
    );

    let saved = store.saved_cursor().await.unwrap();
    assert_eq!(saved.cycles_completed, 1);
}
