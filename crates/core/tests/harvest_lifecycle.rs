//! Harvest lifecycle integration tests.
//!
//! These tests run the whole pipeline against mock upstream, codec and store:
//! - Duplicate filtering before any download
//! - Idempotent re-runs
//! - Compliance and byte-budget enforcement
//! - Resumable uploads after a partial commit
//! - Discovery/efficiency mode switching

use std::sync::Arc;

use packharvest_core::{
    store::asset_path,
    testing::{fixtures, ApiCall, MockCodec, MockPackStore, MockStickerApi, StoreOp},
    Config, Mode, PipelineDriver,
};
use tokio_util::sync::CancellationToken;

/// Test helper owning the mocks and a zero-delay configuration.
struct TestHarness {
    api: Arc<MockStickerApi>,
    codec: Arc<MockCodec>,
    store: Arc<MockPackStore>,
    config: Config,
}

impl TestHarness {
    fn new(locales: &[&str], keywords: &[&str]) -> Self {
        let mut config = Config::default();
        config.upstream = config.upstream.without_delays();
        config.pipeline = config.pipeline.without_pauses();
        config.discovery = config.discovery.with_targets(locales, keywords);

        Self {
            api: Arc::new(MockStickerApi::new()),
            codec: Arc::new(MockCodec::new()),
            store: Arc::new(MockPackStore::new()),
            config,
        }
    }

    async fn driver(&self) -> PipelineDriver {
        PipelineDriver::build(
            &self.config,
            self.api.clone(),
            self.codec.clone(),
            self.store.clone(),
            self.store.clone(),
        )
        .await
        .expect("Failed to build driver")
    }
}

fn packs(ids: &[&str], assets: usize) -> Vec<packharvest_core::Pack> {
    ids.iter().map(|id| fixtures::pack(id, assets)).collect()
}

fn urls_for(urls: &[String], identifier: &str) -> usize {
    let prefix = format!("https://cdn.test/{}/", identifier);
    urls.iter().filter(|u| u.starts_with(&prefix)).count()
}

#[tokio::test]
async fn test_known_packs_never_downloaded() {
    let harness = TestHarness::new(&["pt-BR"], &["memes"]);
    harness.store.seed_pack("B").await;
    harness.store.seed_pack("D").await;
    harness
        .api
        .set_search_page("memes", 0, packs(&["A", "B", "C", "D", "E"], 3))
        .await;

    let mut driver = harness.driver().await;
    let stats = driver.run_keywords(&CancellationToken::new()).await;

    let urls = harness.api.downloaded_urls().await;
    assert_eq!(urls.len(), 9);
    for id in ["A", "C", "E"] {
        assert_eq!(urls_for(&urls, id), 3, "pack {} downloads", id);
        assert!(harness.store.pack_record(id).await.is_some());
    }
    assert_eq!(urls_for(&urls, "B"), 0);
    assert_eq!(urls_for(&urls, "D"), 0);

    assert_eq!(stats.packs_found, 5);
    assert_eq!(stats.duplicates_skipped, 2);
    assert_eq!(stats.processed, 3);
    assert_eq!(stats.stickers_processed, 9);
    assert_eq!(stats.api_calls.get("download"), Some(&9));
    assert_eq!(harness.store.sticker_records().await.len(), 9);
    assert_eq!(driver.context().index().committed_count(), 5);
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let harness = TestHarness::new(&["pt-BR"], &["memes"]);
    harness
        .api
        .set_search_page("memes", 0, packs(&["A", "B", "C"], 4))
        .await;

    let mut first = harness.driver().await;
    let stats = first.run_keywords(&CancellationToken::new()).await;
    assert_eq!(stats.processed, 3);

    let uploads = harness.store.uploaded_paths().await.len();
    let records = harness.store.sticker_records().await.len();
    let downloads = harness.api.downloaded_urls().await.len();
    assert_eq!(uploads, 3 * 5);

    let mut second = harness.driver().await;
    let stats = second.run_keywords(&CancellationToken::new()).await;

    assert_eq!(stats.processed, 0);
    assert_eq!(stats.duplicates_skipped, 3);
    assert_eq!(harness.store.uploaded_paths().await.len(), uploads);
    assert_eq!(harness.store.sticker_records().await.len(), records);
    assert_eq!(harness.api.downloaded_urls().await.len(), downloads);
    assert_eq!(harness.store.pack_identifiers().await.len(), 3);
}

#[tokio::test]
async fn test_compliance_bounds_enforced_before_download() {
    let harness = TestHarness::new(&["pt-BR"], &["memes"]);
    harness
        .api
        .set_search_page(
            "memes",
            0,
            vec![
                fixtures::pack("two", 2),
                fixtures::pack("three", 3),
                fixtures::pack("thirty", 30),
                fixtures::pack("thirty-one", 31),
            ],
        )
        .await;

    let mut driver = harness.driver().await;
    let stats = driver.run_keywords(&CancellationToken::new()).await;

    let urls = harness.api.downloaded_urls().await;
    assert_eq!(urls_for(&urls, "two"), 0);
    assert_eq!(urls_for(&urls, "thirty-one"), 0);
    assert_eq!(urls_for(&urls, "three"), 3);
    assert_eq!(urls_for(&urls, "thirty"), 30);

    assert_eq!(stats.rejected, 2);
    assert_eq!(stats.processed, 2);
    assert!(harness.store.pack_record("two").await.is_none());
    assert!(harness.store.pack_record("thirty-one").await.is_none());

    let thirty = harness.store.pack_record("thirty").await.unwrap();
    assert_eq!(thirty.sticker_count, 30);
}

#[tokio::test]
async fn test_rejected_packs_are_not_remembered() {
    let harness = TestHarness::new(&["pt-BR"], &["memes"]);
    let mut nameless = fixtures::pack("nameless", 3);
    nameless.name = "  ".to_string();
    harness.api.set_search_page("memes", 0, vec![nameless]).await;

    let mut driver = harness.driver().await;
    let stats = driver.run_keywords(&CancellationToken::new()).await;

    assert_eq!(stats.rejected, 1);
    assert!(!driver.context().index().is_committed("nameless"));
}

#[tokio::test]
async fn test_too_few_valid_assets_skips_pack() {
    let harness = TestHarness::new(&["pt-BR"], &["memes"]);
    harness
        .api
        .set_search_page("memes", 0, vec![fixtures::pack("A", 4)])
        .await;
    harness.api.fail_download("https://cdn.test/A/1.webp").await;
    harness
        .api
        .set_download("https://cdn.test/A/2.webp", fixtures::webp_bytes(50))
        .await;

    let mut driver = harness.driver().await;
    let stats = driver.run_keywords(&CancellationToken::new()).await;

    // Two valid assets of four is below the minimum.
    assert_eq!(stats.processed, 0);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.stickers_processed, 2);
    assert_eq!(stats.stickers_failed, 2);
    assert!(harness.store.pack_record("A").await.is_none());
    assert!(harness.store.uploaded_paths().await.is_empty());
}

#[tokio::test]
async fn test_colliding_output_names_count_as_failed() {
    let harness = TestHarness::new(&["pt-BR"], &["memes"]);
    let mut pack = fixtures::pack("P", 0);
    pack.resource_files = vec!["a.png".into(), "a.webp".into(), "b.webp".into()];
    harness.api.set_search_page("memes", 0, vec![pack]).await;
    harness
        .api
        .set_download("https://cdn.test/P/a.png", fixtures::png_bytes(2_000))
        .await;

    let mut driver = harness.driver().await;
    let stats = driver.run_keywords(&CancellationToken::new()).await;

    // a.png and a.webp both become a.webp, leaving two distinct stickers.
    assert_eq!(stats.processed, 0);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.stickers_processed, 2);
    assert_eq!(stats.stickers_failed, 1);
    assert!(!harness
        .api
        .downloaded_urls()
        .await
        .contains(&"https://cdn.test/P/a.webp".to_string()));
    assert!(harness.store.pack_record("P").await.is_none());
    assert!(harness.store.uploaded_paths().await.is_empty());
    assert!(harness.store.sticker_records().await.is_empty());
}

#[tokio::test]
async fn test_failed_asset_frees_its_output_name() {
    let harness = TestHarness::new(&["pt-BR"], &["memes"]);
    let mut pack = fixtures::pack("P", 0);
    pack.resource_files = vec![
        "a.png".into(),
        "a.webp".into(),
        "b.webp".into(),
        "c.webp".into(),
    ];
    harness.api.set_search_page("memes", 0, vec![pack]).await;
    harness.api.fail_download("https://cdn.test/P/a.png").await;

    let mut driver = harness.driver().await;
    let stats = driver.run_keywords(&CancellationToken::new()).await;

    assert_eq!(stats.processed, 1);
    let record = harness.store.pack_record("P").await.unwrap();
    assert_eq!(record.sticker_count, 3);
    let mut names: Vec<String> = harness
        .store
        .sticker_records()
        .await
        .into_iter()
        .map(|r| r.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["a.webp", "b.webp", "c.webp"]);
}

#[tokio::test]
async fn test_one_failed_asset_still_commits() {
    let harness = TestHarness::new(&["pt-BR"], &["memes"]);
    harness
        .api
        .set_search_page("memes", 0, vec![fixtures::pack("A", 4)])
        .await;
    harness.api.fail_download("https://cdn.test/A/3.webp").await;

    let mut driver = harness.driver().await;
    let stats = driver.run_keywords(&CancellationToken::new()).await;

    assert_eq!(stats.processed, 1);
    assert_eq!(stats.stickers_failed, 1);
    let record = harness.store.pack_record("A").await.unwrap();
    assert_eq!(record.sticker_count, 3);
    assert_eq!(harness.store.sticker_records().await.len(), 3);
}

#[tokio::test]
async fn test_over_budget_stickers_never_uploaded() {
    let harness = TestHarness::new(&["pt-BR"], &["memes"]);
    harness
        .api
        .set_search_page("memes", 0, vec![fixtures::pack("A", 3)])
        .await;
    harness.codec.set_encode_size(80, 150_000).await;
    harness.codec.set_encode_size(60, 120_000).await;

    let mut driver = harness.driver().await;
    let stats = driver.run_keywords(&CancellationToken::new()).await;

    assert_eq!(stats.processed, 0);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.stickers_failed, 3);
    assert!(harness.store.uploaded_paths().await.is_empty());
    assert!(harness.store.pack_record("A").await.is_none());
    assert_eq!(harness.codec.encode_qualities().await, vec![80, 60, 80, 60, 80, 60]);
}

#[tokio::test]
async fn test_recompressed_stickers_fit_budget() {
    let harness = TestHarness::new(&["pt-BR"], &["memes"]);
    harness
        .api
        .set_search_page("memes", 0, vec![fixtures::pack("A", 3)])
        .await;
    harness.codec.set_encode_size(80, 150_000).await;

    let mut driver = harness.driver().await;
    let stats = driver.run_keywords(&CancellationToken::new()).await;

    assert_eq!(stats.processed, 1);
    let budget = harness.config.transcode.max_static_bytes;
    assert!(harness
        .store
        .sticker_records()
        .await
        .iter()
        .all(|r| r.size_bytes <= budget));
}

#[tokio::test]
async fn test_partial_upload_resumes_without_rewrites() {
    let harness = TestHarness::new(&["pt-BR"], &["memes"]);
    harness
        .api
        .set_search_page("memes", 0, vec![fixtures::pack("A", 3)])
        .await;
    harness.store.fail_on(StoreOp::CreatePackRecord).await;

    let mut first = harness.driver().await;
    let stats = first.run_keywords(&CancellationToken::new()).await;

    assert_eq!(stats.failed, 1);
    assert!(harness.store.pack_record("A").await.is_none());
    let written = harness.store.uploaded_paths().await;
    assert_eq!(written.len(), 4);
    assert_eq!(written[0], asset_path("A", "tray.png"));
    assert!(!first.context().index().is_committed("A"));

    harness.store.clear_failures().await;
    let mut second = harness.driver().await;
    let stats = second.run_keywords(&CancellationToken::new()).await;

    assert_eq!(stats.processed, 1);
    assert_eq!(harness.store.uploaded_paths().await, written);
    assert!(harness.store.pack_record("A").await.is_some());
    assert_eq!(harness.store.sticker_records().await.len(), 3);
}

#[tokio::test]
async fn test_duplicates_switch_to_efficiency_and_back() {
    let mut harness = TestHarness::new(&["pt-BR"], &["memes", "zzz"]);
    harness.config.discovery.strategy.enter_consecutive_duplicates = 5;
    harness.config.discovery.strategy.min_ratio_samples = 1_000;

    let seeded = ["s1", "s2", "s3", "s4", "s5", "s6"];
    for id in seeded {
        harness.store.seed_pack(id).await;
    }
    harness
        .api
        .set_recommended_page(0, packs(&seeded, 3))
        .await;

    let mut driver = harness.driver().await;
    let stats = driver.run_full(&CancellationToken::new()).await;

    assert_eq!(driver.context().discovery().mode(), Mode::Efficiency);
    assert_eq!(stats.mode_switches, 1);

    // Efficiency narrows keywords to high-yield terms and shortens the walk.
    let searches: Vec<(String, u32)> = harness
        .api
        .search_calls()
        .await
        .into_iter()
        .map(|(keyword, page, _)| (keyword, page))
        .collect();
    assert_eq!(
        searches,
        vec![("memes".to_string(), 0), ("memes".to_string(), 1)]
    );

    // A burst of new packs on the light feed switches back.
    let fresh: Vec<String> = (0..12).map(|i| format!("fresh{}", i)).collect();
    let fresh: Vec<&str> = fresh.iter().map(String::as_str).collect();
    harness
        .api
        .set_light_feed(Some("amor"), packs(&fresh, 1))
        .await;

    let stats = driver.run_recommended(&CancellationToken::new()).await;

    assert_eq!(driver.context().discovery().mode(), Mode::Discovery);
    assert_eq!(stats.mode_switches, 2);
    assert!(harness
        .api
        .calls()
        .await
        .iter()
        .any(|c| matches!(c, ApiCall::RecommendedLight { .. })));
}

#[tokio::test]
async fn test_cancelled_run_makes_no_calls() {
    let harness = TestHarness::new(&["pt-BR"], &["memes"]);
    harness
        .api
        .set_search_page("memes", 0, packs(&["A"], 3))
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut driver = harness.driver().await;
    let stats = driver.run_full(&cancel).await;

    assert!(harness.api.calls().await.is_empty());
    assert_eq!(stats.packs_found, 0);
}
