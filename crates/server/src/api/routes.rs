use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, middleware::metrics_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/status", get(handlers::get_status))
        .route("/stats", get(handlers::get_stats));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use packharvest_core::{
        testing::{fixtures, MockCodec, MockPackStore, MockStickerApi},
        Config, PipelineDriver,
    };
    use serde_json::Value;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.upstream = config.upstream.without_delays();
        config.pipeline = config.pipeline.without_pauses();
        config.discovery = config.discovery.with_targets(&["pt-BR"], &["memes", "amor"]);
        config
    }

    async fn driver(config: &Config, api: Arc<MockStickerApi>) -> PipelineDriver {
        let store = Arc::new(MockPackStore::new());
        PipelineDriver::build(
            config,
            api,
            Arc::new(MockCodec::new()),
            store.clone(),
            store,
        )
        .await
        .unwrap()
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health() {
        let config = test_config();
        let driver = driver(&config, Arc::new(MockStickerApi::new())).await;
        let router = create_router(Arc::new(AppState::new(config, driver.subscribe())));

        let (status, body) = get_json(router, "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_status_reflects_harvest_progress() {
        let config = test_config();
        let api = Arc::new(MockStickerApi::new());
        api.set_search_page("memes", 0, vec![fixtures::pack("A", 3)])
            .await;

        let mut driver = driver(&config, api).await;
        let state = Arc::new(AppState::new(config, driver.subscribe()));
        driver.run_keywords(&CancellationToken::new()).await;

        let (status, body) = get_json(create_router(state.clone()), "/api/v1/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stats"]["processed"], 1);
        assert_eq!(body["stats"]["packs_found"], 1);
        assert_eq!(body["strategy"]["mode"], "discovery");
        assert_eq!(body["known_packs"], 1);
        assert_eq!(body["cursor"]["last_processed_pack_id"], "A");

        let (_, stats) = get_json(create_router(state), "/api/v1/stats").await;
        assert_eq!(stats["processed"], 1);
    }

    #[tokio::test]
    async fn test_config_hides_service_key() {
        let mut config = test_config();
        config.store.supabase = Some(packharvest_core::store::SupabaseConfig {
            url: "https://xyz.supabase.co".to_string(),
            service_key: "very-secret".to_string(),
            bucket: "stickers".to_string(),
            timeout_secs: 30,
        });
        let driver = driver(&config, Arc::new(MockStickerApi::new())).await;
        let router = create_router(Arc::new(AppState::new(config, driver.subscribe())));

        let (status, body) = get_json(router, "/api/v1/config").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["store"]["supabase"]["service_key_configured"], true);
        assert!(!body.to_string().contains("very-secret"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let config = test_config();
        let driver = driver(&config, Arc::new(MockStickerApi::new())).await;
        let router = create_router(Arc::new(AppState::new(config, driver.subscribe())));

        let response = router
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("packharvest_cycle_progress_percent"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let config = test_config();
        let driver = driver(&config, Arc::new(MockStickerApi::new())).await;
        let router = create_router(Arc::new(AppState::new(config, driver.subscribe())));

        let (status, _) = get_json(router, "/api/v1/packs").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
