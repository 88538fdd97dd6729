use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, history, jobs};
use super::middleware::{auth_middleware, metrics_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/status", get(handlers::get_status))
        .route("/metrics", get(handlers::get_metrics))
        // On-demand job triggers
        .route("/jobs/search", post(jobs::trigger_search))
        .route("/jobs/rss", post(jobs::trigger_rss))
        .route("/scheduler/reset-budget", post(jobs::reset_budget))
        // History
        .route("/history/injections", get(history::list_injections))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use reseed_core::config::MatchConfig;
    use reseed_core::injector::Injector;
    use reseed_core::notify::Notifier;
    use reseed_core::scheduler::SchedulerConfig;
    use reseed_core::testing::{MockHistory, MockIndexerClient, MockTorrentClient};
    use reseed_core::{
        create_authenticator, load_config_from_str, Authenticator, HistoryStore, IndexerClient,
        IndexerPool, Scheduler, SearcheeSource, TorrentClient,
    };

    fn test_config(auth_section: &str) -> reseed_core::Config {
        let toml = format!(
            r#"
{}

[sources]
data_dirs = ["/tmp/reseed-test-data"]

[indexers]
urls = ["http://indexer/api?apikey=x"]
"#,
            auth_section
        );
        load_config_from_str(&toml).unwrap()
    }

    async fn test_state(auth_section: &str) -> Arc<AppState> {
        let temp = TempDir::new().unwrap();
        let data_dir = temp.path().join("data");
        tokio::fs::create_dir_all(&data_dir).await.unwrap();
        // Leak the temp dir so the data dir outlives state construction
        std::mem::forget(temp);

        let mut config = test_config(auth_section);
        config.sources.data_dirs = vec![data_dir];

        let authenticator: Arc<dyn Authenticator> =
            Arc::from(create_authenticator(&config.auth).unwrap());

        let history: Arc<dyn HistoryStore> = Arc::new(MockHistory::new());
        let source = SearcheeSource::new(config.sources.clone(), Arc::clone(&history));
        let pool = IndexerPool::new(
            vec![Arc::new(MockIndexerClient::new("mock")) as Arc<dyn IndexerClient>],
            Duration::from_millis(1),
            None,
        );
        let injector = Injector::new(
            config.action.clone(),
            Some(Arc::new(MockTorrentClient::new()) as Arc<dyn TorrentClient>),
            Arc::clone(&history),
            Notifier::disabled(),
        );
        let scheduler = Arc::new(Scheduler::new(
            SchedulerConfig::default(),
            source,
            pool,
            injector,
            Arc::clone(&history),
            MatchConfig::default(),
        ));

        let registry = prometheus::Registry::new();
        reseed_core::metrics::register_core_metrics(&registry);
        crate::metrics::register_server_metrics(&registry);

        Arc::new(AppState::new(
            config,
            authenticator,
            scheduler,
            history,
            registry,
        ))
    }

    #[tokio::test]
    async fn test_health_without_auth() {
        let state = test_state("[auth]\nmethod = \"none\"").await;
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_api_key_gates_requests() {
        let state = test_state("[auth]\nmethod = \"api_key\"\napi_key = \"secret\"").await;
        let app = create_router(state);

        let denied = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let allowed = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/status")
                    .header(header::AUTHORIZATION, "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_trigger_search_endpoint() {
        let state = test_state("[auth]\nmethod = \"none\"").await;
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/jobs/search")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["task"], "search");
    }

    #[tokio::test]
    async fn test_config_endpoint_is_sanitized() {
        let state = test_state("[auth]\nmethod = \"api_key\"\napi_key = \"super-secret\"").await;
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/config")
                    .header("X-API-Key", "super-secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("super-secret"));
        assert!(!text.contains("apikey=x"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let state = test_state("[auth]\nmethod = \"none\"").await;
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_history_endpoint() {
        let state = test_state("[auth]\nmethod = \"none\"").await;
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/history/injections?limit=10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["injections"].as_array().unwrap().is_empty());
    }
}
