use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use http_body_util::BodyExt;

use scout_core::error::AppError;
use scout_core::models::SearchHit;
use scout_core::testutil::{MockCleaner, MockFetcher, MockSearchEngine, ScriptedChatModel};
use scout_core::traits::SearchEngine;
use scout_core::{DiscoveryConfig, DiscoveryService, KeyPool};
use scout_server::routes;
use scout_server::state::AppState;

pub const TEST_KEY: &str = "gsk_test_key_0001";

pub type TestState<S> = AppState<MockFetcher, MockCleaner, ScriptedChatModel, S>;

/// Search engine that panics, standing in for an unexpected pipeline crash.
#[derive(Clone)]
pub struct PanickingSearch;

impl SearchEngine for PanickingSearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchHit>, AppError> {
        panic!("search backend crashed");
    }
}

/// Build a router over mock collaborators, returning the state so tests can
/// inspect the key pool afterwards.
pub fn test_app<S: SearchEngine>(
    model: ScriptedChatModel,
    search: S,
    keys: Vec<&str>,
) -> (Router, Arc<TestState<S>>) {
    let config = DiscoveryConfig {
        query_delay: Duration::ZERO,
        ..DiscoveryConfig::default()
    };
    let service = DiscoveryService::with_config(
        MockFetcher::echo_url(),
        MockCleaner::passthrough(),
        model,
        search,
        config,
    );
    let keys = KeyPool::new(
        keys.into_iter().map(String::from).collect(),
        Duration::from_secs(300),
    );

    let state = Arc::new(AppState { service, keys });
    (routes::router(Arc::clone(&state)), state)
}

pub fn empty_search() -> MockSearchEngine {
    MockSearchEngine::new(Vec::new())
}

pub fn discover_request(body: serde_json::Value) -> Request<Body> {
    Request::post("/v1/discover")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}
