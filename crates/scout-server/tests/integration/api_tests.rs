use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use scout_core::testutil::{MockSearchEngine, ScriptedChatModel, hits};

use crate::common::{
    PanickingSearch, TEST_KEY, body_json, discover_request, empty_search, test_app,
};

const BOARD: &str = "https://boards.greenhouse.io/acme";
const LEVER: &str = "https://jobs.lever.co/widgets";

#[tokio::test]
async fn health_reports_key_pool() {
    let (app, _state) = test_app(ScriptedChatModel::new(), empty_search(), vec![TEST_KEY, "k2"]);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["key_pool"]["total_keys"], 2);
    assert_eq!(json["key_pool"]["failed_keys_count"], 0);
    assert_eq!(json["key_pool"]["cooldown_minutes"], 5);
    assert_eq!(json["key_pool"]["has_available_keys"], true);
}

#[tokio::test]
async fn discover_returns_ranked_jobs() {
    let model = ScriptedChatModel::new()
        .with_queries(&["backend engineer careers"])
        .with_page_jobs(BOARD, &[("Backend Engineer", 0.6), ("SRE", 0.9)])
        .with_page_jobs(LEVER, &[("Platform Engineer", 0.75)]);
    let search = MockSearchEngine::new(vec![Ok(hits(&[
        BOARD,
        "https://www.linkedin.com/jobs/view/1",
        LEVER,
    ]))]);
    let (app, _state) = test_app(model, search, vec![TEST_KEY]);

    let response = app
        .oneshot(discover_request(json!({
            "role": "Backend Engineer",
            "skills": ["Rust"],
            "max_results": 10
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert_eq!(json["count"], 3);
    assert_eq!(json["sources_crawled"], 2);
    assert_eq!(json["search_queries_used"], json!(["backend engineer careers"]));
    assert_eq!(json["errors"], json!([]));

    let titles: Vec<&str> = json["jobs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["SRE", "Platform Engineer", "Backend Engineer"]);
    assert_eq!(json["jobs"][0]["source_url"], BOARD);
    assert_eq!(json["jobs"][0]["apply_url"], BOARD);
}

#[tokio::test]
async fn discover_truncates_to_max_results() {
    let model = ScriptedChatModel::new()
        .with_queries(&["q"])
        .with_page_jobs(BOARD, &[("A", 0.1), ("B", 0.8), ("C", 0.5)]);
    let search = MockSearchEngine::new(vec![Ok(hits(&[BOARD]))]);
    let (app, _state) = test_app(model, search, vec![TEST_KEY]);

    let response = app
        .oneshot(discover_request(json!({"role": "SRE", "max_results": 2})))
        .await
        .unwrap();

    let json = body_json(response).await;
    assert_eq!(json["count"], 2);
    assert_eq!(json["jobs"][0]["title"], "B");
    assert_eq!(json["jobs"][1]["title"], "C");
}

#[tokio::test]
async fn discover_without_pages_reports_error() {
    let (app, _state) = test_app(
        ScriptedChatModel::new().with_queries(&["q"]),
        empty_search(),
        vec![TEST_KEY],
    );

    let response = app
        .oneshot(discover_request(json!({"role": "Data Engineer"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["count"], 0);
    assert_eq!(json["sources_crawled"], 0);
    assert_eq!(
        json["errors"],
        json!(["No career pages found for given criteria"])
    );
}

#[tokio::test]
async fn discover_falls_back_when_model_fails() {
    // No scripted queries: synthesis fails and fallback queries are used.
    let (app, _state) = test_app(ScriptedChatModel::new(), empty_search(), vec![TEST_KEY]);

    let response = app
        .oneshot(discover_request(json!({"role": "Backend Engineer"})))
        .await
        .unwrap();

    let json = body_json(response).await;
    let queries = json["search_queries_used"].as_array().unwrap();
    assert!(queries.contains(&json!("Backend Engineer careers Remote")));
}

#[tokio::test]
async fn out_of_bounds_max_results_returns_400() {
    let (app, _state) = test_app(ScriptedChatModel::new(), empty_search(), vec![TEST_KEY]);

    let response = app
        .oneshot(discover_request(json!({"role": "SRE", "max_results": 21})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn missing_role_is_rejected() {
    let (app, _state) = test_app(ScriptedChatModel::new(), empty_search(), vec![TEST_KEY]);

    let response = app
        .oneshot(discover_request(json!({"location": "Berlin"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn no_keys_returns_503() {
    let (app, _state) = test_app(ScriptedChatModel::new(), empty_search(), vec![]);

    let response = app
        .oneshot(discover_request(json!({"role": "SRE"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["error"], "no_credential");
    assert_eq!(
        json["message"],
        "No API keys available. Please try again later."
    );
}

#[tokio::test]
async fn pipeline_crash_returns_500_and_cools_key() {
    let (app, state) = test_app(
        ScriptedChatModel::new().with_queries(&["q"]),
        PanickingSearch,
        vec![TEST_KEY],
    );

    let response = app
        .clone()
        .oneshot(discover_request(json!({"role": "SRE"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "internal_error");

    assert_eq!(state.keys.status().failed_keys_count, 1);

    let health = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_json(health).await;
    assert_eq!(json["key_pool"]["failed_keys_count"], 1);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (app, _state) = test_app(ScriptedChatModel::new(), empty_search(), vec![TEST_KEY]);

    let response = app
        .oneshot(
            Request::get("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["paths"]["/v1/discover"]["post"].is_object());
}
