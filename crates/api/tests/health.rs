//! Health endpoint and cross-cutting HTTP behaviour (routing, request ids, CORS).

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, get, new_image_body, post_json, send};

// ---------------------------------------------------------------------------
// Test: GET /health reports store health and capacity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_idle_capacity() {
    let app = common::build_test_app();

    let response = get(&app.router, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["store_healthy"], true);
    assert_eq!(json["generating"], 0);
    assert_eq!(json["max_concurrent"], 5);
}

#[tokio::test]
async fn health_counts_generating_tasks() {
    let app = common::build_test_app();
    for prompt in ["first", "second", "third"] {
        let response = post_json(&app.router, "/api/v1/images", new_image_body(prompt), true).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    app.orchestrator.run_submission_cycle().await;

    let json = body_json(get(&app.router, "/health").await).await;

    assert_eq!(json["generating"], 3);
}

#[tokio::test]
async fn health_needs_no_access_token() {
    let app = common::build_test_app();
    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = send(&app.router, request).await;

    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = common::build_test_app();
    let response = get(&app.router, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = common::build_test_app();
    let response = get(&app.router, "/health").await;

    let request_id = response.headers().get("x-request-id");
    assert!(
        request_id.is_some(),
        "Response must contain an x-request-id header"
    );

    // The value should be a UUID (36 chars with hyphens).
    let id_str = request_id.unwrap().to_str().unwrap();
    assert_eq!(id_str.len(), 36, "x-request-id should be a UUID string");
}

// ---------------------------------------------------------------------------
// Test: CORS preflight allows the access-token header
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cors_preflight_allows_access_token_header() {
    let app = common::build_test_app();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/images")
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "access-token")
        .body(Body::empty())
        .unwrap();
    let response = send(&app.router, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "http://localhost:5173"
    );
    let allowed = headers
        .get("access-control-allow-headers")
        .unwrap()
        .to_str()
        .unwrap()
        .to_lowercase();
    assert!(allowed.contains("access-token"), "got {allowed}");
}
