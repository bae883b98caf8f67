//! Health checks, static files, and response headers.

#![allow(clippy::unwrap_used)]

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};

use corner_shop_integration_tests::{TestClient, body_text};

#[tokio::test]
async fn test_liveness() {
    let mut client = TestClient::new();
    let response = client.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let mut client = TestClient::new();
    let response = client.get("/health/ready").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let mut client = TestClient::new();

    let response = client.get("/health").await;
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
    assert!(headers.contains_key("x-request-id"));

    let request = Request::get("/health")
        .header("x-request-id", "upstream-123")
        .body(Body::empty())
        .unwrap();
    let response = client.send(request).await;
    assert_eq!(response.headers()["x-request-id"], "upstream-123");
}

#[tokio::test]
async fn test_static_files_served() {
    let mut client = TestClient::full_app();

    let response = client.get("/static/css/main.css").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key(header::CACHE_CONTROL));

    let response = client.get("/static/images/default.svg").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.get("/static/missing.css").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_ids_and_unknown_paths() {
    let mut client = TestClient::new();

    let response = client.get("/product/not-a-number").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client.get("/no/such/page").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
