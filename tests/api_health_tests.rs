// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Health, banner, 404 fallback and CORS tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_health_returns_ok() {
    let (app, _) = common::create_test_app().await;

    let (status, body) = common::request_json(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "healthy");
    assert!(body["uptime"].as_f64().unwrap() >= 0.0);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_health_uptime_non_decreasing() {
    let (app, _) = common::create_test_app().await;

    let (_, first) = common::request_json(&app, "GET", "/health", None, None).await;
    let (_, second) = common::request_json(&app, "GET", "/health", None, None).await;

    let first_uptime = first["uptime"].as_f64().unwrap();
    let second_uptime = second["uptime"].as_f64().unwrap();
    assert!(second_uptime >= first_uptime);
}

#[tokio::test]
async fn test_root_banner() {
    let (app, _) = common::create_test_app().await;

    let (status, body) = common::request_json(&app, "GET", "/", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Fold Backend API is running");
}

#[tokio::test]
async fn test_unknown_route_returns_uniform_404() {
    let (app, _) = common::create_test_app().await;

    let (status, body) =
        common::request_json(&app, "GET", "/api/does-not-exist", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Not Found");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("/api/does-not-exist"));
}

#[tokio::test]
async fn test_openapi_document_served() {
    let (app, _) = common::create_test_app().await;

    let (status, body) = common::request_json(&app, "GET", "/openapi.json", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["openapi"], "3.0.0");
    assert!(body["paths"]["/api/user/me"].is_object());
}

#[tokio::test]
async fn test_docs_page_served() {
    let (app, _) = common::create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/docs")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.starts_with("text/html"));
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _) = common::create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/user/me")
                .header(header::ORIGIN, "http://localhost:3001")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_security_headers_present() {
    let (app, _) = common::create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("X-Content-Type-Options").unwrap(), "nosniff");
    assert_eq!(headers.get("X-Frame-Options").unwrap(), "DENY");
}
