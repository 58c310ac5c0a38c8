// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use fold_backend::config::Config;
use fold_backend::db::Db;
use fold_backend::routes::create_router;
use fold_backend::services::{AppwriteStorage, AuthService, GoogleOAuth, GoogleOidcVerifier};
use fold_backend::AppState;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceExt;

/// Create a test app on an in-memory database with an offline storage
/// client. Returns the router and the shared state.
#[allow(dead_code)]
pub async fn create_test_app() -> (Router, Arc<AppState>) {
    let config = Config::test_default();

    let db = Db::connect_in_memory()
        .await
        .expect("Failed to create in-memory database");
    let auth = AuthService::new(db.clone());
    let storage = AppwriteStorage::new_offline(&config);
    let google = GoogleOAuth::new(&config);
    let oidc = GoogleOidcVerifier::new(&config).expect("Failed to build OIDC verifier");

    let state = Arc::new(AppState {
        config,
        db,
        auth,
        storage,
        google,
        oidc,
        started_at: Instant::now(),
    });

    (create_router(state.clone()), state)
}

/// Issue a JSON request and return status + parsed body.
#[allow(dead_code)]
pub async fn request_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, json)
}

/// Sign up a user and return their bearer token and public profile.
#[allow(dead_code)]
pub async fn sign_up(
    app: &Router,
    email: &str,
    password: &str,
    name: &str,
) -> (String, serde_json::Value) {
    let (status, body) = request_json(
        app,
        "POST",
        "/api/auth/sign-up/email",
        None,
        Some(serde_json::json!({
            "email": email,
            "password": password,
            "name": name,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "sign-up failed: {}", body);

    let token = body["data"]["token"].as_str().unwrap().to_string();
    let user = body["data"]["user"].clone();
    (token, user)
}

/// Build a multipart/form-data body from (field, filename, content_type,
/// bytes) tuples.
#[allow(dead_code)]
pub fn multipart_body(
    boundary: &str,
    parts: &[(&str, &str, &str, &[u8])],
) -> Vec<u8> {
    let mut body = Vec::new();

    for (field, filename, content_type, bytes) in parts {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}

/// Issue a multipart request and return status + parsed body.
#[allow(dead_code)]
pub async fn request_multipart(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    boundary: &str,
    body: Vec<u8>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        );

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap();
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);

    (status, json)
}
