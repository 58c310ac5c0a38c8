// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Upload route validation tests.
//!
//! The storage client is offline here, so any test that reaches the
//! provider would fail with a 500; these tests pin down the checks that
//! must run (and reject) before any provider call happens.

use axum::http::StatusCode;

mod common;

const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

#[tokio::test]
async fn test_upload_without_file_field() {
    let (app, _) = common::create_test_app().await;
    let (token, _) = common::sign_up(&app, "up@example.com", "password123", "Up").await;

    // A text-only part under a different field name: no file to upload.
    let body = common::multipart_body(
        BOUNDARY,
        &[("something", "a.txt", "text/plain", b"hello")],
    );

    let (status, json) =
        common::request_multipart(&app, "/api/upload", Some(&token), BOUNDARY, body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("key 'file'"));
}

#[tokio::test]
async fn test_upload_reaches_provider_with_valid_file() {
    let (app, _) = common::create_test_app().await;
    let (token, _) = common::sign_up(&app, "up@example.com", "password123", "Up").await;

    let body = common::multipart_body(
        BOUNDARY,
        &[("file", "note.txt", "text/plain", b"hello world")],
    );

    let (status, json) =
        common::request_multipart(&app, "/api/upload", Some(&token), BOUNDARY, body).await;

    // Validation passed; the offline provider is the failure point.
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("offline"));
}

#[tokio::test]
async fn test_avatar_over_5mb_rejected_before_upload() {
    let (app, _) = common::create_test_app().await;
    let (token, _) = common::sign_up(&app, "up@example.com", "password123", "Up").await;

    let six_mb = vec![0u8; 6 * 1024 * 1024];
    let body = common::multipart_body(
        BOUNDARY,
        &[("avatar", "big.png", "image/png", &six_mb)],
    );

    let (status, json) =
        common::request_multipart(&app, "/api/upload/avatar", Some(&token), BOUNDARY, body)
            .await;

    // 400 from our size check, not a 500 from the offline provider:
    // the request never reached storage.
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Avatar must be less than 5MB");
}

#[tokio::test]
async fn test_avatar_non_image_rejected() {
    let (app, _) = common::create_test_app().await;
    let (token, _) = common::sign_up(&app, "up@example.com", "password123", "Up").await;

    let body = common::multipart_body(
        BOUNDARY,
        &[("avatar", "movie.mp4", "video/mp4", b"fake video bytes")],
    );

    let (status, json) =
        common::request_multipart(&app, "/api/upload/avatar", Some(&token), BOUNDARY, body)
            .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Only image files are allowed for avatars");
}

#[tokio::test]
async fn test_avatar_missing_field() {
    let (app, _) = common::create_test_app().await;
    let (token, _) = common::sign_up(&app, "up@example.com", "password123", "Up").await;

    let body = common::multipart_body(BOUNDARY, &[]);

    let (status, json) =
        common::request_multipart(&app, "/api/upload/avatar", Some(&token), BOUNDARY, body)
            .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("key 'avatar'"));
}

#[tokio::test]
async fn test_multiple_with_eleven_files_rejected_before_upload() {
    let (app, _) = common::create_test_app().await;
    let (token, _) = common::sign_up(&app, "up@example.com", "password123", "Up").await;

    let content = b"file content";
    let parts: Vec<(&str, &str, &str, &[u8])> = (0..11)
        .map(|_| ("files", "f.txt", "text/plain", content.as_slice()))
        .collect();
    let body = common::multipart_body(BOUNDARY, &parts);

    let (status, json) =
        common::request_multipart(&app, "/api/upload/multiple", Some(&token), BOUNDARY, body)
            .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Maximum 10 files allowed per upload");
}

#[tokio::test]
async fn test_multiple_with_no_files_rejected() {
    let (app, _) = common::create_test_app().await;
    let (token, _) = common::sign_up(&app, "up@example.com", "password123", "Up").await;

    let body = common::multipart_body(BOUNDARY, &[]);

    let (status, json) =
        common::request_multipart(&app, "/api/upload/multiple", Some(&token), BOUNDARY, body)
            .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("key 'files'"));
}

#[tokio::test]
async fn test_get_file_with_offline_provider_is_500() {
    let (app, _) = common::create_test_app().await;
    let (token, _) = common::sign_up(&app, "up@example.com", "password123", "Up").await;

    // The 404 mapping for a provider-reported missing file is unit-tested
    // against the error translator; here the offline client yields a 500.
    let (status, json) =
        common::request_json(&app, "GET", "/api/upload/missing-id", Some(&token), None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
}
