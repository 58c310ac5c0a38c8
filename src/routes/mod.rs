// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod auth;
pub mod upload;
pub mod user;

use crate::error::set_expose_internal_errors;
use crate::middleware::{attach_session, require_auth};
use crate::AppState;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::Html;
use axum::{extract::State, middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Whole-request body cap for upload routes (well above the 10 x file and
/// avatar limits enforced per route).
const UPLOAD_BODY_LIMIT: usize = 60 * 1024 * 1024;

/// Uniform success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn message_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

// ─── Service Endpoints ───────────────────────────────────────

#[derive(Serialize)]
struct RootResponse {
    success: bool,
    message: String,
    version: String,
    timestamp: String,
}

/// Service banner.
async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        success: true,
        message: "Fold Backend API is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    success: bool,
    status: String,
    /// Seconds since process start; non-decreasing within one process.
    uptime: f64,
    timestamp: String,
}

/// Health check response.
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        status: "healthy".to_string(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Serialize)]
struct NotFoundResponse {
    success: bool,
    error: String,
    message: String,
}

/// Uniform 404 for unknown routes.
async fn not_found(method: Method, uri: Uri) -> (StatusCode, Json<NotFoundResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            success: false,
            error: "Not Found".to_string(),
            message: format!("Route {} {} not found", method, uri.path()),
        }),
    )
}

async fn openapi_json() -> Json<serde_json::Value> {
    Json(crate::openapi::spec())
}

async fn docs() -> Html<&'static str> {
    Html(crate::openapi::SWAGGER_UI_HTML)
}

async fn test_login() -> Html<&'static str> {
    Html(crate::openapi::TEST_LOGIN_HTML)
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    set_expose_internal_errors(state.config.expose_error_detail());

    // CORS - allow the configured frontend plus localhost dev servers.
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(docs))
        .route("/test-login", get(test_login))
        .nest("/api/auth", auth::routes());

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .nest("/api/user", user::routes())
        .nest(
            "/api/upload",
            upload::routes().layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route_layer(middleware::from_fn(require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            attach_session,
        ))
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
