// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication routes: email/password, sessions and Google OAuth.
//!
//! These are public routes; the session middleware has already attached an
//! [`AuthContext`] when a valid token is present.

use crate::error::{AppError, Result};
use crate::middleware::AuthContext;
use crate::models::{SessionInfo, UserPublic};
use crate::routes::ApiResponse;
use crate::services::auth::{ClientMeta, OAuthTokens, SESSION_COOKIE};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sign-up/email", post(sign_up_email))
        .route("/sign-in/email", post(sign_in_email))
        .route("/sign-in/social", post(sign_in_social))
        .route("/callback/google", get(google_callback))
        .route("/sign-out", post(sign_out))
        .route("/session", get(get_session))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

// ─── Helpers ─────────────────────────────────────────────────

/// Client metadata recorded on the session row.
fn client_meta(headers: &HeaderMap) -> ClientMeta {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string());

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    ClientMeta {
        ip_address,
        user_agent,
    }
}

/// Rate-limit key scoped per route and client address.
fn rate_limit_key(route: &str, meta: &ClientMeta) -> String {
    format!(
        "{}:{}",
        route,
        meta.ip_address.as_deref().unwrap_or("unknown")
    )
}

/// Session cookie: HttpOnly, SameSite=Lax, whole-site path.
fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

/// Reconstruct this API's external base URL from the Host header.
fn external_base_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost:3000");

    let scheme = if host.contains("localhost") || host.contains("127.0.0.1") {
        "http"
    } else {
        "https"
    };

    format!("{}://{}", scheme, host)
}

#[derive(Debug, Serialize)]
struct AuthPayload {
    user: UserPublic,
    /// Bearer token for non-browser clients; browsers rely on the cookie.
    token: String,
}

// ─── Email / Password ────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// POST /api/auth/sign-up/email
async fn sign_up_email(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(body): Json<SignUpRequest>,
) -> Result<impl IntoResponse> {
    body.validate()?;

    let meta = client_meta(&headers);
    state
        .auth
        .check_rate_limit(&rate_limit_key("sign-up", &meta))
        .await?;

    let (user, session) = state
        .auth
        .sign_up_email(&body.email, &body.password, &body.name, meta)
        .await?;

    let jar = jar.add(session_cookie(&session.token));
    Ok((
        jar,
        Json(ApiResponse::data(AuthPayload {
            user: UserPublic::from(user),
            token: session.token,
        })),
    ))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// POST /api/auth/sign-in/email
async fn sign_in_email(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(body): Json<SignInRequest>,
) -> Result<impl IntoResponse> {
    body.validate()?;

    let meta = client_meta(&headers);
    state
        .auth
        .check_rate_limit(&rate_limit_key("sign-in", &meta))
        .await?;

    let (user, session) = state
        .auth
        .sign_in_email(&body.email, &body.password, meta)
        .await?;

    let jar = jar.add(session_cookie(&session.token));
    Ok((
        jar,
        Json(ApiResponse::data(AuthPayload {
            user: UserPublic::from(user),
            token: session.token,
        })),
    ))
}

/// POST /api/auth/sign-out
async fn sign_out(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Extension(context): Extension<AuthContext>,
) -> Result<impl IntoResponse> {
    if let Some(session) = context.session {
        state.auth.sign_out(&session.token).await?;
    }

    let jar = jar.remove(removal_cookie());
    Ok((jar, Json(ApiResponse::message("Signed out"))))
}

#[derive(Debug, Serialize)]
struct SessionPayload {
    user: Option<UserPublic>,
    session: Option<SessionInfo>,
}

/// GET /api/auth/session - current session state, nulls when anonymous.
async fn get_session(
    Extension(context): Extension<AuthContext>,
) -> Json<ApiResponse<SessionPayload>> {
    let session = context.session.as_ref().map(|s| {
        let token = s.token.clone();
        SessionInfo::from_session(s.clone(), &token)
    });

    Json(ApiResponse::data(SessionPayload {
        user: context.user.map(UserPublic::from),
        session,
    }))
}

// ─── Google OAuth ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialSignInRequest {
    pub provider: String,
    #[serde(default, rename = "callbackURL")]
    pub callback_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct SocialSignInPayload {
    url: String,
    redirect: bool,
}

/// POST /api/auth/sign-in/social - returns the provider authorization URL.
async fn sign_in_social(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SocialSignInRequest>,
) -> Result<Json<ApiResponse<SocialSignInPayload>>> {
    if body.provider != "google" {
        return Err(AppError::BadRequest(format!(
            "Unsupported provider: {}",
            body.provider
        )));
    }

    let callback_url = body
        .callback_url
        .unwrap_or_else(|| state.config.frontend_url.clone());
    let redirect_uri = format!("{}/api/auth/callback/google", external_base_url(&headers));

    let url = state.google.authorization_url(&redirect_uri, &callback_url)?;

    tracing::info!(callback_url = %callback_url, "Starting Google OAuth flow");

    Ok(Json(ApiResponse::data(SocialSignInPayload {
        url,
        redirect: true,
    })))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    state: String,
    #[serde(default)]
    error: Option<String>,
}

/// GET /api/auth/callback/google - exchange the code, open a session and
/// redirect back to the frontend.
async fn google_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse> {
    // Recover the frontend URL from the signed state parameter.
    let callback_url = state.google.verify_state(&params.state).unwrap_or_else(|| {
        tracing::warn!("Invalid or tampered state parameter, falling back to frontend URL");
        state.config.frontend_url.clone()
    });

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        let redirect = format!("{}?error={}", callback_url, urlencoding::encode(&error));
        return Ok((jar, Redirect::temporary(&redirect)));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let redirect_uri = format!("{}/api/auth/callback/google", external_base_url(&headers));

    let tokens = state.google.exchange_code(&code, &redirect_uri).await?;
    let profile = state.oidc.verify_id_token(&tokens.id_token).await?;

    tracing::info!(sub = %profile.sub, "Google OAuth successful");

    let expires_at = tokens
        .expires_in
        .map(|secs| chrono::Utc::now() + chrono::Duration::seconds(secs));

    let (_, session) = state
        .auth
        .sign_in_with_google(
            &profile,
            OAuthTokens {
                access_token: Some(tokens.access_token),
                refresh_token: tokens.refresh_token,
                id_token: Some(tokens.id_token),
                access_token_expires_at: expires_at,
                scope: tokens.scope,
            },
            client_meta(&headers),
        )
        .await?;

    let jar = jar.add(session_cookie(&session.token));
    Ok((jar, Redirect::temporary(&callback_url)))
}

// ─── Password Reset ──────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

/// POST /api/auth/forgot-password
async fn forgot_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<()>>> {
    body.validate()?;

    let meta = client_meta(&headers);
    state
        .auth
        .check_rate_limit(&rate_limit_key("forgot-password", &meta))
        .await?;

    state.auth.forgot_password(&body.email).await?;

    Ok(Json(ApiResponse::message(
        "If that email exists, a reset link has been sent",
    )))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// POST /api/auth/reset-password
async fn reset_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<()>>> {
    body.validate()?;

    let meta = client_meta(&headers);
    state
        .auth
        .check_rate_limit(&rate_limit_key("reset-password", &meta))
        .await?;

    state
        .auth
        .reset_password(&body.token, &body.new_password)
        .await?;

    Ok(Json(ApiResponse::message(
        "Password has been reset. Please sign in again.",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_meta_parses_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.7, 10.0.0.1".parse().unwrap(),
        );
        headers.insert(header::USER_AGENT, "test-agent/1.0".parse().unwrap());

        let meta = client_meta(&headers);
        assert_eq!(meta.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(meta.user_agent.as_deref(), Some("test-agent/1.0"));
    }

    #[test]
    fn test_external_base_url_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "localhost:3000".parse().unwrap());
        assert_eq!(external_base_url(&headers), "http://localhost:3000");

        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "api.fold.example".parse().unwrap());
        assert_eq!(external_base_url(&headers), "https://api.fold.example");
    }

    #[test]
    fn test_sign_up_request_validation() {
        let bad: SignUpRequest = serde_json::from_str(
            r#"{"email":"not-an-email","password":"password123","name":"A"}"#,
        )
        .unwrap();
        assert!(bad.validate().is_err());

        let short: SignUpRequest = serde_json::from_str(
            r#"{"email":"a@example.com","password":"short","name":"A"}"#,
        )
        .unwrap();
        assert!(short.validate().is_err());

        let ok: SignUpRequest = serde_json::from_str(
            r#"{"email":"a@example.com","password":"password123","name":"A"}"#,
        )
        .unwrap();
        assert!(ok.validate().is_ok());
    }
}
