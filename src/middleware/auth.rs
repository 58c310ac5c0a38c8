// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session resolution middleware.
//!
//! Two stages:
//! 1. [`attach_session`] runs on every request, resolves zero-or-one valid
//!    session from the cookie or bearer header, and attaches an
//!    [`AuthContext`] without ever rejecting.
//! 2. [`require_auth`] short-circuits with a uniform 401 when no user was
//!    attached, and exposes a [`CurrentUser`] to the handlers behind it.
//!
//! Public routes can read [`AuthContext`] directly to observe session state
//! when present.

use crate::error::AppError;
use crate::models::{Session, User};
use crate::services::auth::SESSION_COOKIE;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Session state attached to every request. Both fields absent when the
/// caller is anonymous.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub user: Option<User>,
    pub session: Option<Session>,
}

/// Authenticated caller, available behind [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub session: Session,
}

/// Pull the session token from the cookie, falling back to a bearer header.
fn extract_token(jar: &CookieJar, request: &Request) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    auth_header.strip_prefix("Bearer ").map(|t| t.to_string())
}

/// Middleware that attaches the caller's session state to the request.
///
/// A missing, expired or invalid token attaches an empty context and the
/// request continues; a session lookup failure is treated identically.
pub async fn attach_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let context = match extract_token(&jar, &request) {
        Some(token) => match state.auth.resolve_session(&token).await {
            Ok(Some((user, session))) => AuthContext {
                user: Some(user),
                session: Some(session),
            },
            Ok(None) => AuthContext::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Session lookup failed; treating as anonymous");
                AuthContext::default()
            }
        },
        None => AuthContext::default(),
    };

    request.extensions_mut().insert(context);
    next.run(request).await
}

/// Middleware that requires an authenticated caller.
pub async fn require_auth(mut request: Request, next: Next) -> Response {
    let context = request
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .unwrap_or_default();

    let (Some(user), Some(session)) = (context.user, context.session) else {
        return AppError::Unauthorized.into_response();
    };

    request
        .extensions_mut()
        .insert(CurrentUser { user, session });
    next.run(request).await
}
