// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod google;
pub mod google_oidc;
pub mod storage;

pub use auth::{AuthService, ClientMeta, OAuthTokens, SESSION_COOKIE};
pub use google::{GoogleOAuth, GoogleProfile};
pub use google_oidc::GoogleOidcVerifier;
pub use storage::{AppwriteFile, AppwriteFileList, AppwriteStorage};
