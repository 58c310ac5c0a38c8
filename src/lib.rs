// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fold: backend API for a social memories/stories application.
//!
//! This crate provides authentication (email/password + Google OAuth),
//! profile management, and file uploads backed by Appwrite Storage.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod routes;
pub mod services;

use config::Config;
use db::Db;
use services::{AppwriteStorage, AuthService, GoogleOAuth, GoogleOidcVerifier};
use std::time::Instant;

/// Shared application state.
///
/// All long-lived clients are constructed once at startup and injected
/// here; nothing is module-level global.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub auth: AuthService,
    pub storage: AppwriteStorage,
    pub google: GoogleOAuth,
    pub oidc: GoogleOidcVerifier,
    pub started_at: Instant,
}
