// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fold Backend API Server
//!
//! Authentication, user management and file uploads for the Fold
//! memories/stories application.

use fold_backend::{
    config::Config,
    db::Db,
    services::{AppwriteStorage, AuthService, GoogleOAuth, GoogleOidcVerifier},
    AppState,
};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, env = %config.environment, "Starting Fold Backend API");

    // Connect to the database and apply the schema
    let db = Db::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Long-lived clients, built once and shared across requests
    let auth = AuthService::new(db.clone());
    let storage = AppwriteStorage::new(&config);
    let google = GoogleOAuth::new(&config);
    let oidc = GoogleOidcVerifier::new(&config).expect("Failed to initialize OIDC verifier");
    tracing::info!(
        endpoint = %config.appwrite_endpoint,
        bucket = %config.appwrite_bucket_id,
        "Storage client initialized"
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        auth,
        storage,
        google,
        oidc,
        started_at: Instant::now(),
    });

    // Build router
    let app = fold_backend::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fold_backend=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
