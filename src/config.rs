//! Application configuration loaded from environment variables.
//!
//! Secrets (OAuth client secret, Appwrite API key, state-signing key) are
//! read once at startup and held in memory for the process lifetime.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL (CORS allow-origin + OAuth redirect target)
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Environment name; anything other than "production" exposes
    /// internal error messages in 500 responses
    pub environment: String,
    /// Database connection URL (sqlite)
    pub database_url: String,

    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// HMAC key for signing the OAuth state parameter
    pub oauth_state_key: Vec<u8>,

    /// Appwrite endpoint, e.g. https://cloud.appwrite.io/v1
    pub appwrite_endpoint: String,
    /// Appwrite project ID
    pub appwrite_project_id: String,
    /// Appwrite API key (server-side)
    pub appwrite_api_key: String,
    /// Appwrite storage bucket ID
    pub appwrite_bucket_id: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// For local development, secrets can be set via a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            environment: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://fold.db".to_string()),

            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?
                .into_bytes(),

            appwrite_endpoint: env::var("APPWRITE_ENDPOINT")
                .unwrap_or_else(|_| "https://cloud.appwrite.io/v1".to_string()),
            appwrite_project_id: env::var("APPWRITE_PROJECT_ID")
                .map_err(|_| ConfigError::Missing("APPWRITE_PROJECT_ID"))?,
            appwrite_api_key: env::var("APPWRITE_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("APPWRITE_API_KEY"))?,
            appwrite_bucket_id: env::var("APPWRITE_BUCKET_ID")
                .map_err(|_| ConfigError::Missing("APPWRITE_BUCKET_ID"))?,
        })
    }

    /// Whether internal error messages may be included in 500 responses.
    pub fn expose_error_detail(&self) -> bool {
        self.environment != "production"
    }

    /// Default config for tests only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:3001".to_string(),
            port: 3000,
            environment: "test".to_string(),
            database_url: "sqlite::memory:".to_string(),
            google_client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            google_client_secret: "test_google_secret".to_string(),
            oauth_state_key: b"test_oauth_state_key_32_bytes!!".to_vec(),
            appwrite_endpoint: "https://cloud.appwrite.io/v1".to_string(),
            appwrite_project_id: "test-project".to_string(),
            appwrite_api_key: "test_api_key".to_string(),
            appwrite_bucket_id: "test-bucket".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
