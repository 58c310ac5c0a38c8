// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth client: authorization URL construction with a signed state
//! parameter, and authorization-code exchange.

use crate::config::Config;
use crate::error::AppError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Verified identity claims for a Google user.
#[derive(Debug, Clone)]
pub struct GoogleProfile {
    pub sub: String,
    pub email: String,
    pub email_verified: bool,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Google OAuth client.
#[derive(Clone)]
pub struct GoogleOAuth {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    state_key: Vec<u8>,
}

impl GoogleOAuth {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            state_key: config.oauth_state_key.clone(),
        }
    }

    /// Build the authorization URL, embedding the post-login callback URL
    /// in an HMAC-signed state parameter.
    pub fn authorization_url(
        &self,
        redirect_uri: &str,
        callback_url: &str,
    ) -> Result<String, AppError> {
        let state = sign_state(callback_url, &self.state_key)?;

        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope=openid%20email%20profile&access_type=offline&state={}",
            AUTHORIZATION_ENDPOINT,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            state
        ))
    }

    /// Verify the state parameter and recover the callback URL.
    pub fn verify_state(&self, state: &str) -> Option<String> {
        verify_and_decode_state(state, &self.state_key)
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<GoogleTokenResponse, AppError> {
        let response = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Token exchange request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::BadRequest(format!(
                "Google token exchange failed (HTTP {}): {}",
                status, body
            )));
        }

        response.json().await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Token exchange JSON parse error: {}", e))
        })
    }
}

/// Token response from Google's token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleTokenResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub id_token: String,
}

/// Sign `callback_url|timestamp_hex` and base64url-encode the result.
fn sign_state(callback_url: &str, secret: &[u8]) -> Result<String, AppError> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    let payload = format!("{}|{:x}", callback_url, timestamp);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify the HMAC signature and decode the callback URL from the state.
fn verify_and_decode_state(state: &str, secret: &[u8]) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Format is "callback_url|timestamp_hex|signature_hex"
    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }

    let callback_url = parts[0];
    let timestamp_hex = parts[1];
    let signature_hex = parts[2];

    let payload = format!("{}|{}", callback_url, timestamp_hex);

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());

    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if signature_hex != expected_signature {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    Some(callback_url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_state_round_trip() {
        let secret = b"secret_key";
        let state = sign_state("https://example.com/welcome", secret).unwrap();
        let decoded = verify_and_decode_state(&state, secret);
        assert_eq!(decoded, Some("https://example.com/welcome".to_string()));
    }

    #[test]
    fn test_state_wrong_secret() {
        let state = sign_state("https://example.com/welcome", b"secret_key").unwrap();
        assert_eq!(verify_and_decode_state(&state, b"wrong_key"), None);
    }

    #[test]
    fn test_state_malformed() {
        let encoded = URL_SAFE_NO_PAD.encode("invalid|format");
        assert_eq!(verify_and_decode_state(&encoded, b"secret_key"), None);
    }

    #[test]
    fn test_authorization_url_contains_signed_state() {
        let google = GoogleOAuth::new(&Config::test_default());
        let url = google
            .authorization_url(
                "http://localhost:3000/api/auth/callback/google",
                "http://localhost:3001/welcome",
            )
            .unwrap();

        assert!(url.starts_with(AUTHORIZATION_ENDPOINT));
        assert!(url.contains("response_type=code"));

        let state = url.split("state=").nth(1).unwrap();
        assert_eq!(
            google.verify_state(state),
            Some("http://localhost:3001/welcome".to_string())
        );
    }
}
