// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session and credential management.
//!
//! Handles:
//! - Email/password sign-up and sign-in (argon2 hashes)
//! - Opaque DB-backed session tokens with sliding expiry
//! - Password change / reset with session revocation
//! - OAuth sign-in with account linking
//! - Fixed-window rate limiting for credential-sensitive routes

use crate::db::Db;
use crate::error::AppError;
use crate::models::user::CREDENTIAL_PROVIDER;
use crate::models::{Account, Session, User, Verification};
use crate::services::google::GoogleProfile;
use argon2::password_hash::{
    rand_core::OsRng as SaltRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "fold.session_token";

/// Sessions live for 7 days.
pub const SESSION_LIFETIME_DAYS: i64 = 7;
/// A session older than this since its last update gets its expiry pushed out.
pub const SESSION_UPDATE_AGE_HOURS: i64 = 24;
/// Password reset tokens live for one hour.
const VERIFICATION_LIFETIME_HOURS: i64 = 1;

/// Fixed-window rate limit: 100 requests per 60 seconds per key.
const RATE_LIMIT_WINDOW_SECS: i64 = 60;
const RATE_LIMIT_MAX_REQUESTS: i64 = 100;

/// Client metadata captured at session creation.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Authentication service. Holds a database handle; cheap to clone.
#[derive(Clone)]
pub struct AuthService {
    db: Db,
}

impl AuthService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    // ─── Email / Password ────────────────────────────────────────

    /// Register a new email/password user and open a session.
    pub async fn sign_up_email(
        &self,
        email: &str,
        password: &str,
        name: &str,
        meta: ClientMeta,
    ) -> Result<(User, Session), AppError> {
        let email = email.trim().to_lowercase();

        if self.db.get_user_by_email(&email).await?.is_some() {
            return Err(AppError::BadRequest(
                "User with this email already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.clone(),
            email_verified: false,
            image: None,
            created_at: now,
            updated_at: now,
        };
        self.db.create_user(&user).await?;

        let account = Account {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: user.id.clone(),
            provider_id: CREDENTIAL_PROVIDER.to_string(),
            user_id: user.id.clone(),
            access_token: None,
            refresh_token: None,
            id_token: None,
            access_token_expires_at: None,
            refresh_token_expires_at: None,
            scope: None,
            password: Some(hash_password(password)?),
            created_at: now,
            updated_at: now,
        };
        self.db.insert_account(&account).await?;

        let session = self.create_session(&user.id, meta).await?;

        tracing::info!(user_id = %user.id, "User signed up");
        Ok((user, session))
    }

    /// Verify credentials and open a session.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn sign_in_email(
        &self,
        email: &str,
        password: &str,
        meta: ClientMeta,
    ) -> Result<(User, Session), AppError> {
        let email = email.trim().to_lowercase();

        let user = self
            .db
            .get_user_by_email(&email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let account = self
            .db
            .get_account_for_provider(&user.id, CREDENTIAL_PROVIDER)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let hash = account.password.ok_or(AppError::InvalidCredentials)?;
        if !verify_password(&hash, password) {
            return Err(AppError::InvalidCredentials);
        }

        let session = self.create_session(&user.id, meta).await?;

        tracing::info!(user_id = %user.id, "User signed in");
        Ok((user, session))
    }

    // ─── Sessions ────────────────────────────────────────────────

    /// Open a fresh session for a user.
    pub async fn create_session(
        &self,
        user_id: &str,
        meta: ClientMeta,
    ) -> Result<Session, AppError> {
        let now = Utc::now();
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            token: generate_token(),
            expires_at: now + Duration::days(SESSION_LIFETIME_DAYS),
            created_at: now,
            updated_at: now,
            ip_address: meta.ip_address,
            user_agent: meta.user_agent,
            user_id: user_id.to_string(),
        };
        self.db.insert_session(&session).await?;
        Ok(session)
    }

    /// Resolve a bearer token into `(user, session)`.
    ///
    /// Expired sessions are deleted on sight. A session past its update age
    /// gets its expiry pushed out (sliding sessions). Any lookup failure is
    /// reported as `None`; this never rejects a request by itself.
    pub async fn resolve_session(
        &self,
        token: &str,
    ) -> Result<Option<(User, Session)>, AppError> {
        let Some(mut session) = self.db.get_session_by_token(token).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if session.expires_at <= now {
            self.db.delete_expired_session(&session.id).await?;
            return Ok(None);
        }

        let Some(user) = self.db.get_user_by_id(&session.user_id).await? else {
            return Ok(None);
        };

        if now - session.updated_at >= Duration::hours(SESSION_UPDATE_AGE_HOURS) {
            let expires_at = now + Duration::days(SESSION_LIFETIME_DAYS);
            self.db.touch_session(&session.id, expires_at).await?;
            session.expires_at = expires_at;
            session.updated_at = now;
        }

        Ok(Some((user, session)))
    }

    /// Delete the session holding this token.
    pub async fn sign_out(&self, token: &str) -> Result<(), AppError> {
        self.db.delete_session_by_token(token).await?;
        Ok(())
    }

    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>, AppError> {
        self.db.list_sessions_for_user(user_id).await
    }

    /// Revoke every session except the one that issued the request.
    pub async fn revoke_other_sessions(
        &self,
        user_id: &str,
        current_token: &str,
    ) -> Result<u64, AppError> {
        self.db.delete_other_sessions(user_id, current_token).await
    }

    // ─── Password Management ─────────────────────────────────────

    /// Rotate the password after verifying the current one.
    /// All other sessions are revoked as a side effect.
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
        current_token: &str,
    ) -> Result<(), AppError> {
        let account = self
            .db
            .get_account_for_provider(user_id, CREDENTIAL_PROVIDER)
            .await?
            .ok_or_else(|| {
                AppError::BadRequest("No password is set for this account".to_string())
            })?;

        let hash = account.password.as_deref().ok_or_else(|| {
            AppError::BadRequest("No password is set for this account".to_string())
        })?;

        if !verify_password(hash, current_password) {
            return Err(AppError::BadRequest(
                "Current password is incorrect".to_string(),
            ));
        }

        self.db
            .update_account_password(&account.id, &hash_password(new_password)?)
            .await?;

        let revoked = self
            .db
            .delete_other_sessions(user_id, current_token)
            .await?;
        tracing::info!(user_id, revoked, "Password changed, other sessions revoked");
        Ok(())
    }

    /// Mint a password reset token.
    ///
    /// The result is uniform whether or not the email exists; the token is
    /// only logged since no mail transport is configured.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        let email = email.trim().to_lowercase();

        // Opportunistic cleanup of stale tokens.
        self.db.delete_expired_verifications().await.ok();

        if self.db.get_user_by_email(&email).await?.is_none() {
            return Ok(());
        }

        let now = Utc::now();
        let verification = Verification {
            id: uuid::Uuid::new_v4().to_string(),
            identifier: email.clone(),
            value: generate_token(),
            expires_at: now + Duration::hours(VERIFICATION_LIFETIME_HOURS),
            created_at: now,
            updated_at: now,
        };
        self.db.insert_verification(&verification).await?;

        tracing::debug!(email = %email, token = %verification.value, "Password reset token issued");
        Ok(())
    }

    /// Consume a reset token, set the new password and revoke all sessions.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let verification = self
            .db
            .consume_verification(token)
            .await?
            .ok_or_else(|| {
                AppError::BadRequest("Invalid or expired reset token".to_string())
            })?;

        let user = self
            .db
            .get_user_by_email(&verification.identifier)
            .await?
            .ok_or_else(|| {
                AppError::BadRequest("Invalid or expired reset token".to_string())
            })?;

        let hash = hash_password(new_password)?;
        match self
            .db
            .get_account_for_provider(&user.id, CREDENTIAL_PROVIDER)
            .await?
        {
            Some(account) => {
                self.db.update_account_password(&account.id, &hash).await?;
            }
            None => {
                // OAuth-only user setting a password for the first time.
                let now = Utc::now();
                self.db
                    .insert_account(&Account {
                        id: uuid::Uuid::new_v4().to_string(),
                        account_id: user.id.clone(),
                        provider_id: CREDENTIAL_PROVIDER.to_string(),
                        user_id: user.id.clone(),
                        access_token: None,
                        refresh_token: None,
                        id_token: None,
                        access_token_expires_at: None,
                        refresh_token_expires_at: None,
                        scope: None,
                        password: Some(hash),
                        created_at: now,
                        updated_at: now,
                    })
                    .await?;
            }
        }

        self.db.delete_all_sessions(&user.id).await?;
        tracing::info!(user_id = %user.id, "Password reset, all sessions revoked");
        Ok(())
    }

    // ─── OAuth ───────────────────────────────────────────────────

    /// Complete a Google sign-in: upsert the user with account linking
    /// and open a session.
    ///
    /// An existing user with the same email gains a `google` account row
    /// instead of a duplicate user.
    pub async fn sign_in_with_google(
        &self,
        profile: &GoogleProfile,
        tokens: OAuthTokens,
        meta: ClientMeta,
    ) -> Result<(User, Session), AppError> {
        let existing = self
            .db
            .find_account_by_provider_id("google", &profile.sub)
            .await?;

        let user = if let Some(account) = existing {
            self.db
                .update_account_oauth_tokens(
                    &account.id,
                    tokens.access_token.as_deref(),
                    tokens.refresh_token.as_deref(),
                    tokens.id_token.as_deref(),
                    tokens.access_token_expires_at,
                    tokens.scope.as_deref(),
                )
                .await?;

            self.db
                .get_user_by_id(&account.user_id)
                .await?
                .ok_or_else(|| {
                    AppError::Database("Account row without user".to_string())
                })?
        } else {
            let user = match self.db.get_user_by_email(&profile.email).await? {
                Some(user) => {
                    tracing::info!(user_id = %user.id, "Linking google account to existing user");
                    if profile.email_verified && !user.email_verified {
                        self.db.set_email_verified(&user.id).await?;
                    }
                    user
                }
                None => {
                    let now = Utc::now();
                    let user = User {
                        id: uuid::Uuid::new_v4().to_string(),
                        name: profile.name.clone().unwrap_or_else(|| profile.email.clone()),
                        email: profile.email.clone(),
                        email_verified: profile.email_verified,
                        image: profile.picture.clone(),
                        created_at: now,
                        updated_at: now,
                    };
                    self.db.create_user(&user).await?;
                    user
                }
            };

            let now = Utc::now();
            self.db
                .insert_account(&Account {
                    id: uuid::Uuid::new_v4().to_string(),
                    account_id: profile.sub.clone(),
                    provider_id: "google".to_string(),
                    user_id: user.id.clone(),
                    access_token: tokens.access_token.clone(),
                    refresh_token: tokens.refresh_token.clone(),
                    id_token: tokens.id_token.clone(),
                    access_token_expires_at: tokens.access_token_expires_at,
                    refresh_token_expires_at: None,
                    scope: tokens.scope.clone(),
                    password: None,
                    created_at: now,
                    updated_at: now,
                })
                .await?;
            user
        };

        let session = self.create_session(&user.id, meta).await?;
        Ok((user, session))
    }

    // ─── Rate Limiting ───────────────────────────────────────────

    /// Enforce the fixed-window rate limit for a key.
    pub async fn check_rate_limit(&self, key: &str) -> Result<(), AppError> {
        let allowed = self
            .db
            .rate_limit_check(key, RATE_LIMIT_WINDOW_SECS, RATE_LIMIT_MAX_REQUESTS)
            .await?;
        if allowed {
            Ok(())
        } else {
            tracing::warn!(key, "Rate limit exceeded");
            Err(AppError::RateLimited)
        }
    }
}

/// OAuth token set from the provider's code exchange.
#[derive(Debug, Clone, Default)]
pub struct OAuthTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub access_token_expires_at: Option<DateTime<Utc>>,
    pub scope: Option<String>,
}

/// Hash a password with argon2 and a fresh salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut SaltRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored argon2 hash.
fn verify_password(hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Generate an opaque session/reset token: 32 random bytes, base64url.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_service() -> AuthService {
        AuthService::new(Db::connect_in_memory().await.unwrap())
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("hunter2hunter2").unwrap();
        assert!(verify_password(&hash, "hunter2hunter2"));
        assert!(!verify_password(&hash, "wrong-password"));
    }

    #[test]
    fn test_tokens_are_unique_and_urlsafe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[tokio::test]
    async fn test_sign_up_then_resolve_session() {
        let auth = test_service().await;
        let (user, session) = auth
            .sign_up_email("a@example.com", "password123", "Test", ClientMeta::default())
            .await
            .unwrap();

        let resolved = auth.resolve_session(&session.token).await.unwrap();
        let (resolved_user, resolved_session) = resolved.unwrap();
        assert_eq!(resolved_user.id, user.id);
        assert_eq!(resolved_session.id, session.id);
    }

    #[tokio::test]
    async fn test_sign_up_duplicate_email() {
        let auth = test_service().await;
        auth.sign_up_email("a@example.com", "password123", "Test", ClientMeta::default())
            .await
            .unwrap();

        let err = auth
            .sign_up_email("A@Example.com", "password456", "Other", ClientMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password() {
        let auth = test_service().await;
        auth.sign_up_email("a@example.com", "password123", "Test", ClientMeta::default())
            .await
            .unwrap();

        let err = auth
            .sign_in_email("a@example.com", "wrong-password", ClientMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        let err = auth
            .sign_in_email("nobody@example.com", "password123", ClientMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_sign_out_invalidates_token() {
        let auth = test_service().await;
        let (_, session) = auth
            .sign_up_email("a@example.com", "password123", "Test", ClientMeta::default())
            .await
            .unwrap();

        auth.sign_out(&session.token).await.unwrap();
        assert!(auth.resolve_session(&session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_change_password_revokes_other_sessions() {
        let auth = test_service().await;
        let (user, current) = auth
            .sign_up_email("a@example.com", "password123", "Test", ClientMeta::default())
            .await
            .unwrap();
        let (_, other) = auth
            .sign_in_email("a@example.com", "password123", ClientMeta::default())
            .await
            .unwrap();

        auth.change_password(&user.id, "password123", "new-password-1", &current.token)
            .await
            .unwrap();

        assert!(auth.resolve_session(&current.token).await.unwrap().is_some());
        assert!(auth.resolve_session(&other.token).await.unwrap().is_none());

        // Old password no longer works, new one does.
        assert!(auth
            .sign_in_email("a@example.com", "password123", ClientMeta::default())
            .await
            .is_err());
        assert!(auth
            .sign_in_email("a@example.com", "new-password-1", ClientMeta::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_change_password_wrong_current() {
        let auth = test_service().await;
        let (user, session) = auth
            .sign_up_email("a@example.com", "password123", "Test", ClientMeta::default())
            .await
            .unwrap();

        let err = auth
            .change_password(&user.id, "not-the-password", "new-password-1", &session.token)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_google_sign_in_links_existing_user() {
        let auth = test_service().await;
        let (user, _) = auth
            .sign_up_email("a@example.com", "password123", "Test", ClientMeta::default())
            .await
            .unwrap();

        let profile = GoogleProfile {
            sub: "google-sub-1".to_string(),
            email: "a@example.com".to_string(),
            email_verified: true,
            name: Some("Test".to_string()),
            picture: None,
        };

        let (linked, _) = auth
            .sign_in_with_google(&profile, OAuthTokens::default(), ClientMeta::default())
            .await
            .unwrap();
        assert_eq!(linked.id, user.id);

        // Second sign-in reuses the account row, still one user.
        let (again, _) = auth
            .sign_in_with_google(&profile, OAuthTokens::default(), ClientMeta::default())
            .await
            .unwrap();
        assert_eq!(again.id, user.id);
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_after_max() {
        let auth = test_service().await;

        // The configured window allows 100 requests; the 101st fails.
        for _ in 0..100 {
            auth.check_rate_limit("ip:9.9.9.9").await.unwrap();
        }
        let err = auth.check_rate_limit("ip:9.9.9.9").await.unwrap_err();
        assert!(matches!(err, AppError::RateLimited));
    }
}
