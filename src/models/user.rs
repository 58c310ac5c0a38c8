//! User, session, account and verification rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User row. `image` holds the avatar URL.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public projection of a user, as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPublic {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            avatar: user.image,
            email_verified: user.email_verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Session row. One authenticated browser/device context.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    /// Opaque bearer token, unique. Never echoed by list endpoints.
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub user_id: String,
}

/// Session metadata as returned by `GET /api/user/sessions`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// Whether this is the session that issued the request.
    pub current: bool,
}

impl SessionInfo {
    pub fn from_session(session: Session, current_token: &str) -> Self {
        let current = session.token == current_token;
        Self {
            id: session.id,
            expires_at: session.expires_at,
            created_at: session.created_at,
            updated_at: session.updated_at,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
            current,
        }
    }
}

/// Credential/identity-provider binding for a user.
///
/// `provider_id` is `"credential"` for email/password (argon2 hash in
/// `password`) or an OAuth provider name such as `"google"` (tokens set).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: String,
    pub account_id: String,
    pub provider_id: String,
    pub user_id: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub access_token_expires_at: Option<DateTime<Utc>>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    pub scope: Option<String>,
    pub password: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Provider id for email/password accounts.
pub const CREDENTIAL_PROVIDER: &str = "credential";

/// Short-lived token record for password reset flows.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Verification {
    pub id: String,
    pub identifier: String,
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session(token: &str) -> Session {
        let now = Utc::now();
        Session {
            id: "s1".to_string(),
            token: token.to_string(),
            expires_at: now + chrono::Duration::days(7),
            created_at: now,
            updated_at: now,
            ip_address: None,
            user_agent: Some("test-agent".to_string()),
            user_id: "u1".to_string(),
        }
    }

    #[test]
    fn test_session_info_marks_current() {
        let info = SessionInfo::from_session(sample_session("tok-a"), "tok-a");
        assert!(info.current);

        let info = SessionInfo::from_session(sample_session("tok-a"), "tok-b");
        assert!(!info.current);
    }

    #[test]
    fn test_user_public_maps_image_to_avatar() {
        let now = Utc::now();
        let user = User {
            id: "u1".to_string(),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            email_verified: false,
            image: Some("https://example.com/pic.png".to_string()),
            created_at: now,
            updated_at: now,
        };

        let public = UserPublic::from(user);
        assert_eq!(public.avatar.as_deref(), Some("https://example.com/pic.png"));
    }
}
