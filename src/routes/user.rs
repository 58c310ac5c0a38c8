// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile and session management routes.
//!
//! All routes here sit behind the `require_auth` guard applied in
//! routes/mod.rs.

use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{SessionInfo, UserPublic};
use crate::routes::ApiResponse;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use validator::{Validate, ValidateUrl, ValidationError, ValidationErrors};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(get_me).patch(update_me).delete(delete_me))
        .route("/change-password", post(change_password))
        .route("/sessions", get(list_sessions))
        .route("/revoke-sessions", post(revoke_sessions))
}

// ─── Profile ─────────────────────────────────────────────────

/// Get current user profile.
async fn get_me(Extension(current): Extension<CurrentUser>) -> Json<ApiResponse<UserPublic>> {
    Json(ApiResponse::data(UserPublic::from(current.user)))
}

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    /// Absent = leave unchanged, `null` = clear, string = must be a URL.
    #[serde(default, deserialize_with = "double_option")]
    pub avatar: Option<Option<String>>,
}

impl UpdateUserRequest {
    fn validated(self) -> Result<Self> {
        let mut errors = self.validate().err().unwrap_or_else(ValidationErrors::new);

        if let Some(Some(url)) = &self.avatar {
            if !url.validate_url() {
                let mut error = ValidationError::new("url");
                error.message = Some("avatar must be a valid URL".into());
                errors.add("avatar", error);
            }
        }

        if errors.is_empty() {
            Ok(self)
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

/// Update current user profile (name, avatar).
///
/// Only supplied fields are written; `updatedAt` is always refreshed.
async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserPublic>>> {
    let body = body.validated()?;

    let updated = state
        .db
        .update_user_profile(&current.user.id, body.name, body.avatar)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(ApiResponse::message_data(
        "Profile updated successfully",
        UserPublic::from(updated),
    )))
}

/// Delete current user account. Sessions and accounts cascade.
async fn delete_me(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<()>>> {
    let removed = state.db.delete_user(&current.user.id).await?;
    if removed == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %current.user.id, "Account deleted");
    Ok(Json(ApiResponse::message("Account deleted successfully")))
}

// ─── Password ────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// Change password (email/password users). Revokes all other sessions.
async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>> {
    body.validate()?;

    state
        .auth
        .change_password(
            &current.user.id,
            &body.current_password,
            &body.new_password,
            &current.session.token,
        )
        .await?;

    Ok(Json(ApiResponse::message(
        "Password changed successfully. Other sessions have been revoked.",
    )))
}

// ─── Sessions ────────────────────────────────────────────────

/// List all active sessions for the current user.
async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<SessionInfo>>>> {
    let sessions = state.auth.list_sessions(&current.user.id).await?;

    let infos = sessions
        .into_iter()
        .map(|s| SessionInfo::from_session(s, &current.session.token))
        .collect();

    Ok(Json(ApiResponse::data(infos)))
}

/// Revoke all sessions except the one issuing this request.
async fn revoke_sessions(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<()>>> {
    state
        .auth
        .revoke_other_sessions(&current.user.id, &current.session.token)
        .await?;

    Ok(Json(ApiResponse::message(
        "All other sessions have been revoked",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_absent_vs_null_avatar() {
        let absent: UpdateUserRequest = serde_json::from_str(r#"{"name":"A"}"#).unwrap();
        assert_eq!(absent.avatar, None);

        let null: UpdateUserRequest = serde_json::from_str(r#"{"avatar":null}"#).unwrap();
        assert_eq!(null.avatar, Some(None));

        let set: UpdateUserRequest =
            serde_json::from_str(r#"{"avatar":"https://example.com/a.png"}"#).unwrap();
        assert_eq!(set.avatar, Some(Some("https://example.com/a.png".to_string())));
    }

    #[test]
    fn test_update_request_rejects_bad_avatar() {
        let body: UpdateUserRequest =
            serde_json::from_str(r#"{"avatar":"not a url"}"#).unwrap();
        assert!(body.validated().is_err());
    }

    #[test]
    fn test_update_request_rejects_empty_name() {
        let body: UpdateUserRequest = serde_json::from_str(r#"{"name":""}"#).unwrap();
        assert!(body.validated().is_err());

        let long = "x".repeat(101);
        let body: UpdateUserRequest =
            serde_json::from_str(&format!(r#"{{"name":"{}"}}"#, long)).unwrap();
        assert!(body.validated().is_err());
    }

    #[test]
    fn test_change_password_length_bounds() {
        let short: ChangePasswordRequest =
            serde_json::from_str(r#"{"currentPassword":"x","newPassword":"short"}"#).unwrap();
        assert!(short.validate().is_err());

        let ok: ChangePasswordRequest =
            serde_json::from_str(r#"{"currentPassword":"x","newPassword":"longenough1"}"#)
                .unwrap();
        assert!(ok.validate().is_ok());
    }
}
