// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (SQLite via sqlx) with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile storage)
//! - Sessions (opaque bearer tokens)
//! - Accounts (credential / OAuth provider bindings)
//! - Verifications (password reset tokens)
//! - Rate limiting (fixed-window counters)
//!
//! Foreign keys are enabled on every connection so deleting a user cascades
//! to its sessions and accounts.

use crate::error::AppError;
use crate::models::{Account, Session, User, Verification};
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

/// Schema applied at startup. Engine-portable apart from the TEXT ids.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS user (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    email_verified INTEGER NOT NULL DEFAULT 0,
    image TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS session (
    id TEXT PRIMARY KEY,
    token TEXT NOT NULL UNIQUE,
    expires_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    ip_address TEXT,
    user_agent TEXT,
    user_id TEXT NOT NULL REFERENCES user(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS account (
    id TEXT PRIMARY KEY,
    account_id TEXT NOT NULL,
    provider_id TEXT NOT NULL,
    user_id TEXT NOT NULL REFERENCES user(id) ON DELETE CASCADE,
    access_token TEXT,
    refresh_token TEXT,
    id_token TEXT,
    access_token_expires_at TEXT,
    refresh_token_expires_at TEXT,
    scope TEXT,
    password TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS verification (
    id TEXT PRIMARY KEY,
    identifier TEXT NOT NULL,
    value TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rate_limit (
    id TEXT PRIMARY KEY,
    key TEXT NOT NULL UNIQUE,
    count INTEGER NOT NULL DEFAULT 0,
    last_request TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_session_user_id ON session(user_id);
CREATE INDEX IF NOT EXISTS idx_account_user_id ON account(user_id);
CREATE INDEX IF NOT EXISTS idx_verification_identifier ON verification(identifier);
"#;

/// Database client.
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Connect to the configured database and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::Database(format!("Invalid DATABASE_URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to database: {}", e)))?;

        let db = Self { pool };
        db.migrate().await?;

        tracing::info!(url = database_url, "Connected to database");
        Ok(db)
    }

    /// Connect to a private in-memory database (tests and the seed dry run).
    ///
    /// A single connection keeps the in-memory database alive and shared.
    pub async fn connect_in_memory() -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| AppError::Database(e.to_string()))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Apply the schema. Idempotent.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Migration failed: {}", e)))?;
        Ok(())
    }

    /// Raw pool access for the seed binary and tests.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO user (id, name, email, email_verified, image, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.email_verified)
        .bind(&user.image)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM user WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM user WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Apply a partial profile update in a single conditional UPDATE.
    ///
    /// `name`: written when supplied. `avatar`: outer `None` means "not
    /// supplied", inner `None` clears the column. `updated_at` is always
    /// refreshed. Returns the updated row.
    pub async fn update_user_profile(
        &self,
        user_id: &str,
        name: Option<String>,
        avatar: Option<Option<String>>,
    ) -> Result<Option<User>, AppError> {
        let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new("UPDATE user SET updated_at = ");
        qb.push_bind(Utc::now());

        if let Some(name) = name {
            qb.push(", name = ");
            qb.push_bind(name);
        }
        if let Some(avatar) = avatar {
            qb.push(", image = ");
            qb.push_bind(avatar);
        }

        qb.push(" WHERE id = ");
        qb.push_bind(user_id);
        qb.push(" RETURNING *");

        let user = qb
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn set_email_verified(&self, user_id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE user SET email_verified = 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete a user row. Sessions and accounts go with it (FK cascade).
    pub async fn delete_user(&self, user_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM user WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ─── Session Operations ──────────────────────────────────────

    pub async fn insert_session(&self, session: &Session) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO session
                 (id, token, expires_at, created_at, updated_at, ip_address, user_agent, user_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(&session.token)
        .bind(session.expires_at)
        .bind(session.created_at)
        .bind(session.updated_at)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(&session.user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_session_by_token(&self, token: &str) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>("SELECT * FROM session WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    /// Push the expiry out and refresh `updated_at` (sliding sessions).
    pub async fn touch_session(
        &self,
        session_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE session SET expires_at = ?, updated_at = ? WHERE id = ?")
            .bind(expires_at)
            .bind(Utc::now())
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_session_by_token(&self, token: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM session WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_expired_session(&self, session_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM session WHERE id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_sessions_for_user(&self, user_id: &str) -> Result<Vec<Session>, AppError> {
        let sessions = sqlx::query_as::<_, Session>(
            "SELECT * FROM session WHERE user_id = ? ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    /// Delete every session for the user except the one holding `keep_token`.
    pub async fn delete_other_sessions(
        &self,
        user_id: &str,
        keep_token: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM session WHERE user_id = ? AND token != ?")
            .bind(user_id)
            .bind(keep_token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_all_sessions(&self, user_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM session WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ─── Account Operations ──────────────────────────────────────

    pub async fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO account
                 (id, account_id, provider_id, user_id, access_token, refresh_token, id_token,
                  access_token_expires_at, refresh_token_expires_at, scope, password,
                  created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&account.id)
        .bind(&account.account_id)
        .bind(&account.provider_id)
        .bind(&account.user_id)
        .bind(&account.access_token)
        .bind(&account.refresh_token)
        .bind(&account.id_token)
        .bind(account.access_token_expires_at)
        .bind(account.refresh_token_expires_at)
        .bind(&account.scope)
        .bind(&account.password)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_account_for_provider(
        &self,
        user_id: &str,
        provider_id: &str,
    ) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT * FROM account WHERE user_id = ? AND provider_id = ?",
        )
        .bind(user_id)
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    pub async fn find_account_by_provider_id(
        &self,
        provider_id: &str,
        account_id: &str,
    ) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT * FROM account WHERE provider_id = ? AND account_id = ?",
        )
        .bind(provider_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    pub async fn update_account_password(
        &self,
        account_id: &str,
        password_hash: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE account SET password = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_account_oauth_tokens(
        &self,
        account_id: &str,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
        id_token: Option<&str>,
        access_token_expires_at: Option<DateTime<Utc>>,
        scope: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE account
             SET access_token = ?, refresh_token = COALESCE(?, refresh_token),
                 id_token = ?, access_token_expires_at = ?, scope = COALESCE(?, scope),
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(access_token)
        .bind(refresh_token)
        .bind(id_token)
        .bind(access_token_expires_at)
        .bind(scope)
        .bind(Utc::now())
        .bind(account_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ─── Verification Operations ─────────────────────────────────

    pub async fn insert_verification(&self, verification: &Verification) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO verification (id, identifier, value, expires_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&verification.id)
        .bind(&verification.identifier)
        .bind(&verification.value)
        .bind(verification.expires_at)
        .bind(verification.created_at)
        .bind(verification.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Look up an unexpired verification token and delete it (single use).
    pub async fn consume_verification(
        &self,
        value: &str,
    ) -> Result<Option<Verification>, AppError> {
        let verification = sqlx::query_as::<_, Verification>(
            "DELETE FROM verification WHERE value = ? AND expires_at > ? RETURNING *",
        )
        .bind(value)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        Ok(verification)
    }

    pub async fn delete_expired_verifications(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM verification WHERE expires_at <= ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ─── Rate Limiting ───────────────────────────────────────────

    /// Fixed-window counter. Returns `true` when the request is allowed.
    ///
    /// Read-modify-write without a transaction: concurrent callers may
    /// slightly overcount, which only makes the limiter stricter.
    pub async fn rate_limit_check(
        &self,
        key: &str,
        window_secs: i64,
        max_requests: i64,
    ) -> Result<bool, AppError> {
        let now = Utc::now();
        let window_start = now - Duration::seconds(window_secs);

        let row = sqlx::query("SELECT count, last_request FROM rate_limit WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let count = match row {
            Some(row) => {
                let count: i64 = row.get("count");
                let last_request: DateTime<Utc> = row.get("last_request");
                if last_request < window_start {
                    1
                } else {
                    count + 1
                }
            }
            None => 1,
        };

        sqlx::query(
            "INSERT INTO rate_limit (id, key, count, last_request) VALUES (?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET count = excluded.count,
                 last_request = CASE WHEN excluded.count = 1
                     THEN excluded.last_request ELSE rate_limit.last_request END",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(key)
        .bind(count)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(count <= max_requests)
    }

    // ─── Test Helpers ────────────────────────────────────────────

    /// Count rows in a table. Test support for cascade assertions.
    pub async fn count_rows(&self, table: &str) -> Result<i64, AppError> {
        // Table names cannot be bound; restrict to known tables.
        const TABLES: &[&str] = &["user", "session", "account", "verification", "rate_limit"];
        if !TABLES.contains(&table) {
            return Err(AppError::Database(format!("unknown table: {}", table)));
        }

        let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::CREDENTIAL_PROVIDER;

    fn sample_user(id: &str, email: &str) -> User {
        let now = Utc::now();
        User {
            id: id.to_string(),
            name: "Test User".to_string(),
            email: email.to_string(),
            email_verified: false,
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_session(user_id: &str, token: &str) -> Session {
        let now = Utc::now();
        Session {
            id: uuid::Uuid::new_v4().to_string(),
            token: token.to_string(),
            expires_at: now + Duration::days(7),
            created_at: now,
            updated_at: now,
            ip_address: None,
            user_agent: None,
            user_id: user_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_user_round_trip() {
        let db = Db::connect_in_memory().await.unwrap();
        let user = sample_user("u1", "a@example.com");
        db.create_user(&user).await.unwrap();

        let fetched = db.get_user_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(fetched.id, "u1");
        assert_eq!(fetched.name, "Test User");
        assert!(!fetched.email_verified);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = Db::connect_in_memory().await.unwrap();
        db.create_user(&sample_user("u1", "a@example.com"))
            .await
            .unwrap();
        let err = db.create_user(&sample_user("u2", "a@example.com")).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_profile_update_partial() {
        let db = Db::connect_in_memory().await.unwrap();
        let user = sample_user("u1", "a@example.com");
        db.create_user(&user).await.unwrap();

        let updated = db
            .update_user_profile("u1", Some("New Name".to_string()), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "New Name");
        assert_eq!(updated.email, "a@example.com");
        assert_eq!(updated.image, None);
        assert!(updated.updated_at >= user.updated_at);

        // Clearing the avatar via explicit null.
        let updated = db
            .update_user_profile("u1", None, Some(None))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.image, None);
        assert_eq!(updated.name, "New Name");
    }

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let db = Db::connect_in_memory().await.unwrap();
        let user = sample_user("u1", "a@example.com");
        db.create_user(&user).await.unwrap();
        db.insert_session(&sample_session("u1", "tok-1"))
            .await
            .unwrap();

        let now = Utc::now();
        db.insert_account(&Account {
            id: "acc1".to_string(),
            account_id: "a@example.com".to_string(),
            provider_id: CREDENTIAL_PROVIDER.to_string(),
            user_id: "u1".to_string(),
            access_token: None,
            refresh_token: None,
            id_token: None,
            access_token_expires_at: None,
            refresh_token_expires_at: None,
            scope: None,
            password: Some("hash".to_string()),
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

        assert_eq!(db.delete_user("u1").await.unwrap(), 1);
        assert_eq!(db.count_rows("session").await.unwrap(), 0);
        assert_eq!(db.count_rows("account").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sessions_revoke_others() {
        let db = Db::connect_in_memory().await.unwrap();
        db.create_user(&sample_user("u1", "a@example.com"))
            .await
            .unwrap();
        db.insert_session(&sample_session("u1", "tok-1"))
            .await
            .unwrap();
        db.insert_session(&sample_session("u1", "tok-2"))
            .await
            .unwrap();
        db.insert_session(&sample_session("u1", "tok-3"))
            .await
            .unwrap();

        let removed = db.delete_other_sessions("u1", "tok-2").await.unwrap();
        assert_eq!(removed, 2);

        let remaining = db.list_sessions_for_user("u1").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].token, "tok-2");
    }

    #[tokio::test]
    async fn test_verification_consumed_once() {
        let db = Db::connect_in_memory().await.unwrap();
        let now = Utc::now();
        db.insert_verification(&Verification {
            id: "v1".to_string(),
            identifier: "a@example.com".to_string(),
            value: "reset-token".to_string(),
            expires_at: now + Duration::hours(1),
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

        let first = db.consume_verification("reset-token").await.unwrap();
        assert!(first.is_some());
        let second = db.consume_verification("reset-token").await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_expired_verification_not_returned() {
        let db = Db::connect_in_memory().await.unwrap();
        let now = Utc::now();
        db.insert_verification(&Verification {
            id: "v1".to_string(),
            identifier: "a@example.com".to_string(),
            value: "stale".to_string(),
            expires_at: now - Duration::minutes(1),
            created_at: now - Duration::hours(2),
            updated_at: now - Duration::hours(2),
        })
        .await
        .unwrap();

        assert!(db.consume_verification("stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_window() {
        let db = Db::connect_in_memory().await.unwrap();

        for _ in 0..3 {
            assert!(db.rate_limit_check("ip:1.2.3.4", 60, 3).await.unwrap());
        }
        assert!(!db.rate_limit_check("ip:1.2.3.4", 60, 3).await.unwrap());

        // Separate keys do not interfere.
        assert!(db.rate_limit_check("ip:5.6.7.8", 60, 3).await.unwrap());
    }
}
