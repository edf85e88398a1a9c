//! Refresh token repository
//!
//! Tokens are soft-revoked only; rows are never deleted here.

use super::{generate_token_string, RefreshTokenStore, RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Lifecycle state of a refresh token at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Active,
    /// Past `expires_at`; computed, never stored
    Expired,
    /// Explicitly revoked; terminal
    Revoked,
}

/// Refresh token record from database
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked: bool,
}

impl RefreshTokenRecord {
    /// Build a fresh, unrevoked token for `user_id`
    pub fn issue(user_id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            token: generate_token_string(),
            expires_at: now + ttl,
            created_at: now,
            revoked: false,
        }
    }

    /// Revocation wins over expiry when both apply
    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if self.revoked {
            TokenState::Revoked
        } else if now >= self.expires_at {
            TokenState::Expired
        } else {
            TokenState::Active
        }
    }

    /// Seconds left before expiry, zero once expired
    pub fn remaining_secs(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}

/// Postgres-backed [`RefreshTokenStore`]
#[derive(Debug, Clone)]
pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

impl PgRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenRepository {
    async fn create(&self, user_id: Uuid, ttl: Duration) -> RepositoryResult<RefreshTokenRecord> {
        let record = RefreshTokenRecord::issue(user_id, ttl);

        let token = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token, expires_at, created_at, revoked)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, token, expires_at, created_at, revoked
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.token)
        .bind(record.expires_at)
        .bind(record.created_at)
        .bind(record.revoked)
        .fetch_one(&self.pool)
        .await?;

        Ok(token)
    }

    async fn get_by_token(&self, token: &str) -> RepositoryResult<RefreshTokenRecord> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, user_id, token, expires_at, created_at, revoked
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    async fn revoke(&self, token: &str) -> RepositoryResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE token = $1
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
