//! Persistence for users and refresh tokens
//!
//! The auth service only sees the [`UserStore`] and [`RefreshTokenStore`]
//! traits. Postgres implementations back the running server; the in-memory
//! ones serve tests and local experiments. Every method is a single atomic
//! unit in both.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod refresh_token;
pub mod user;

pub use memory::{InMemoryRefreshTokenStore, InMemoryUserStore};
pub use refresh_token::{PgRefreshTokenRepository, RefreshTokenRecord, TokenState};
pub use user::{PgUserRepository, UserRecord};

/// Store-level failures
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// User persistence keyed by unique email and by id
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Insert a user; fails with `DuplicateEmail` if the email is taken,
    /// even when two inserts race.
    async fn create(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> RepositoryResult<UserRecord>;

    async fn get_by_email(&self, email: &str) -> RepositoryResult<UserRecord>;

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<UserRecord>;

    /// Stamp the last successful login
    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> RepositoryResult<()>;

    /// Round trip to the backing store for readiness checks
    async fn ping(&self) -> RepositoryResult<()>;
}

/// Refresh-token persistence keyed by the token string
#[async_trait]
pub trait RefreshTokenStore: Send + Sync + 'static {
    /// Mint and persist an unguessable token for `user_id` valid for `ttl`
    async fn create(&self, user_id: Uuid, ttl: Duration) -> RepositoryResult<RefreshTokenRecord>;

    async fn get_by_token(&self, token: &str) -> RepositoryResult<RefreshTokenRecord>;

    /// Mark the token revoked. Idempotent; returns whether any token matched.
    async fn revoke(&self, token: &str) -> RepositoryResult<bool>;
}

/// Opaque refresh-token string: a v4 UUID, 122 bits from the OS CSPRNG
pub(crate) fn generate_token_string() -> String {
    Uuid::new_v4().to_string()
}
