//! In-memory stores using Tokio locks for single-process use.
//!
//! Each operation holds one lock for its whole check-and-mutate, which gives
//! the same atomicity the Postgres constraints provide.

use super::{
    RefreshTokenRecord, RefreshTokenStore, RepositoryError, RepositoryResult, UserRecord,
    UserStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct UserTable {
    by_id: HashMap<Uuid, UserRecord>,
    /// email -> id, the uniqueness index
    by_email: HashMap<String, Uuid>,
}

/// In-memory [`UserStore`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    table: Arc<RwLock<UserTable>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn user_count(&self) -> usize {
        self.table.read().await.by_id.len()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> RepositoryResult<UserRecord> {
        let mut table = self.table.write().await;

        if table.by_email.contains_key(email) {
            return Err(RepositoryError::DuplicateEmail);
        }

        let user = UserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
            last_login: None,
        };
        table.by_email.insert(user.email.clone(), user.id);
        table.by_id.insert(user.id, user.clone());

        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> RepositoryResult<UserRecord> {
        let table = self.table.read().await;
        table
            .by_email
            .get(email)
            .and_then(|id| table.by_id.get(id))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<UserRecord> {
        self.table
            .read()
            .await
            .by_id
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> RepositoryResult<()> {
        let mut table = self.table.write().await;
        let user = table.by_id.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        user.last_login = Some(at);
        Ok(())
    }

    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }
}

/// In-memory [`RefreshTokenStore`] keyed by token string
#[derive(Debug, Clone, Default)]
pub struct InMemoryRefreshTokenStore {
    tokens: Arc<RwLock<HashMap<String, RefreshTokenRecord>>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn tokens_for_user(&self, user_id: Uuid) -> Vec<RefreshTokenRecord> {
        self.tokens
            .read()
            .await
            .values()
            .filter(|token| token.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn create(&self, user_id: Uuid, ttl: Duration) -> RepositoryResult<RefreshTokenRecord> {
        let record = RefreshTokenRecord::issue(user_id, ttl);
        self.tokens
            .write()
            .await
            .insert(record.token.clone(), record.clone());
        Ok(record)
    }

    async fn get_by_token(&self, token: &str) -> RepositoryResult<RefreshTokenRecord> {
        self.tokens
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn revoke(&self, token: &str) -> RepositoryResult<bool> {
        match self.tokens.write().await.get_mut(token) {
            Some(record) => {
                record.revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
