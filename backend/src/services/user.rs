//! User profile lookups for authenticated callers

use crate::repositories::{UserRecord, UserStore};
use crate::services::AuthError;
use placer_shared::types::UserProfile;
use std::sync::Arc;
use uuid::Uuid;

/// Read-only access to user profiles
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Get user profile
    pub async fn get_profile(&self, user_id: Uuid) -> Result<UserProfile, AuthError> {
        let user = self.users.get_by_id(user_id).await?;

        Ok(to_profile(user))
    }
}

/// Strip credential material from a user record
pub fn to_profile(user: UserRecord) -> UserProfile {
    UserProfile {
        id: user.id.to_string(),
        email: user.email,
        username: user.username,
        created_at: user.created_at,
        last_login: user.last_login,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryUserStore;

    #[tokio::test]
    async fn test_get_profile() {
        let store = InMemoryUserStore::new();
        let user = store
            .create("alice@example.com", "alice", "hash")
            .await
            .unwrap();
        let service = UserService::new(Arc::new(store));

        let profile = service.get_profile(user.id).await.unwrap();
        assert_eq!(profile.id, user.id.to_string());
        assert_eq!(profile.email, "alice@example.com");
        assert_eq!(profile.username, "alice");
    }

    #[tokio::test]
    async fn test_get_profile_unknown_user() {
        let service = UserService::new(Arc::new(InMemoryUserStore::new()));
        let result = service.get_profile(Uuid::new_v4()).await;
        assert!(matches!(result, Err(AuthError::NotFound)));
    }
}
