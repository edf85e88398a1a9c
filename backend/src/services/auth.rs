//! Authentication service
//!
//! Orchestrates password hashing, the user store, access-token signing and
//! the refresh-token store for register, login, refresh, logout and token
//! validation.
//!
//! The service holds no mutable state of its own; all of it lives in the
//! injected stores, so clones can be shared freely across request tasks.
//!
//! Refresh tokens are not rotated on use: a refresh token stays valid until
//! it expires or is revoked by logout.

use crate::auth::{Claims, JwtService, PasswordError, PasswordService, TokenError};
use crate::config::AppConfig;
use crate::repositories::{
    RefreshTokenRecord, RefreshTokenStore, RepositoryError, TokenState, UserRecord, UserStore,
};
use chrono::{Duration, Utc};
use metrics::counter;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Auth domain errors
///
/// The first four are expected outcomes mapped to 401/409 by the HTTP layer;
/// `Internal` is an infrastructure failure.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Unknown email or wrong password, deliberately indistinguishable
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already in use")]
    EmailInUse,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::ExpiredToken,
            TokenError::Invalid(_) => AuthError::InvalidToken,
        }
    }
}

impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => AuthError::NotFound,
            RepositoryError::DuplicateEmail => AuthError::EmailInUse,
            RepositoryError::Database(e) => AuthError::Internal(e.into()),
        }
    }
}

/// Tokens handed out by a successful login
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub refresh_token: RefreshTokenRecord,
}

/// Result of exchanging a refresh token
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub access_token: String,
    pub expires_in: i64,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    jwt: JwtService,
    passwords: PasswordService,
    refresh_token_ttl: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        jwt: JwtService,
        passwords: PasswordService,
        refresh_token_ttl: Duration,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            jwt,
            passwords,
            refresh_token_ttl,
        }
    }

    /// Build the service from configuration
    ///
    /// Derives the signing keys, so call it once at startup.
    pub fn from_config(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        config: &AppConfig,
    ) -> Self {
        Self::new(
            users,
            refresh_tokens,
            JwtService::new(&config.jwt.secret, config.jwt.access_token_expiry_secs),
            PasswordService::from_config(&config.password),
            Duration::seconds(config.jwt.refresh_token_expiry_secs),
        )
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Register a new user
    ///
    /// The lookup up front only skips a pointless hash; the store's unique
    /// constraint is what decides a race between two registrations.
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<UserRecord, AuthError> {
        match self.users.get_by_email(email).await {
            Ok(_) => {
                counter!("auth_register_total", "outcome" => "email_in_use").increment(1);
                return Err(AuthError::EmailInUse);
            }
            Err(RepositoryError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let password_hash = self
            .passwords
            .hash_async(password.to_string())
            .await
            .map_err(|e| AuthError::Internal(e.into()))?;

        let user = self
            .users
            .create(email, username, &password_hash)
            .await
            .map_err(|e| {
                if matches!(e, RepositoryError::DuplicateEmail) {
                    counter!("auth_register_total", "outcome" => "email_in_use").increment(1);
                }
                AuthError::from(e)
            })?;

        counter!("auth_register_total", "outcome" => "success").increment(1);
        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Authenticate with email and password, issuing access and refresh tokens
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedTokens, AuthError> {
        let user = match self.users.get_by_email(email).await {
            Ok(user) => user,
            Err(RepositoryError::NotFound) => {
                self.passwords.verify_dummy_async(password.to_string()).await;
                counter!("auth_login_total", "outcome" => "invalid_credentials").increment(1);
                debug!("Login rejected: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        match self
            .passwords
            .verify_async(password.to_string(), user.password_hash.clone())
            .await
        {
            Ok(()) => {}
            Err(PasswordError::Mismatch) => {
                counter!("auth_login_total", "outcome" => "invalid_credentials").increment(1);
                debug!(user_id = %user.id, "Login rejected: password mismatch");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                // Same answer to the caller; the stored hash needs attention
                counter!("auth_login_total", "outcome" => "invalid_credentials").increment(1);
                warn!(user_id = %user.id, error = %e, "Password verification failed");
                return Err(AuthError::InvalidCredentials);
            }
        }

        let access_token = self
            .jwt
            .issue_access_token(user.id, &user.email, &user.username)?;
        let refresh_token = self
            .refresh_tokens
            .create(user.id, self.refresh_token_ttl)
            .await
            .map_err(|e| AuthError::Internal(e.into()))?;

        if let Err(e) = self.users.record_login(user.id, Utc::now()).await {
            warn!(user_id = %user.id, error = %e, "Failed to record last login");
        }

        counter!("auth_login_total", "outcome" => "success").increment(1);
        info!(user_id = %user.id, "User logged in");

        Ok(IssuedTokens {
            access_token,
            expires_in: self.jwt.access_token_expiry_secs(),
            refresh_token,
        })
    }

    /// Exchange a refresh token for a new access token
    ///
    /// Unknown tokens are `InvalidToken`; revoked or expired ones are
    /// `ExpiredToken`.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<IssuedAccessToken, AuthError> {
        let record = match self.refresh_tokens.get_by_token(refresh_token).await {
            Ok(record) => record,
            Err(RepositoryError::NotFound) => {
                counter!("auth_refresh_total", "outcome" => "invalid").increment(1);
                return Err(AuthError::InvalidToken);
            }
            Err(e) => return Err(AuthError::Internal(e.into())),
        };

        match record.state_at(Utc::now()) {
            TokenState::Active => {}
            state => {
                counter!("auth_refresh_total", "outcome" => "expired").increment(1);
                debug!(user_id = %record.user_id, ?state, "Refresh rejected");
                return Err(AuthError::ExpiredToken);
            }
        }

        let user = match self.users.get_by_id(record.user_id).await {
            Ok(user) => user,
            Err(RepositoryError::NotFound) => {
                warn!(user_id = %record.user_id, "Refresh token owner no longer exists");
                return Err(AuthError::InvalidToken);
            }
            Err(e) => return Err(e.into()),
        };

        let access_token = self
            .jwt
            .issue_access_token(user.id, &user.email, &user.username)?;

        counter!("auth_refresh_total", "outcome" => "success").increment(1);
        debug!(user_id = %user.id, "Access token refreshed");

        Ok(IssuedAccessToken {
            access_token,
            expires_in: self.jwt.access_token_expiry_secs(),
        })
    }

    /// Revoke a refresh token
    ///
    /// Unknown and already-revoked tokens are not errors. Callers on the
    /// logout path ignore failures entirely.
    pub async fn revoke_refresh_token(&self, refresh_token: &str) -> Result<(), AuthError> {
        let matched = self
            .refresh_tokens
            .revoke(refresh_token)
            .await
            .map_err(|e| AuthError::Internal(e.into()))?;

        if matched {
            info!("Refresh token revoked");
        } else {
            debug!("Revoke requested for unknown refresh token");
        }
        Ok(())
    }

    /// Validate an access token
    #[inline]
    pub fn validate_token(&self, access_token: &str) -> Result<Claims, AuthError> {
        Ok(self.jwt.validate(access_token)?)
    }

    /// Check that the backing store is reachable
    pub async fn health_check(&self) -> Result<(), AuthError> {
        self.users
            .ping()
            .await
            .map_err(|e| AuthError::Internal(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PasswordAlgorithm;
    use crate::repositories::{InMemoryRefreshTokenStore, InMemoryUserStore};
    use uuid::Uuid;

    struct Harness {
        service: AuthService,
        users: InMemoryUserStore,
        tokens: InMemoryRefreshTokenStore,
    }

    fn harness_with_refresh_ttl(refresh_ttl: Duration) -> Harness {
        let users = InMemoryUserStore::new();
        let tokens = InMemoryRefreshTokenStore::new();
        let service = AuthService::new(
            Arc::new(users.clone()),
            Arc::new(tokens.clone()),
            JwtService::new("test-secret-key-for-testing-only-32chars", 900),
            // Cheap hashes keep the suite fast
            PasswordService::new(PasswordAlgorithm::Bcrypt, 4),
            refresh_ttl,
        );
        Harness {
            service,
            users,
            tokens,
        }
    }

    fn harness() -> Harness {
        harness_with_refresh_ttl(Duration::days(7))
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let h = harness();
        let user = h
            .service
            .register("alice@example.com", "alice", "secret123")
            .await
            .unwrap();

        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.username, "alice");
        assert_ne!(user.password_hash, "secret123");

        let tokens = h
            .service
            .login("alice@example.com", "secret123")
            .await
            .unwrap();

        assert!(!tokens.access_token.is_empty());
        assert_eq!(tokens.expires_in, 900);
        assert_eq!(tokens.refresh_token.user_id, user.id);
        assert!(!tokens.refresh_token.revoked);
        assert_eq!(h.tokens.tokens_for_user(user.id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_login_records_last_login() {
        let h = harness();
        let user = h
            .service
            .register("alice@example.com", "alice", "secret123")
            .await
            .unwrap();
        assert!(user.last_login.is_none());

        h.service
            .login("alice@example.com", "secret123")
            .await
            .unwrap();

        let stored = h.users.get_by_id(user.id).await.unwrap();
        assert!(stored.last_login.is_some());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let h = harness();
        h.service
            .register("alice@example.com", "alice", "secret123")
            .await
            .unwrap();

        let result = h
            .service
            .register("alice@example.com", "someone-else", "different-password")
            .await;
        assert!(matches!(result, Err(AuthError::EmailInUse)));
    }

    #[tokio::test]
    async fn test_concurrent_register_admits_one() {
        let h = harness();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = h.service.clone();
                tokio::spawn(async move {
                    service
                        .register("race@example.com", &format!("racer{}", i), "secret123")
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(AuthError::EmailInUse) => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 7);
        assert_eq!(h.users.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let h = harness();
        h.service
            .register("alice@example.com", "alice", "secret123")
            .await
            .unwrap();

        let wrong_password = h.service.login("alice@example.com", "wrong-password").await;
        let unknown_email = h.service.login("nobody@example.com", "secret123").await;

        assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown_email, Err(AuthError::InvalidCredentials)));
        assert_eq!(
            wrong_password.unwrap_err().to_string(),
            unknown_email.unwrap_err().to_string()
        );
    }

    #[tokio::test]
    async fn test_login_with_corrupt_hash_is_invalid_credentials() {
        let h = harness();
        h.users
            .create("broken@example.com", "broken", "not-a-hash")
            .await
            .unwrap();

        let result = h.service.login("broken@example.com", "secret123").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_validate_token_returns_subject() {
        let h = harness();
        let user = h
            .service
            .register("alice@example.com", "alice", "secret123")
            .await
            .unwrap();
        let tokens = h
            .service
            .login("alice@example.com", "secret123")
            .await
            .unwrap();

        let claims = h.service.validate_token(&tokens.access_token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.username, user.username);
    }

    #[tokio::test]
    async fn test_validate_token_error_passthrough() {
        let h = harness();
        let expired = h
            .service
            .jwt()
            .issue(Uuid::new_v4(), "a@example.com", "a", Duration::seconds(-30))
            .unwrap();

        assert!(matches!(
            h.service.validate_token(&expired),
            Err(AuthError::ExpiredToken)
        ));
        assert!(matches!(
            h.service.validate_token("garbage"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_refresh_issues_new_access_token() {
        let h = harness();
        let user = h
            .service
            .register("alice@example.com", "alice", "secret123")
            .await
            .unwrap();
        let tokens = h
            .service
            .login("alice@example.com", "secret123")
            .await
            .unwrap();

        let refreshed = h
            .service
            .refresh_access_token(&tokens.refresh_token.token)
            .await
            .unwrap();
        let claims = h.service.validate_token(&refreshed.access_token).unwrap();
        assert_eq!(claims.sub, user.id);

        // Not rotated: the same refresh token keeps working
        assert!(h
            .service
            .refresh_access_token(&tokens.refresh_token.token)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_refresh_unknown_token_is_invalid() {
        let h = harness();
        let result = h.service.refresh_access_token("no-such-token").await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_refresh_after_revoke_is_expired() {
        let h = harness();
        h.service
            .register("alice@example.com", "alice", "secret123")
            .await
            .unwrap();
        let tokens = h
            .service
            .login("alice@example.com", "secret123")
            .await
            .unwrap();

        h.service
            .revoke_refresh_token(&tokens.refresh_token.token)
            .await
            .unwrap();

        let result = h
            .service
            .refresh_access_token(&tokens.refresh_token.token)
            .await;
        assert!(matches!(result, Err(AuthError::ExpiredToken)));
    }

    #[tokio::test]
    async fn test_refresh_after_expiry_is_expired() {
        let h = harness_with_refresh_ttl(Duration::seconds(-1));
        h.service
            .register("alice@example.com", "alice", "secret123")
            .await
            .unwrap();
        let tokens = h
            .service
            .login("alice@example.com", "secret123")
            .await
            .unwrap();

        let result = h
            .service
            .refresh_access_token(&tokens.refresh_token.token)
            .await;
        assert!(matches!(result, Err(AuthError::ExpiredToken)));
    }

    #[tokio::test]
    async fn test_refresh_for_missing_owner_is_invalid() {
        let h = harness();
        let orphan = h
            .tokens
            .create(Uuid::new_v4(), Duration::days(1))
            .await
            .unwrap();

        let result = h.service.refresh_access_token(&orphan.token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_revoke_is_best_effort() {
        let h = harness();
        assert!(h.service.revoke_refresh_token("unknown").await.is_ok());

        let token = h
            .tokens
            .create(Uuid::new_v4(), Duration::days(1))
            .await
            .unwrap();
        assert!(h.service.revoke_refresh_token(&token.token).await.is_ok());
        assert!(h.service.revoke_refresh_token(&token.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_health_check_with_memory_stores() {
        assert!(harness().service.health_check().await.is_ok());
    }

    #[test]
    fn test_error_conversions() {
        assert!(matches!(
            AuthError::from(TokenError::Expired),
            AuthError::ExpiredToken
        ));
        assert!(matches!(
            AuthError::from(TokenError::Invalid("x".into())),
            AuthError::InvalidToken
        ));
        assert!(matches!(
            AuthError::from(RepositoryError::DuplicateEmail),
            AuthError::EmailInUse
        ));
        assert!(matches!(
            AuthError::from(RepositoryError::NotFound),
            AuthError::NotFound
        ));
    }
}
