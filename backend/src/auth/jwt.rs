//! JWT access token generation and validation
//!
//! Access tokens are HS256-signed and self-contained; nothing about them is
//! stored server-side. Keys are derived once from the configured secret.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// The only algorithm accepted for signing and verification
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Access token claims
///
/// Every field is required; a token missing one fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub email: String,
    pub username: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Uuid {
        self.sub
    }
}

/// Token validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Signature and structure are fine but `exp` has passed
    #[error("Token has expired")]
    Expired,

    /// Bad signature, wrong algorithm, malformed token or claims
    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Pre-computed JWT keys for efficient token operations
#[derive(Clone)]
pub struct JwtKeys {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
}

impl JwtKeys {
    /// Create new JWT keys from secret
    /// This should be called once at startup
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }
}

/// Signs and verifies access tokens
///
/// Cheap to clone; the keys and validation rules are shared behind `Arc`.
#[derive(Clone)]
pub struct JwtService {
    keys: JwtKeys,
    validation: Arc<Validation>,
    access_token_ttl: Duration,
}

impl JwtService {
    /// Create a new JWT service with pre-computed keys
    pub fn new(secret: &str, access_token_expiry_secs: i64) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            keys: JwtKeys::new(secret),
            validation: Arc::new(validation),
            access_token_ttl: Duration::seconds(access_token_expiry_secs),
        }
    }

    /// Sign a token for the given identity that expires after `ttl`
    pub fn issue(
        &self,
        user_id: Uuid,
        email: &str,
        username: &str,
        ttl: Duration,
    ) -> anyhow::Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(ALGORITHM), &claims, &self.keys.encoding)
            .map_err(|e| anyhow::anyhow!("Failed to sign access token: {}", e))
    }

    /// Sign a token with the configured access-token lifetime
    #[inline]
    pub fn issue_access_token(
        &self,
        user_id: Uuid,
        email: &str,
        username: &str,
    ) -> anyhow::Result<String> {
        self.issue(user_id, email, username, self.access_token_ttl)
    }

    /// Verify signature, algorithm and expiry, returning the claims
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.keys.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }

    /// Access token lifetime in seconds, reported to clients as `expires_in`
    #[inline]
    pub fn access_token_expiry_secs(&self) -> i64 {
        self.access_token_ttl.num_seconds()
    }
}
