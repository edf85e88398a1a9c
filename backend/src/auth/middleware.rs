//! Authentication middleware
//!
//! Resolves a Bearer access token to the caller's identity. Expired and
//! invalid tokens get the same 401 response; only the log level differs.

use crate::error::ApiError;
use crate::services::AuthError;
use crate::state::AppState;
use axum::{
    extract::{FromRef, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};
use uuid::Uuid;

/// Authenticated user extracted from the access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
}

/// Pull the token out of an `Authorization: Bearer <token>` header
fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Authorization header required".to_string()))?;

    auth_header
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Invalid authorization format".to_string()))
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    let token = bearer_token(headers)?;

    let claims = state.auth().validate_token(token).map_err(|e| {
        match &e {
            AuthError::ExpiredToken => debug!("Rejected expired access token"),
            other => warn!(error = %other, "Rejected invalid access token"),
        }
        ApiError::Unauthorized("Invalid or expired token".to_string())
    })?;

    Ok(AuthUser {
        user_id: claims.user_id(),
        email: claims.email,
        username: claims.username,
    })
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already resolved by `auth_middleware`
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let app_state = AppState::from_ref(state);
        authenticate(&app_state, &parts.headers)
    }
}

/// Middleware guarding a group of routes
///
/// Inserts [`AuthUser`] into the request extensions for downstream handlers.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, request.headers())?;
    debug!(user_id = %user.user_id, path = %request.uri().path(), "Request authenticated");

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use rstest::rstest;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_header_is_rejected() {
        assert!(bearer_token(&HeaderMap::new()).is_err());
    }

    #[rstest]
    #[case("Basic dXNlcjpwYXNz")]
    #[case("bearer abc")]
    #[case("Bearer ")]
    #[case("Bearerabc")]
    #[case("Token abc.def.ghi")]
    fn test_bearer_token_rejects_bad_formats(#[case] header: &str) {
        assert!(bearer_token(&headers_with(header)).is_err());
    }

    #[test]
    fn test_authenticate_resolves_identity() {
        let state = AppState::in_memory(crate::config::AppConfig::default());
        let user_id = Uuid::new_v4();
        let token = state
            .auth()
            .jwt()
            .issue_access_token(user_id, "alice@example.com", "alice")
            .unwrap();

        let user = authenticate(&state, &headers_with(&format!("Bearer {}", token))).unwrap();
        assert_eq!(
            user,
            AuthUser {
                user_id,
                email: "alice@example.com".to_string(),
                username: "alice".to_string(),
            }
        );
    }
}
