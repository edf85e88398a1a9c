//! Authentication routes
//!
//! Register, login, refresh and logout. The refresh token is carried in an
//! HTTP-only cookie; refresh and logout also accept it in the JSON body for
//! clients that cannot use cookies.

use crate::config::{CookieConfig, CookieSameSite};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use placer_shared::types::{
    AccessTokenResponse, LoginRequest, RefreshTokenRequest, RegisterRequest, RegisterResponse,
};
use placer_shared::{validation, ValidationError};
use serde_json::{json, Value};
use tracing::warn;

/// Create auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
}

/// Register a new user
///
/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    validation::validate_registration(&req.email, &req.username, &req.password)?;

    let user = state
        .auth()
        .register(&req.email, req.username.trim(), &req.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id.to_string(),
            email: user.email,
            username: user.username,
        }),
    ))
}

/// Login with email and password
///
/// POST /api/v1/auth/login
///
/// The access token is returned in the body, the refresh token as a cookie.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<AccessTokenResponse>)> {
    if req.email.is_empty() {
        return Err(ValidationError::Required("email").into());
    }
    if req.password.is_empty() {
        return Err(ValidationError::Required("password").into());
    }

    let tokens = state.auth().login(&req.email, &req.password).await?;

    let max_age = tokens.refresh_token.remaining_secs();
    let cookie = refresh_cookie(&state.config().cookie, tokens.refresh_token.token, max_age);

    Ok((
        jar.add(cookie),
        Json(AccessTokenResponse::bearer(
            tokens.access_token,
            tokens.expires_in,
        )),
    ))
}

/// Exchange a refresh token for a new access token
///
/// POST /api/v1/auth/refresh
async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshTokenRequest>>,
) -> ApiResult<Json<AccessTokenResponse>> {
    let token = presented_refresh_token(&state.config().cookie, &jar, body)
        .ok_or_else(|| ApiError::Unauthorized("Refresh token required".to_string()))?;

    let issued = state.auth().refresh_access_token(&token).await?;

    Ok(Json(AccessTokenResponse::bearer(
        issued.access_token,
        issued.expires_in,
    )))
}

/// Revoke the refresh token and clear the cookie
///
/// POST /api/v1/auth/logout
///
/// Always succeeds; a failed revoke is logged and otherwise ignored.
async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshTokenRequest>>,
) -> (CookieJar, Json<Value>) {
    let cookie_config = &state.config().cookie;

    if let Some(token) = presented_refresh_token(cookie_config, &jar, body) {
        if let Err(e) = state.auth().revoke_refresh_token(&token).await {
            warn!(error = %e, "Failed to revoke refresh token on logout");
        }
    }

    (
        jar.remove(removal_cookie(cookie_config)),
        Json(json!({ "message": "Logged out" })),
    )
}

/// Cookie first, then the JSON body
fn presented_refresh_token(
    config: &CookieConfig,
    jar: &CookieJar,
    body: Option<Json<RefreshTokenRequest>>,
) -> Option<String> {
    jar.get(&config.name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| body.and_then(|Json(req)| req.refresh_token))
        .filter(|value| !value.is_empty())
}

fn same_site(value: CookieSameSite) -> SameSite {
    match value {
        CookieSameSite::Strict => SameSite::Strict,
        CookieSameSite::Lax => SameSite::Lax,
        CookieSameSite::None => SameSite::None,
    }
}

fn refresh_cookie(config: &CookieConfig, value: String, max_age_secs: i64) -> Cookie<'static> {
    let mut cookie = Cookie::build((config.name.clone(), value))
        .http_only(true)
        .secure(config.secure)
        .same_site(same_site(config.same_site))
        .path("/")
        .max_age(time::Duration::seconds(max_age_secs))
        .build();

    if let Some(domain) = &config.domain {
        cookie.set_domain(domain.clone());
    }
    cookie
}

/// Path and domain must match the issued cookie for the browser to drop it
fn removal_cookie(config: &CookieConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build(config.name.clone())
        .http_only(true)
        .secure(config.secure)
        .same_site(same_site(config.same_site))
        .path("/")
        .build();

    if let Some(domain) = &config.domain {
        cookie.set_domain(domain.clone());
    }
    cookie
}
