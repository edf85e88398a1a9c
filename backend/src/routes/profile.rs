//! Profile route for the authenticated caller

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use placer_shared::types::UserProfile;

/// Create profile routes
///
/// Callers must layer `auth_middleware` on top.
pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/", get(get_profile))
}

/// GET /api/v1/profile - Get the caller's profile
async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<UserProfile>> {
    let profile = state.users().get_profile(auth.user_id).await?;
    Ok(Json(profile))
}
