/// User and profile endpoints
///
/// # Endpoints
///
/// - `GET /api/v1/users/profile` - Own profile and token identity
/// - `PUT /api/v1/users/profile` - Partial update of own profile
/// - `GET /api/v1/users/all?search=` - Directory, up to 50 entries
/// - `GET /api/v1/users/search?email=` - Lookup by email, up to 10 entries
/// - `GET /api/v1/users/:id` - Public profile
/// - `POST /api/v1/users/avatar` - Set own avatar URL

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery},
    response::ApiResponse,
};
use axum::{extract::State, Extension};
use serde::{Deserialize, Serialize};
use synergy_shared::{
    auth::middleware::AuthUser,
    models::profile::{Profile, PublicProfile, UpdateProfile, UserMatch, UserSummary},
};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: AuthUser,
    pub profile: Profile,
}

#[derive(Debug, Default, Deserialize)]
pub struct DirectoryQuery {
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AvatarRequest {
    pub avatar_url: Option<String>,
}

fn profile_not_found() -> ApiError {
    ApiError::NotFound("Profile not found".to_string())
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<ApiResponse<ProfileResponse>> {
    let profile = Profile::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(profile_not_found)?;

    Ok(ApiResponse::data(ProfileResponse { user, profile }))
}

/// Only `first_name`, `last_name` and `avatar_url` are writable.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(update): ApiJson<UpdateProfile>,
) -> ApiResult<ApiResponse<Profile>> {
    let profile = Profile::update(&state.db, user.id, update)
        .await?
        .ok_or_else(profile_not_found)?;

    tracing::info!(user_id = %user.id, "Profile updated");

    Ok(ApiResponse::with_message("Profile updated successfully", profile))
}

pub async fn list_users(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DirectoryQuery>,
) -> ApiResult<ApiResponse<Vec<UserSummary>>> {
    let users = Profile::directory(&state.db, query.search.as_deref()).await?;
    Ok(ApiResponse::data(users))
}

pub async fn search_users(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EmailQuery>,
) -> ApiResult<ApiResponse<Vec<UserMatch>>> {
    let term = query
        .email
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Email query parameter is required".to_string()))?;

    let users = Profile::search_by_email(&state.db, term).await?;
    Ok(ApiResponse::data(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<PublicProfile>> {
    let profile = Profile::find_public(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(ApiResponse::data(profile))
}

pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<AvatarRequest>,
) -> ApiResult<ApiResponse<Profile>> {
    let avatar_url = req
        .avatar_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::invalid_field("avatar_url", "Avatar URL is required"))?;

    let profile = Profile::update(
        &state.db,
        user.id,
        UpdateProfile {
            avatar_url: Some(avatar_url),
            ..Default::default()
        },
    )
    .await?
    .ok_or_else(profile_not_found)?;

    Ok(ApiResponse::with_message("Avatar updated successfully", profile))
}
