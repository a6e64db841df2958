/// Authentication endpoints
///
/// Accounts and sessions live in the hosted auth service; this module relays
/// sign-up, sign-in and sign-out to it and mirrors a profile row locally.
///
/// # Endpoints
///
/// - `POST /api/v1/auth/signup` - Register new user
/// - `POST /api/v1/auth/login` - Login and get tokens
/// - `POST /api/v1/auth/logout` - Revoke the current session
/// - `GET /api/v1/auth/me` - Current user (authenticated)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    response::ApiResponse,
    routes::validation,
};
use axum::{extract::State, http::HeaderMap, http::StatusCode, Extension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use synergy_shared::{
    auth::{
        gotrue::{GoTrueError, GoTrueUser},
        middleware::{bearer_token, AuthUser},
    },
    models::profile::{CreateProfile, Profile},
};
use uuid::Uuid;
use validator::Validate;

/// Sign-up request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(custom(function = "validation::signup_email"))]
    pub email: String,

    #[serde(default)]
    #[validate(custom(function = "validation::signup_password"))]
    pub password: String,

    #[serde(default)]
    #[validate(custom(function = "validation::first_name"))]
    pub first_name: String,

    #[serde(default)]
    #[validate(custom(function = "validation::last_name"))]
    pub last_name: String,
}

/// Sign-up response
///
/// Tokens are absent while the address awaits confirmation.
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: GoTrueUser,

    #[serde(rename = "needsVerification")]
    pub needs_verification: bool,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(custom(function = "validation::login_email"))]
    pub email: String,

    #[serde(default)]
    #[validate(custom(function = "validation::login_password"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: GoTrueUser,

    /// `null` when no profile row exists yet
    pub profile: Option<Profile>,
}

/// Token identity merged with the stored profile
#[derive(Debug, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub user_metadata: JsonValue,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CurrentUser {
    /// Profile values win; names fall back to the sign-up metadata.
    pub fn merge(user: AuthUser, profile: Profile) -> Self {
        let first_name = profile
            .first_name
            .clone()
            .filter(|n| !n.is_empty())
            .or_else(|| user.metadata_str("first_name").map(str::to_string));
        let last_name = profile
            .last_name
            .clone()
            .filter(|n| !n.is_empty())
            .or_else(|| user.metadata_str("last_name").map(str::to_string));

        Self {
            id: user.id,
            email: profile.email.or(user.email),
            user_metadata: user.user_metadata,
            first_name,
            last_name,
            avatar_url: profile.avatar_url,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

/// Register a new user
///
/// ```text
/// POST /api/v1/auth/signup
///
/// { "email": "user@example.com", "password": "secret1", "firstName": "Ada", "lastName": "Lovelace" }
/// ```
///
/// A failed profile insert is logged and does not fail the sign-up.
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> ApiResult<(StatusCode, ApiResponse<SignupResponse>)> {
    req.validate()?;

    let email = req.email.trim().to_lowercase();
    let first_name = req.first_name.trim();
    let last_name = req.last_name.trim();

    let created = state
        .gotrue
        .sign_up(&email, &req.password, first_name, last_name)
        .await?;
    let user = created.user().clone();

    if let Err(e) = Profile::create(
        &state.db,
        CreateProfile {
            id: user.id,
            email: Some(email.clone()),
            first_name: Some(first_name.to_string()),
            last_name: Some(last_name.to_string()),
        },
    )
    .await
    {
        tracing::warn!(error = %e, user_id = %user.id, "Profile creation failed after sign-up");
    }

    tracing::info!(user_id = %user.id, "User registered");

    let session = created.session();
    let response = SignupResponse {
        access_token: session.map(|s| s.access_token.clone()),
        refresh_token: session.map(|s| s.refresh_token.clone()),
        needs_verification: user.needs_verification(),
        user,
    };

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("User registered successfully", response),
    ))
}

/// Password login
///
/// Rejections from the auth service are reported as 401.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<ApiResponse<LoginResponse>> {
    req.validate()?;

    let session = state
        .gotrue
        .sign_in_with_password(req.email.trim(), &req.password)
        .await
        .map_err(|e| match e {
            GoTrueError::Api { status, .. } if status < 500 => {
                tracing::debug!(error = %e, "Login rejected");
                ApiError::Unauthorized(e.user_message())
            }
            other => other.into(),
        })?;

    let profile = Profile::find_by_id(&state.db, session.user.id).await?;

    tracing::info!(user_id = %session.user.id, "User logged in");

    Ok(ApiResponse::with_message(
        "Login successful",
        LoginResponse {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            user: session.user,
            profile,
        },
    ))
}

/// Revokes the session of the presented token, if any.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<ApiResponse<()>> {
    if let Ok(Some(token)) = bearer_token(&headers) {
        state
            .gotrue
            .sign_out(token)
            .await
            .map_err(|e| ApiError::BadRequest(e.user_message()))?;
    }

    Ok(ApiResponse::message("Logout successful"))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<ApiResponse<CurrentUser>> {
    let profile = Profile::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    Ok(ApiResponse::data(CurrentUser::merge(user, profile)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile(first_name: Option<&str>, last_name: Option<&str>) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: None,
            first_name: first_name.map(str::to_string),
            last_name: last_name.map(str::to_string),
            avatar_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn user(id: Uuid) -> AuthUser {
        AuthUser {
            id,
            email: Some("ada@example.com".to_string()),
            user_metadata: json!({ "first_name": "Ada", "last_name": "Lovelace" }),
        }
    }

    #[test]
    fn test_merge_prefers_profile_names() {
        let stored = profile(Some("Augusta"), None);
        let merged = CurrentUser::merge(user(stored.id), stored);

        assert_eq!(merged.first_name.as_deref(), Some("Augusta"));
        assert_eq!(merged.last_name.as_deref(), Some("Lovelace"));
        assert_eq!(merged.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_signup_validation_details() {
        let req: SignupRequest = serde_json::from_value(json!({
            "email": "not-an-email",
            "password": "123",
            "firstName": "Ada"
        }))
        .unwrap();

        let err = ApiError::from(req.validate().unwrap_err());
        match err {
            ApiError::ValidationError(details) => {
                let messages: Vec<&str> = details.iter().map(|d| d.message.as_str()).collect();
                assert_eq!(
                    messages,
                    vec![
                        "Please provide a valid email address",
                        "Last name is required",
                        "Password must be at least 6 characters long",
                    ]
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_login_requires_both_fields() {
        let req: LoginRequest = serde_json::from_value(json!({})).unwrap();
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 2);
    }
}
