/// Project membership endpoints
///
/// - `GET /api/v1/projects/:id/members` - Members with names and email (members only)
/// - `POST /api/v1/projects/:id/members` - Add an existing user (owner or manager)
/// - `PUT /api/v1/projects/:id/members/:user_id` - Change a member's role (owner or manager)
/// - `DELETE /api/v1/projects/:id/members/:user_id` - Remove a member (owner or manager)
///
/// The owner's membership can be neither demoted nor removed.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
    response::ApiResponse,
    routes::{projects::ACCESS_DENIED, requester_name},
};
use axum::{extract::State, http::StatusCode, Extension};
use serde::Deserialize;
use synergy_shared::{
    auth::{
        authorization::{require_manager, require_member},
        middleware::AuthUser,
    },
    models::{
        notification::NewNotification,
        profile::Profile,
        project::Project,
        project_member::{MemberWithProfile, ProjectMember, ProjectRole},
    },
    notify::notify,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    #[validate(required(message = "User ID is required"))]
    pub user_id: Option<Uuid>,

    /// `member` (default) or `manager`
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Option<String>,
}

fn parse_role(raw: Option<&str>) -> ApiResult<ProjectRole> {
    match raw {
        Some(role) => Ok(role.parse::<ProjectRole>()?),
        None => Ok(ProjectRole::default()),
    }
}

async fn load_project(state: &AppState, id: Uuid) -> ApiResult<Project> {
    Project::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Vec<MemberWithProfile>>> {
    require_member(&state.db, project_id, user.id, ACCESS_DENIED).await?;

    let members = ProjectMember::list_with_profiles(&state.db, project_id).await?;
    Ok(ApiResponse::data(members))
}

/// Notifies the new member.
pub async fn add_member(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AddMemberRequest>,
) -> ApiResult<(StatusCode, ApiResponse<MemberWithProfile>)> {
    req.validate()?;

    require_manager(&state.db, project_id, user.id, "Only project managers can add members").await?;

    let role = parse_role(req.role.as_deref())?;
    let new_member_id = req
        .user_id
        .ok_or_else(|| ApiError::invalid_field("user_id", "User ID is required"))?;

    if Profile::find_by_id(&state.db, new_member_id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    if ProjectMember::find(&state.db, project_id, new_member_id).await?.is_some() {
        return Err(ApiError::BadRequest(
            "User is already a member of this project".to_string(),
        ));
    }

    ProjectMember::create(&state.db, project_id, new_member_id, role).await?;

    let member = ProjectMember::find_with_profile(&state.db, project_id, new_member_id)
        .await?
        .ok_or_else(|| ApiError::InternalError("Membership missing after insert".to_string()))?;

    tracing::info!(
        project_id = %project_id,
        member_id = %new_member_id,
        role = role.as_str(),
        added_by = %user.id,
        "Member added"
    );

    if new_member_id != user.id {
        let project = load_project(&state, project_id).await?;
        let added_by = requester_name(&state.db, &user).await;
        notify(
            &state.db,
            NewNotification::member_added(new_member_id, project_id, &project.name, &added_by, role),
        );
    }

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Member added successfully", member),
    ))
}

pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath((project_id, member_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(req): ApiJson<UpdateRoleRequest>,
) -> ApiResult<ApiResponse<ProjectMember>> {
    let raw_role = req
        .role
        .ok_or_else(|| ApiError::invalid_field("role", "Role is required"))?;
    let role = raw_role.parse::<ProjectRole>()?;

    require_manager(
        &state.db,
        project_id,
        user.id,
        "Only project managers can change member roles",
    )
    .await?;

    let project = load_project(&state, project_id).await?;
    if project.project_manager == member_id {
        return Err(ApiError::BadRequest(
            "Cannot change the project manager's role".to_string(),
        ));
    }

    let member = ProjectMember::update_role(&state.db, project_id, member_id, role)
        .await?
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))?;

    tracing::info!(project_id = %project_id, member_id = %member_id, role = role.as_str(), "Member role changed");

    Ok(ApiResponse::with_message("Member role updated successfully", member))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath((project_id, member_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<()>> {
    require_manager(&state.db, project_id, user.id, "Only project managers can remove members").await?;

    let project = load_project(&state, project_id).await?;
    if project.project_manager == member_id {
        return Err(ApiError::BadRequest("Cannot remove project manager".to_string()));
    }

    if !ProjectMember::delete(&state.db, project_id, member_id).await? {
        return Err(ApiError::NotFound("Member not found".to_string()));
    }

    tracing::info!(project_id = %project_id, member_id = %member_id, removed_by = %user.id, "Member removed");

    Ok(ApiResponse::message("Member removed successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role(None).unwrap(), ProjectRole::Member);
        assert_eq!(parse_role(Some("manager")).unwrap(), ProjectRole::Manager);
        assert!(matches!(parse_role(Some("owner")), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_add_member_requires_user_id() {
        let req: AddMemberRequest = serde_json::from_value(json!({ "role": "member" })).unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("user_id"));

        let req: AddMemberRequest =
            serde_json::from_value(json!({ "userId": Uuid::new_v4() })).unwrap();
        assert!(req.validate().is_ok());
    }
}
