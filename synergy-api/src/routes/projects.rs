/// Project endpoints
///
/// # Endpoints
///
/// - `GET /api/v1/projects` - Projects the requester belongs to
/// - `GET /api/v1/projects/:id` - Project with members and tasks (members only)
/// - `POST /api/v1/projects` - Create; the requester becomes owner and manager
/// - `PUT /api/v1/projects/:id` - Partial update (owner or manager)
/// - `DELETE /api/v1/projects/:id` - Delete (owner only)
///
/// Membership endpoints live in [`super::members`].

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
    response::ApiResponse,
    routes::{requester_name, validation},
};
use axum::{extract::State, http::StatusCode, Extension};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use synergy_shared::{
    auth::{
        authorization::{require_manager, require_member, require_owner},
        middleware::AuthUser,
    },
    models::{
        notification::NewNotification,
        project::{CreateProject, Project, ProjectPriority, ProjectSummary, UpdateProject},
        project_member::{MemberWithProfile, ProjectMember, ProjectRole},
        task::{Task, TaskView},
    },
    notify::notify_many,
};
use uuid::Uuid;
use validator::Validate;

pub(crate) const ACCESS_DENIED: &str = "Access denied to this project";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[serde(default)]
    #[validate(custom(function = "validation::project_name"))]
    pub name: String,

    pub description: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub priority: Option<ProjectPriority>,
    pub tags: Option<Vec<String>>,
    pub image: Option<String>,
}

impl From<CreateProjectRequest> for CreateProject {
    fn from(req: CreateProjectRequest) -> Self {
        CreateProject {
            name: req.name,
            description: req.description,
            deadline: req.deadline,
            priority: req.priority,
            tags: req.tags,
            image: req.image,
        }
    }
}

/// `name` is always required; other absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    #[validate(custom(function = "validation::project_name"))]
    pub name: String,

    pub description: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub priority: Option<ProjectPriority>,
    pub tags: Option<Vec<String>>,
    pub image: Option<String>,
}

impl From<UpdateProjectRequest> for UpdateProject {
    fn from(req: UpdateProjectRequest) -> Self {
        UpdateProject {
            name: Some(req.name),
            description: req.description,
            deadline: req.deadline,
            priority: req.priority,
            tags: req.tags,
            image: req.image,
        }
    }
}

/// Project with its members and tasks
#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,

    pub project_members: Vec<MemberWithProfile>,
    pub tasks: Vec<TaskView>,

    #[serde(rename = "userRole")]
    pub user_role: Option<ProjectRole>,
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<ApiResponse<Vec<ProjectSummary>>> {
    let projects = Project::list_for_member(&state.db, user.id).await?;
    Ok(ApiResponse::data(projects))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<ProjectDetail>> {
    let access = require_member(&state.db, id, user.id, ACCESS_DENIED).await?;

    let project = Project::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    let project_members = ProjectMember::list_with_profiles(&state.db, id).await?;
    let tasks = Task::list_by_project(&state.db, id).await?;

    Ok(ApiResponse::data(ProjectDetail {
        project,
        project_members,
        tasks,
        user_role: access.role,
    }))
}

/// Creates the project and the owner's manager membership in one transaction.
pub async fn create_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<CreateProjectRequest>,
) -> ApiResult<(StatusCode, ApiResponse<Project>)> {
    req.validate()?;

    let project = Project::create_with_manager(&state.db, user.id, req.into()).await?;

    tracing::info!(project_id = %project.id, user_id = %user.id, "Project created");

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Project created successfully", project),
    ))
}

/// Notifies every other member of the change.
pub async fn update_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> ApiResult<ApiResponse<Project>> {
    req.validate()?;

    require_manager(&state.db, id, user.id, "Only project managers can update projects").await?;

    let update: UpdateProject = req.into();
    let changes = update.changed_fields();

    let project = Project::update(&state.db, id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    tracing::info!(project_id = %id, user_id = %user.id, ?changes, "Project updated");

    let recipients = ProjectMember::list_user_ids_except(&state.db, id, user.id).await?;
    if !recipients.is_empty() {
        let updated_by = requester_name(&state.db, &user).await;
        let batch = recipients
            .into_iter()
            .map(|member| NewNotification::project_update(member, id, &project.name, &updated_by, &changes))
            .collect();
        notify_many(&state.db, batch);
    }

    Ok(ApiResponse::with_message("Project updated successfully", project))
}

/// Members, tasks, invitations and notifications cascade.
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    require_owner(&state.db, id, user.id, "Only project managers can delete projects").await?;

    if !Project::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }

    tracing::info!(project_id = %id, user_id = %user.id, "Project deleted");

    Ok(ApiResponse::message("Project deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_request_defaults() {
        let req: CreateProjectRequest = serde_json::from_value(json!({ "name": "Website" })).unwrap();
        assert!(req.validate().is_ok());

        let create: CreateProject = req.into();
        assert!(create.priority.is_none());
        assert!(create.tags.is_none());
    }

    #[test]
    fn test_create_request_rejects_short_name() {
        let req: CreateProjectRequest = serde_json::from_value(json!({ "name": "  ab " })).unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
    }

    #[test]
    fn test_update_request_requires_name() {
        let req: UpdateProjectRequest =
            serde_json::from_value(json!({ "description": "no name given" })).unwrap();
        let errors = req.validate().unwrap_err();
        let name_errors = &errors.field_errors()["name"];
        assert_eq!(
            name_errors[0].message.as_deref(),
            Some("Project name is required")
        );

        let req: UpdateProjectRequest = serde_json::from_value(json!({ "name": "" })).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_request_keeps_other_fields_partial() {
        let req: UpdateProjectRequest = serde_json::from_value(json!({
            "name": "Website",
            "priority": "High",
            "deadline": "2025-12-31"
        }))
        .unwrap();
        assert!(req.validate().is_ok());

        let update: UpdateProject = req.into();
        assert_eq!(update.changed_fields(), vec!["name", "deadline", "priority"]);
        assert!(update.description.is_none());
    }

    #[test]
    fn test_unknown_priority_rejected() {
        let parsed = serde_json::from_value::<CreateProjectRequest>(json!({
            "name": "Website",
            "priority": "Urgent"
        }));
        assert!(parsed.is_err());
    }
}
