/// Task endpoints
///
/// # Endpoints
///
/// - `GET /api/v1/tasks` - Tasks assigned to the requester
/// - `GET /api/v1/tasks/:id` - Task (assignee or project member)
/// - `POST /api/v1/tasks` - Create in a project the requester belongs to
/// - `PUT /api/v1/tasks/:id` - Partial update (assignee, owner or manager)
/// - `DELETE /api/v1/tasks/:id` - Delete (owner or manager)
/// - `GET /api/v1/tasks/project/:project_id` - Tasks of a project (members only)
///
/// Responses embed the project under `projects` and the assignee's name under
/// `assignee_profile`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
    response::ApiResponse,
    routes::{projects::ACCESS_DENIED, requester_name, validation},
};
use axum::{extract::State, http::StatusCode, Extension};
use chrono::NaiveDate;
use serde::Deserialize;
use synergy_shared::{
    auth::{
        authorization::{require_member, AuthzError, ProjectAccess},
        middleware::AuthUser,
    },
    models::{
        notification::NewNotification,
        task::{CreateTask, Task, TaskStatus, TaskView, UpdateTask},
    },
    notify::{notify, notify_many},
};
use uuid::Uuid;
use validator::Validate;

const TASK_ACCESS_DENIED: &str = "Access denied to this task";
const UPDATE_DENIED: &str = "You can only update tasks assigned to you or tasks in projects you manage";
const DELETE_DENIED: &str = "Only project managers can delete tasks";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(required(message = "Project ID is required"))]
    pub project_id: Option<Uuid>,

    #[serde(default)]
    #[validate(custom(function = "validation::task_name"))]
    pub name: String,

    pub description: Option<String>,

    /// Defaults to the requester
    pub assignee: Option<Uuid>,

    pub deadline: Option<NaiveDate>,
    pub tags: Option<Vec<String>>,
    pub image: Option<String>,
    pub status: Option<TaskStatus>,
}

/// Absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(custom(function = "validation::task_name"))]
    pub name: Option<String>,

    pub description: Option<String>,
    pub assignee: Option<Uuid>,
    pub deadline: Option<NaiveDate>,
    pub tags: Option<Vec<String>>,
    pub image: Option<String>,
    pub status: Option<TaskStatus>,
}

impl From<UpdateTaskRequest> for UpdateTask {
    fn from(req: UpdateTaskRequest) -> Self {
        UpdateTask {
            name: req.name,
            description: req.description,
            assignee: req.assignee,
            deadline: req.deadline,
            tags: req.tags,
            image: req.image,
            status: req.status,
        }
    }
}

/// Notifications owed after an update
#[derive(Debug, Default, PartialEq, Eq)]
struct UpdateEffects {
    /// Newly assigned user, other than the requester
    newly_assigned: Option<Uuid>,

    /// Assignee to tell about a status change, other than the requester
    status_change: Option<(Uuid, TaskStatus, TaskStatus)>,
}

impl UpdateEffects {
    fn compute(before: &Task, after: &Task, requester: Uuid) -> Self {
        let newly_assigned = after
            .assignee
            .filter(|assignee| Some(*assignee) != before.assignee && *assignee != requester);

        let status_change = after
            .assignee
            .filter(|assignee| before.status != after.status && *assignee != requester)
            .map(|assignee| (assignee, before.status, after.status));

        Self {
            newly_assigned,
            status_change,
        }
    }
}

async fn load_task(state: &AppState, id: Uuid) -> ApiResult<Task> {
    Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

async fn load_access(state: &AppState, task: &Task, user_id: Uuid, denied: &'static str) -> ApiResult<ProjectAccess> {
    let access = ProjectAccess::load(&state.db, task.project_id, user_id)
        .await?
        .ok_or(AuthzError::Forbidden(denied))?;
    Ok(access)
}

async fn load_view(state: &AppState, id: Uuid) -> ApiResult<TaskView> {
    Task::find_view(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

pub async fn list_my_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<ApiResponse<Vec<TaskView>>> {
    let tasks = Task::list_by_assignee(&state.db, user.id, None).await?;
    Ok(ApiResponse::data(tasks))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<TaskView>> {
    let task = load_task(&state, id).await?;

    let access = load_access(&state, &task, user.id, TASK_ACCESS_DENIED).await?;
    access.ensure(access.can_view_task(task.assignee), TASK_ACCESS_DENIED)?;

    Ok(ApiResponse::data(load_view(&state, id).await?))
}

/// Notifies the assignee when it is someone else.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, ApiResponse<TaskView>)> {
    req.validate()?;

    let project_id = req
        .project_id
        .ok_or_else(|| ApiError::invalid_field("project_id", "Project ID is required"))?;

    require_member(&state.db, project_id, user.id, ACCESS_DENIED).await?;

    let assignee = req.assignee.unwrap_or(user.id);
    let task = Task::create(
        &state.db,
        CreateTask {
            project_id,
            name: req.name,
            description: req.description,
            assignee,
            deadline: req.deadline,
            tags: req.tags.unwrap_or_default(),
            image: req.image,
            status: req.status.unwrap_or_default(),
        },
    )
    .await?;

    tracing::info!(task_id = %task.id, project_id = %project_id, assignee = %assignee, "Task created");

    let view = load_view(&state, task.id).await?;

    if assignee != user.id {
        let assigned_by = requester_name(&state.db, &user).await;
        notify(
            &state.db,
            NewNotification::task_assigned(
                assignee,
                project_id,
                task.id,
                &task.name,
                view.project_name().unwrap_or_default(),
                &assigned_by,
            ),
        );
    }

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Task created successfully", view),
    ))
}

/// Notifies a new assignee, and the assignee of a status change, unless
/// they made the change themselves.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<ApiResponse<TaskView>> {
    req.validate()?;

    let before = load_task(&state, id).await?;

    let access = load_access(&state, &before, user.id, UPDATE_DENIED).await?;
    access.ensure(access.can_update_task(before.assignee), UPDATE_DENIED)?;

    let after = Task::update(&state.db, id, req.into())
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    tracing::info!(task_id = %id, user_id = %user.id, status = after.status.as_str(), "Task updated");

    let view = load_view(&state, id).await?;
    let effects = UpdateEffects::compute(&before, &after, user.id);

    if effects != UpdateEffects::default() {
        let changed_by = requester_name(&state.db, &user).await;
        let project_name = view.project_name().unwrap_or_default();
        let mut batch = Vec::new();

        if let Some(assignee) = effects.newly_assigned {
            batch.push(NewNotification::task_assigned(
                assignee,
                after.project_id,
                after.id,
                &after.name,
                project_name,
                &changed_by,
            ));
        }
        if let Some((assignee, old_status, new_status)) = effects.status_change {
            batch.push(NewNotification::task_status_changed(
                assignee,
                after.project_id,
                after.id,
                &after.name,
                old_status,
                new_status,
                &changed_by,
            ));
        }

        notify_many(&state.db, batch);
    }

    Ok(ApiResponse::with_message("Task updated successfully", view))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let task = load_task(&state, id).await?;

    let access = load_access(&state, &task, user.id, DELETE_DENIED).await?;
    access.ensure(access.can_delete_task(), DELETE_DENIED)?;

    if !Task::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    tracing::info!(task_id = %id, user_id = %user.id, "Task deleted");

    Ok(ApiResponse::message("Task deleted successfully"))
}

pub async fn list_project_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Vec<TaskView>>> {
    require_member(&state.db, project_id, user.id, ACCESS_DENIED).await?;

    let tasks = Task::list_by_project(&state.db, project_id).await?;
    Ok(ApiResponse::data(tasks))
}
