/// Project-level authorization
///
/// Every permission check in the API is one of two patterns:
///
/// 1. **Membership**: the requester has a `project_members` row for the project
/// 2. **Management**: the requester owns the project (`projects.project_manager`)
///    OR holds the `manager` role in `project_members`
///
/// Project deletion is reserved to the owner. Task checks add the assignee:
///
/// | Action      | Allowed for |
/// |-------------|-------------|
/// | view task   | assignee, any member |
/// | update task | assignee, owner, managers |
/// | delete task | owner, managers |
///
/// [`ProjectAccess`] captures the requester's standing in one query; the
/// predicates on it are pure and unit tested. The `require_*` helpers load it
/// and turn a failed check into an [`AuthzError`] carrying the message the
/// endpoint reports.
///
/// # Example
///
/// ```no_run
/// use synergy_shared::auth::authorization::require_manager;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, project_id: Uuid, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let access = require_manager(&pool, project_id, user_id, "Only project managers can add members").await?;
/// assert!(access.can_manage());
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::project_member::ProjectRole;

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// The requester lacks the permission. Carries the client-facing message.
    #[error("{0}")]
    Forbidden(&'static str),

    #[error("Project not found")]
    ProjectNotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// The requester's standing in one project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectAccess {
    pub project_id: Uuid,
    pub user_id: Uuid,

    /// Requester is `projects.project_manager`
    pub is_owner: bool,

    /// Requester's membership role, if any
    pub role: Option<ProjectRole>,
}

impl ProjectAccess {
    pub fn new(project_id: Uuid, project_manager: Uuid, user_id: Uuid, role: Option<ProjectRole>) -> Self {
        Self {
            project_id,
            user_id,
            is_owner: project_manager == user_id,
            role,
        }
    }

    /// Loads the requester's standing. `None` when the project does not exist.
    pub async fn load(pool: &PgPool, project_id: Uuid, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let row: Option<(Uuid, Option<ProjectRole>)> = sqlx::query_as(
            r#"
            SELECT p.project_manager, pm.role
            FROM projects p
            LEFT JOIN project_members pm ON pm.project_id = p.id AND pm.user_id = $2
            WHERE p.id = $1
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|(project_manager, role)| Self::new(project_id, project_manager, user_id, role)))
    }

    pub fn is_member(&self) -> bool {
        self.role.is_some()
    }

    /// Owner or `manager` role.
    pub fn can_manage(&self) -> bool {
        self.is_owner || self.role == Some(ProjectRole::Manager)
    }

    pub fn can_delete_project(&self) -> bool {
        self.is_owner
    }

    pub fn can_view_task(&self, assignee: Option<Uuid>) -> bool {
        assignee == Some(self.user_id) || self.is_member()
    }

    pub fn can_update_task(&self, assignee: Option<Uuid>) -> bool {
        assignee == Some(self.user_id) || self.can_manage()
    }

    pub fn can_delete_task(&self) -> bool {
        self.can_manage()
    }

    pub fn ensure(&self, allowed: bool, message: &'static str) -> Result<(), AuthzError> {
        if allowed {
            Ok(())
        } else {
            Err(AuthzError::Forbidden(message))
        }
    }
}

/// Requires a membership row. A missing project is reported as forbidden too,
/// so non-members cannot probe which project ids exist.
pub async fn require_member(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
    message: &'static str,
) -> Result<ProjectAccess, AuthzError> {
    let access = ProjectAccess::load(pool, project_id, user_id)
        .await?
        .ok_or(AuthzError::Forbidden(message))?;

    access.ensure(access.is_member(), message)?;
    Ok(access)
}

/// Requires owner or `manager` role. A missing project is `ProjectNotFound`.
pub async fn require_manager(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
    message: &'static str,
) -> Result<ProjectAccess, AuthzError> {
    let access = ProjectAccess::load(pool, project_id, user_id)
        .await?
        .ok_or(AuthzError::ProjectNotFound)?;

    access.ensure(access.can_manage(), message)?;
    Ok(access)
}

/// Requires the project owner. A missing project is `ProjectNotFound`.
pub async fn require_owner(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
    message: &'static str,
) -> Result<ProjectAccess, AuthzError> {
    let access = ProjectAccess::load(pool, project_id, user_id)
        .await?
        .ok_or(AuthzError::ProjectNotFound)?;

    access.ensure(access.can_delete_project(), message)?;
    Ok(access)
}
