/// In-app notification model
///
/// Notifications are written as side effects of project, task and invitation
/// changes and read back by the notification centre. The `NewNotification`
/// constructors build the title, message and metadata for each kind so every
/// handler phrases them the same way.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE notifications (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
///     project_id UUID REFERENCES projects(id) ON DELETE CASCADE,
///     task_id UUID REFERENCES tasks(id) ON DELETE CASCADE,
///     type notification_type NOT NULL,
///     title TEXT NOT NULL,
///     message TEXT NOT NULL,
///     metadata JSONB NOT NULL DEFAULT '{}',
///     is_read BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::str::FromStr;
use uuid::Uuid;

use super::project_member::ProjectRole;
use super::task::TaskStatus;

/// Default page size for notification listings
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest page a client may request
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    TaskAssigned,
    TaskStatusChanged,
    ProjectInvitation,
    ProjectUpdate,
    MemberAdded,
    InvitationAccepted,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::TaskAssigned => "task_assigned",
            NotificationType::TaskStatusChanged => "task_status_changed",
            NotificationType::ProjectInvitation => "project_invitation",
            NotificationType::ProjectUpdate => "project_update",
            NotificationType::MemberAdded => "member_added",
            NotificationType::InvitationAccepted => "invitation_accepted",
        }
    }
}

/// Returned when a `type` filter names no known notification kind
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown notification type: {0}")]
pub struct UnknownNotificationType(pub String);

impl FromStr for NotificationType {
    type Err = UnknownNotificationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task_assigned" => Ok(NotificationType::TaskAssigned),
            "task_status_changed" => Ok(NotificationType::TaskStatusChanged),
            "project_invitation" => Ok(NotificationType::ProjectInvitation),
            "project_update" => Ok(NotificationType::ProjectUpdate),
            "member_added" => Ok(NotificationType::MemberAdded),
            "invitation_accepted" => Ok(NotificationType::InvitationAccepted),
            other => Err(UnknownNotificationType(other.to_string())),
        }
    }
}

/// Notification row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub task_id: Option<Uuid>,

    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: NotificationType,

    pub title: String,
    pub message: String,
    pub metadata: JsonValue,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationProject {
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTask {
    pub name: String,
}

/// Notification with the referenced project and task embedded
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NotificationView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub notification: Notification,

    pub projects: Option<Json<NotificationProject>>,
    pub tasks: Option<Json<NotificationTask>>,
}

/// Listing parameters, already clamped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationFilter {
    pub limit: i64,
    pub offset: i64,
    pub unread_only: bool,
    pub kind: Option<NotificationType>,
}

impl Default for NotificationFilter {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
            unread_only: false,
            kind: None,
        }
    }
}

impl NotificationFilter {
    /// Clamps `limit` to `1..=MAX_PAGE_SIZE` and `offset` to `>= 0`.
    pub fn new(
        limit: Option<i64>,
        offset: Option<i64>,
        unread_only: bool,
        kind: Option<NotificationType>,
    ) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: offset.unwrap_or(0).max(0),
            unread_only,
            kind,
        }
    }
}

/// A notification waiting to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub metadata: JsonValue,
}

impl NewNotification {
    pub fn task_assigned(
        user_id: Uuid,
        project_id: Uuid,
        task_id: Uuid,
        task_name: &str,
        project_name: &str,
        assigned_by: &str,
    ) -> Self {
        Self {
            user_id,
            project_id: Some(project_id),
            task_id: Some(task_id),
            kind: NotificationType::TaskAssigned,
            title: "New Task Assigned".to_string(),
            message: format!("You have been assigned to task: {}", task_name),
            metadata: json!({
                "task_name": task_name,
                "project_name": project_name,
                "assigned_by": assigned_by,
            }),
        }
    }

    pub fn task_status_changed(
        user_id: Uuid,
        project_id: Uuid,
        task_id: Uuid,
        task_name: &str,
        old_status: TaskStatus,
        new_status: TaskStatus,
        changed_by: &str,
    ) -> Self {
        Self {
            user_id,
            project_id: Some(project_id),
            task_id: Some(task_id),
            kind: NotificationType::TaskStatusChanged,
            title: "Task Status Updated".to_string(),
            message: format!(
                "Task \"{}\" status changed from {} to {}",
                task_name, old_status, new_status
            ),
            metadata: json!({
                "task_name": task_name,
                "old_status": old_status,
                "new_status": new_status,
                "changed_by": changed_by,
            }),
        }
    }

    pub fn project_invitation(
        user_id: Uuid,
        project_id: Uuid,
        project_name: &str,
        invited_by: &str,
        role: ProjectRole,
    ) -> Self {
        Self {
            user_id,
            project_id: Some(project_id),
            task_id: None,
            kind: NotificationType::ProjectInvitation,
            title: "Project Invitation".to_string(),
            message: format!("You have been invited to join project: {}", project_name),
            metadata: json!({
                "project_name": project_name,
                "invited_by": invited_by,
                "role": role,
            }),
        }
    }

    pub fn project_update(
        user_id: Uuid,
        project_id: Uuid,
        project_name: &str,
        updated_by: &str,
        changes: &[&str],
    ) -> Self {
        Self {
            user_id,
            project_id: Some(project_id),
            task_id: None,
            kind: NotificationType::ProjectUpdate,
            title: "Project Updated".to_string(),
            message: format!("Project \"{}\" has been updated", project_name),
            metadata: json!({
                "project_name": project_name,
                "updated_by": updated_by,
                "changes": changes,
            }),
        }
    }

    pub fn member_added(
        user_id: Uuid,
        project_id: Uuid,
        project_name: &str,
        added_by: &str,
        role: ProjectRole,
    ) -> Self {
        Self {
            user_id,
            project_id: Some(project_id),
            task_id: None,
            kind: NotificationType::MemberAdded,
            title: "Added to Project".to_string(),
            message: format!("You have been added to project: {}", project_name),
            metadata: json!({
                "project_name": project_name,
                "added_by": added_by,
                "role": role,
            }),
        }
    }

    pub fn invitation_accepted(
        inviter_id: Uuid,
        project_id: Uuid,
        project_name: &str,
        accepted_by: &str,
    ) -> Self {
        Self {
            user_id: inviter_id,
            project_id: Some(project_id),
            task_id: None,
            kind: NotificationType::InvitationAccepted,
            title: "Invitation Accepted".to_string(),
            message: format!("{} joined project: {}", accepted_by, project_name),
            metadata: json!({
                "project_name": project_name,
                "accepted_by": accepted_by,
            }),
        }
    }
}

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, project_id, task_id, type, title, message, metadata, is_read, created_at";

impl Notification {
    pub async fn create(pool: &PgPool, data: NewNotification) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO notifications (user_id, project_id, task_id, type, title, message, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&query)
            .bind(data.user_id)
            .bind(data.project_id)
            .bind(data.task_id)
            .bind(data.kind)
            .bind(data.title)
            .bind(data.message)
            .bind(data.metadata)
            .fetch_one(pool)
            .await
    }

    /// Inserts all notifications in a single statement. Returns the row count.
    pub async fn create_many(pool: &PgPool, batch: Vec<NewNotification>) -> Result<u64, sqlx::Error> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO notifications (user_id, project_id, task_id, type, title, message, metadata) ",
        );
        builder.push_values(batch, |mut row, n| {
            row.push_bind(n.user_id)
                .push_bind(n.project_id)
                .push_bind(n.task_id)
                .push_bind(n.kind)
                .push_bind(n.title)
                .push_bind(n.message)
                .push_bind(n.metadata);
        });

        let result = builder.build().execute(pool).await?;
        Ok(result.rows_affected())
    }

    /// Notifications of `user_id`, newest first.
    pub async fn list(
        pool: &PgPool,
        user_id: Uuid,
        filter: NotificationFilter,
    ) -> Result<Vec<NotificationView>, sqlx::Error> {
        sqlx::query_as::<_, NotificationView>(
            r#"
            SELECT n.id, n.user_id, n.project_id, n.task_id, n.type, n.title, n.message,
                   n.metadata, n.is_read, n.created_at,
                   CASE WHEN p.id IS NULL THEN NULL
                        ELSE jsonb_build_object('name', p.name, 'image', p.image)
                   END AS projects,
                   CASE WHEN t.id IS NULL THEN NULL
                        ELSE jsonb_build_object('name', t.name)
                   END AS tasks
            FROM notifications n
            LEFT JOIN projects p ON p.id = n.project_id
            LEFT JOIN tasks t ON t.id = n.task_id
            WHERE n.user_id = $1
              AND ($2 = FALSE OR n.is_read = FALSE)
              AND ($3::notification_type IS NULL OR n.type = $3)
            ORDER BY n.created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(user_id)
        .bind(filter.unread_only)
        .bind(filter.kind)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(pool)
        .await
    }

    pub async fn unread_count(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Marks one of `user_id`'s notifications read. `None` if it is not theirs.
    pub async fn mark_read(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2 RETURNING {}",
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Returns how many notifications changed.
    pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE")
                .bind(user_id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every read notification of `user_id`. Returns the count.
    pub async fn delete_read(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1 AND is_read = TRUE")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
