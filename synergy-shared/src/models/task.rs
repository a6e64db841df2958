/// Task model and database operations
///
/// Tasks belong to a project and are optionally assigned to a profile.
/// Listings return [`TaskView`], which embeds the project name and owner
/// under `projects` and the assignee's name under `assignee_profile`.
///
/// # Status
///
/// ```text
/// To-Do ⇄ In Progress ⇄ Done
/// ```
///
/// Any status may be set directly; there is no enforced order.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('To-Do', 'In Progress', 'Done');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     name TEXT NOT NULL,
///     description TEXT,
///     assignee UUID REFERENCES profiles(id) ON DELETE SET NULL,
///     deadline DATE,
///     tags TEXT[] NOT NULL DEFAULT '{}',
///     image TEXT,
///     status task_status NOT NULL DEFAULT 'To-Do',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

use super::profile::PersonName;
use super::project::TaskStats;

/// Task status, stored and serialized with its display label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status")]
pub enum TaskStatus {
    #[default]
    #[sqlx(rename = "To-Do")]
    #[serde(rename = "To-Do")]
    Todo,

    #[sqlx(rename = "In Progress")]
    #[serde(rename = "In Progress")]
    InProgress,

    #[sqlx(rename = "Done")]
    #[serde(rename = "Done")]
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "To-Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub assignee: Option<Uuid>,
    pub deadline: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project fields embedded in task listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProject {
    pub id: Uuid,
    pub name: String,
    pub project_manager: Uuid,
}

/// Task with its project and assignee names
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TaskView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub task: Task,

    pub projects: Option<Json<TaskProject>>,

    pub assignee_profile: Option<Json<PersonName>>,
}

impl TaskView {
    pub fn project_name(&self) -> Option<&str> {
        self.projects.as_ref().map(|p| p.name.as_str())
    }
}

/// Input for creating a task. The assignee is resolved by the caller.
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub assignee: Uuid,
    pub deadline: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub status: TaskStatus,
}

/// Partial task update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub name: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<Uuid>,
    pub deadline: Option<NaiveDate>,
    pub tags: Option<Vec<String>>,
    pub image: Option<String>,
    pub status: Option<TaskStatus>,
}

const TASK_COLUMNS: &str =
    "id, project_id, name, description, assignee, deadline, tags, image, status, created_at, updated_at";

const TASK_VIEW: &str = r#"
    SELECT t.id, t.project_id, t.name, t.description, t.assignee, t.deadline,
           t.tags, t.image, t.status, t.created_at, t.updated_at,
           jsonb_build_object(
               'id', p.id,
               'name', p.name,
               'project_manager', p.project_manager) AS projects,
           CASE WHEN a.id IS NULL THEN NULL
                ELSE jsonb_build_object(
                    'first_name', a.first_name,
                    'last_name', a.last_name)
           END AS assignee_profile
    FROM tasks t
    JOIN projects p ON p.id = t.project_id
    LEFT JOIN profiles a ON a.id = t.assignee
"#;

impl Task {
    /// # Errors
    ///
    /// Fails with a foreign key violation when the project or assignee is missing.
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (project_id, name, description, assignee, deadline, tags, image, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, project_id, name, description, assignee, deadline, tags, image,
                      status, created_at, updated_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.name.trim())
        .bind(data.description)
        .bind(data.assignee)
        .bind(data.deadline)
        .bind(data.tags)
        .bind(data.image)
        .bind(data.status)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_view(pool: &PgPool, id: Uuid) -> Result<Option<TaskView>, sqlx::Error> {
        let query = format!("{} WHERE t.id = $1", TASK_VIEW);

        sqlx::query_as::<_, TaskView>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Applies a partial update and bumps `updated_at`.
    ///
    /// Returns `None` when the task does not exist.
    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateTask) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        for (field, present) in [
            ("name", data.name.is_some()),
            ("description", data.description.is_some()),
            ("assignee", data.assignee.is_some()),
            ("deadline", data.deadline.is_some()),
            ("tags", data.tags.is_some()),
            ("image", data.image.is_some()),
            ("status", data.status.is_some()),
        ] {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", field, bind_count));
            }
        }

        query.push_str(" WHERE id = $1 RETURNING ");
        query.push_str(TASK_COLUMNS);

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name.trim().to_string());
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(assignee) = data.assignee {
            q = q.bind(assignee);
        }
        if let Some(deadline) = data.deadline {
            q = q.bind(deadline);
        }
        if let Some(tags) = data.tags {
            q = q.bind(tags);
        }
        if let Some(image) = data.image {
            q = q.bind(image);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }

        q.fetch_optional(pool).await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Tasks assigned to `user_id`, newest first. `limit = None` returns all.
    pub async fn list_by_assignee(
        pool: &PgPool,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<TaskView>, sqlx::Error> {
        let query = format!(
            "{} WHERE t.assignee = $1 ORDER BY t.created_at DESC LIMIT $2",
            TASK_VIEW
        );

        sqlx::query_as::<_, TaskView>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Tasks of a project, newest first.
    pub async fn list_by_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<TaskView>, sqlx::Error> {
        let query = format!(
            "{} WHERE t.project_id = $1 ORDER BY t.created_at DESC",
            TASK_VIEW
        );

        sqlx::query_as::<_, TaskView>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Per-status counts over every task assigned to `user_id`.
    pub async fn stats_for_assignee(pool: &PgPool, user_id: Uuid) -> Result<TaskStats, sqlx::Error> {
        sqlx::query_as::<_, TaskStats>(
            r#"
            SELECT COUNT(*) AS total_tasks,
                   COUNT(*) FILTER (WHERE status = 'To-Do') AS todo_tasks,
                   COUNT(*) FILTER (WHERE status = 'In Progress') AS in_progress_tasks,
                   COUNT(*) FILTER (WHERE status = 'Done') AS done_tasks
            FROM tasks
            WHERE assignee = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Tasks assigned to `user_id` past their deadline and not done.
    pub async fn count_overdue_for_assignee(
        pool: &PgPool,
        user_id: Uuid,
        today: NaiveDate,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM tasks
            WHERE assignee = $1 AND deadline < $2 AND status <> 'Done'
            "#,
        )
        .bind(user_id)
        .bind(today)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(status: TaskStatus, deadline: Option<NaiveDate>) -> Task {
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            name: "Write docs".to_string(),
            description: None,
            assignee: None,
            deadline,
            tags: vec![],
            image: None,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(serde_json::to_string(&TaskStatus::Todo).unwrap(), "\"To-Do\"");
        assert_eq!(serde_json::to_string(&TaskStatus::InProgress).unwrap(), "\"In Progress\"");
        let done: TaskStatus = serde_json::from_str("\"Done\"").unwrap();
        assert_eq!(done, TaskStatus::Done);
        assert!(serde_json::from_str::<TaskStatus>("\"todo\"").is_err());
        assert_eq!(TaskStatus::default(), TaskStatus::Todo);
    }

    #[test]
    fn test_view_serializes_nested_shapes() {
        let view = TaskView {
            task: task(TaskStatus::InProgress, None),
            projects: Some(Json(TaskProject {
                id: Uuid::nil(),
                name: "Launch".to_string(),
                project_manager: Uuid::nil(),
            })),
            assignee_profile: None,
        };

        assert_eq!(view.project_name(), Some("Launch"));
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["status"], "In Progress");
        assert_eq!(value["projects"]["name"], "Launch");
        assert!(value["assignee_profile"].is_null());
    }
}
